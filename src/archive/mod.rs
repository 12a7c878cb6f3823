//! Capture archive - verifiable record of raw network transactions
//!
//! ## Architecture
//!
//! ```text
//! Browsing Surface (ResponseEvent)
//!              ↓
//! TransactionFilter (drop images, scripts, styles, media, fonts)
//!              ↓
//! ArchiveRecorder (buffer one capture unit)
//!              ↓ freeze(target_url)
//! record_<secs>_<url digest>_<nonce>.warc.gz + payload hash + headers hash
//! ```
//!
//! Hashes are computed from the primary transaction alone, so re-freezing an
//! identical transaction set reproduces them.

pub mod digest;
pub mod filter;
pub mod recorder;
pub mod report;
pub mod transaction;
pub mod warc;

pub use digest::{header_hash, payload_hash};
pub use filter::{ContentClass, TransactionFilter};
pub use recorder::{archives_for_url, select_primary, ArchiveRecorder, FrozenArchive};
pub use report::CaptureReport;
pub use transaction::{HeaderList, ResponseEvent, Transaction};
pub use warc::{read_archive, verify_archive, ArchiveVerification, ArchivedRecord};
