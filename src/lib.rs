//! Evidentia - Verifiable evidence trails for autonomous research agents
//!
//! Evidentia is the evidence core a web-research agent calls into. It does not
//! drive a browser: a Browsing Surface hands it HTTP transactions and page
//! text, and Evidentia turns them into re-verifiable archives, saturation
//! verdicts and claim confidence.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                  Browsing Surface (external)                     │
//! │      HTTP transaction events          extracted page HTML        │
//! └──────────────┬───────────────────────────────┬───────────────────┘
//!                │                               │
//! ┌──────────────▼───────────────┐   ┌───────────▼──────────────────┐
//! │  archive                     │   │  distill                     │
//! │  TransactionFilter           │   │  ContentDistiller            │
//! │  ArchiveRecorder → .warc.gz  │   │  HTML → plain text excerpt   │
//! │  payload hash + header hash  │   └──────────────────────────────┘
//! └──────────────────────────────┘
//!
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │  sonar                       │   │  triangulate                 │
//! │  NoveltyGate                 │   │  RelevanceScorer             │
//! │  compression-ratio gain      │   │  EvidenceAggregator          │
//! │  saturation streak           │   │  noisy-OR confidence         │
//! └──────────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`archive`]: Content-addressed capture archives
//! - [`sonar`]: Novelty and saturation detection
//! - [`triangulate`]: Multi-source claim verification
//! - [`distill`]: HTML to text distillation
//! - [`config`]: Configuration management
//!
//! Each component owns its state. Callers construct one instance per research
//! session and pass it where it is needed; nothing is global.

pub mod archive;
pub mod config;
pub mod distill;
pub mod error;
pub mod sonar;
pub mod triangulate;

pub use archive::{ArchiveRecorder, CaptureReport, FrozenArchive, Transaction, TransactionFilter};
pub use config::EvidentiaConfig;
pub use distill::ContentDistiller;
pub use error::{Error, Result};
pub use sonar::{NoveltyGate, SaturationLevel, SonarResult};
pub use triangulate::{EvidenceAggregator, RelevanceScorer, SourceDocument, VerificationResult};
