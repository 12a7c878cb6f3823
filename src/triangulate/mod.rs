//! Triangulation - multi-source claim verification
//!
//! ## Architecture
//!
//! ```text
//! claim + sources → RelevanceScorer (keyword | token overlap | embeddings)
//!                          ↓ score per source
//!                   EvidenceAggregator (floor, noisy-OR)
//!                          ↓
//!                   VerificationResult (confidence > 0.85 ⇒ verified)
//! ```

pub mod aggregator;
pub mod scorer;

pub use aggregator::{
    noisy_or, EvidenceAggregator, SourceDocument, VerificationResult, METHOD, REQUIRED_CONFIDENCE,
};
pub use scorer::{
    EmbeddingBackend, EmbeddingScorer, KeywordOverlapScorer, RelevanceScorer, TokenOverlapScorer,
};
