//! Noisy-OR evidence aggregation
//!
//! Every source that clears the relevance floor independently votes that the
//! claim is true with probability `score * strictness`. The claim is false
//! only if every vote is wrong:
//!
//! ```text
//! confidence = 1 - Π (1 - s_i * α)      for s_i > floor
//! ```

use super::scorer::{KeywordOverlapScorer, RelevanceScorer};
use crate::config::TriangulationConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Confidence a claim must exceed to count as verified
pub const REQUIRED_CONFIDENCE: f64 = 0.85;

/// Method label reported with every verification
pub const METHOD: &str = "semantic_triangulation_v2";

/// One candidate source for a claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Where the text came from (URL or publisher), used for independence
    pub origin: Option<String>,
    /// Source text body
    pub content: String,
    /// Publication or capture date, as reported
    pub date: Option<String>,
}

impl SourceDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// Result of verifying one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub claim: String,
    pub source_count: usize,
    pub required_confidence: f64,
    pub confidence: f64,
    pub method: String,
    /// Per-source relevance, in input order. A source that failed to score
    /// reads 0; the list is empty when the whole batch failed.
    pub scores: Vec<f64>,
    /// Sources above the relevance floor
    pub relevant_sources: usize,
    /// Distinct origins among relevant sources
    pub independent_origins: usize,
    /// Whether `relevant_sources` reached the configured minimum
    pub meets_min_sources: bool,
    /// Scoring failures, or why confidence is zero for a reason other than irrelevance
    pub diagnostic: Option<String>,
}

/// Combines per-source relevance into one confidence value
pub struct EvidenceAggregator {
    scorer: Arc<dyn RelevanceScorer>,
    config: TriangulationConfig,
}

impl EvidenceAggregator {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, config: TriangulationConfig) -> Self {
        Self { scorer, config }
    }

    /// Aggregator backed by the keyword overlap scorer
    pub fn with_keyword_scorer(config: TriangulationConfig) -> Self {
        Self::new(Arc::new(KeywordOverlapScorer::new()), config)
    }

    /// Verify `claim` against `sources`.
    ///
    /// Never fails. A source whose scoring fails contributes nothing and is
    /// named in the diagnostic. No sources or a whole-batch scorer failure
    /// yield confidence 0.
    pub async fn verify(&self, claim: &str, sources: &[SourceDocument]) -> VerificationResult {
        if sources.is_empty() {
            return self.empty(claim, 0, "No sources provided");
        }

        let texts: Vec<&str> = sources.iter().map(|s| s.content.as_str()).collect();
        let outcomes = match self.scorer.score_batch(claim, &texts).await {
            Ok(outcomes) if outcomes.len() == sources.len() => outcomes,
            Ok(outcomes) => {
                let msg = format!(
                    "{} returned {} scores for {} sources",
                    self.scorer.name(),
                    outcomes.len(),
                    sources.len()
                );
                tracing::warn!("{}", msg);
                return self.empty(claim, sources.len(), msg);
            }
            Err(e) => {
                tracing::warn!(scorer = self.scorer.name(), error = %e, "Relevance scoring failed");
                return self.empty(claim, sources.len(), format!("Scorer failed: {}", e));
            }
        };

        let mut failures = Vec::new();
        let scores: Vec<f64> = outcomes
            .into_iter()
            .enumerate()
            .map(|(i, outcome)| match outcome {
                Ok(score) => sanitize(score),
                Err(e) => {
                    tracing::warn!(
                        scorer = self.scorer.name(),
                        source = i,
                        error = %e,
                        "Relevance scoring failed for source, skipping it"
                    );
                    failures.push(format!("source {}: {}", i, e));
                    0.0
                }
            })
            .collect();
        let diagnostic = (!failures.is_empty()).then(|| {
            format!(
                "Scorer failed for {} of {} sources ({})",
                failures.len(),
                sources.len(),
                failures.join("; ")
            )
        });

        let floor = self.config.relevance_floor;
        let relevant: Vec<usize> = (0..scores.len()).filter(|&i| scores[i] > floor).collect();
        let origins: HashSet<&str> = relevant
            .iter()
            .filter_map(|&i| sources[i].origin.as_deref())
            .filter(|o| !o.is_empty())
            .collect();

        let confidence = noisy_or(&scores, floor, self.config.strictness);
        let verified = confidence > REQUIRED_CONFIDENCE;

        tracing::info!(
            sources = sources.len(),
            relevant = relevant.len(),
            confidence = confidence,
            verified,
            "Triangulated claim"
        );

        VerificationResult {
            verified,
            claim: claim.to_string(),
            source_count: sources.len(),
            required_confidence: REQUIRED_CONFIDENCE,
            confidence,
            method: METHOD.to_string(),
            scores,
            relevant_sources: relevant.len(),
            independent_origins: origins.len(),
            meets_min_sources: relevant.len() >= self.config.min_sources,
            diagnostic,
        }
    }

    fn empty(&self, claim: &str, source_count: usize, diagnostic: impl Into<String>) -> VerificationResult {
        VerificationResult {
            verified: false,
            claim: claim.to_string(),
            source_count,
            required_confidence: REQUIRED_CONFIDENCE,
            confidence: 0.0,
            method: METHOD.to_string(),
            scores: Vec::new(),
            relevant_sources: 0,
            independent_origins: 0,
            meets_min_sources: false,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// `1 - Π (1 - s * strictness)` over scores strictly above `floor`.
///
/// Zero when no score clears the floor. Always within `[0, 1]`.
pub fn noisy_or(scores: &[f64], floor: f64, strictness: f64) -> f64 {
    let p_false = scores
        .iter()
        .map(|&s| sanitize(s))
        .filter(|&s| s > floor)
        .fold(1.0, |p, s| p * (1.0 - s * strictness).clamp(0.0, 1.0));
    (1.0 - p_false).clamp(0.0, 1.0)
}

fn sanitize(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
