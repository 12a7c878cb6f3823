//! Pluggable relevance scoring
//!
//! A `RelevanceScorer` maps `claim × source text → [0, 1]`. The built-in
//! `KeywordOverlapScorer` needs nothing external; `TokenOverlapScorer` is its
//! whole-word variant; `EmbeddingScorer` wraps any `EmbeddingBackend` behind
//! the same contract.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;

/// Claim-to-source relevance collaborator.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Relevance of `source` to `claim`, in `[0, 1]`.
    async fn score(&self, claim: &str, source: &str) -> Result<f64>;

    /// Score every source against the same claim, one outcome per source in order.
    ///
    /// The outer error fails the whole batch. An inner error fails only its
    /// source.
    async fn score_batch(&self, claim: &str, sources: &[&str]) -> Result<Vec<Result<f64>>> {
        Ok(futures::future::join_all(sources.iter().map(|source| self.score(claim, source))).await)
    }

    /// Scorer name for diagnostics
    fn name(&self) -> &str;
}

/// Fraction of the claim's distinct lowercase words found anywhere in the
/// lowercased source, as substrings ("the" matches inside "weather").
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordOverlapScorer;

impl KeywordOverlapScorer {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous scoring, shared by the trait impl.
    pub fn overlap(claim: &str, source: &str) -> f64 {
        let claim_words: HashSet<String> = claim.split_whitespace().map(str::to_lowercase).collect();
        if claim_words.is_empty() {
            return 0.0;
        }
        let source = source.to_lowercase();
        let matches = claim_words
            .iter()
            .filter(|w| source.contains(w.as_str()))
            .count();
        (matches as f64 / claim_words.len() as f64).min(1.0)
    }
}

#[async_trait]
impl RelevanceScorer for KeywordOverlapScorer {
    async fn score(&self, claim: &str, source: &str) -> Result<f64> {
        Ok(Self::overlap(claim, source))
    }

    fn name(&self) -> &str {
        "keyword_overlap"
    }
}

/// Fraction of the claim's distinct tokens that appear as whole tokens in the
/// source. Stricter than `KeywordOverlapScorer`: "sky" does not match "skyline".
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOverlapScorer;

impl TokenOverlapScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn overlap(claim: &str, source: &str) -> f64 {
        let claim_tokens = tokens(claim);
        if claim_tokens.is_empty() {
            return 0.0;
        }
        let source_tokens = tokens(source);
        let matches = claim_tokens
            .iter()
            .filter(|t| source_tokens.contains(*t))
            .count();
        (matches as f64 / claim_tokens.len() as f64).clamp(0.0, 1.0)
    }
}

#[async_trait]
impl RelevanceScorer for TokenOverlapScorer {
    async fn score(&self, claim: &str, source: &str) -> Result<f64> {
        Ok(Self::overlap(claim, source))
    }

    fn name(&self) -> &str {
        "token_overlap"
    }
}

/// Lowercase whitespace tokens with surrounding punctuation trimmed.
pub fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Text embedding collaborator (external semantic model).
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// One vector per input text, in order.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    fn name(&self) -> &str;
}

/// Cosine similarity of claim and source embeddings, clamped to `[0, 1]`.
pub struct EmbeddingScorer<B> {
    backend: B,
}

impl<B: EmbeddingBackend> EmbeddingScorer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: EmbeddingBackend> RelevanceScorer for EmbeddingScorer<B> {
    async fn score(&self, claim: &str, source: &str) -> Result<f64> {
        let scores = self.score_batch(claim, &[source]).await?;
        scores
            .into_iter()
            .next()
            .ok_or_else(|| Error::Scorer(format!("{} returned no score", self.backend.name())))?
    }

    async fn score_batch(&self, claim: &str, sources: &[&str]) -> Result<Vec<Result<f64>>> {
        let mut texts = Vec::with_capacity(sources.len() + 1);
        texts.push(claim);
        texts.extend_from_slice(sources);

        let vectors = self.backend.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(Error::Scorer(format!(
                "{} returned {} embeddings for {} texts",
                self.backend.name(),
                vectors.len(),
                texts.len()
            )));
        }

        let (claim_vec, source_vecs) = vectors.split_first().ok_or_else(|| {
            Error::Scorer(format!("{} returned no embeddings", self.backend.name()))
        })?;
        Ok(source_vecs
            .iter()
            .map(|v| cosine(claim_vec, v).map(|c| c.clamp(0.0, 1.0)))
            .collect())
    }

    fn name(&self) -> &str {
        "embedding_cosine"
    }
}

fn cosine(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::Scorer(format!(
            "embedding dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_normalize() {
        let t = tokens("The Sky, is BLUE!  -- ");
        let expected: HashSet<String> = ["the", "sky", "is", "blue"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(t, expected);
    }

    #[test]
    fn test_overlap_scores() {
        let claim = "the sky is blue";
        assert_eq!(KeywordOverlapScorer::overlap(claim, "the sky is blue today"), 1.0);
        // "the" is found inside "weather"
        assert_eq!(KeywordOverlapScorer::overlap(claim, "weather reports confirm sky is blue"), 1.0);
        assert_eq!(KeywordOverlapScorer::overlap(claim, "unrelated text about cars"), 0.0);
    }

    #[test]
    fn test_overlap_is_case_insensitive_substring() {
        assert_eq!(KeywordOverlapScorer::overlap("SKY", "skyline at dusk"), 1.0);
        assert_eq!(KeywordOverlapScorer::overlap("Blue Sky", "BLUE water"), 0.5);
    }

    #[test]
    fn test_token_overlap_matches_whole_words() {
        let claim = "the sky is blue";
        assert_eq!(TokenOverlapScorer::overlap(claim, "the sky is blue today"), 1.0);
        assert!(
            (TokenOverlapScorer::overlap(claim, "weather reports confirm sky is blue") - 0.75).abs()
                < 1e-12
        );
        assert_eq!(TokenOverlapScorer::overlap("sky", "skyline at dusk"), 0.0);
        assert_eq!(TokenOverlapScorer::overlap("", "anything"), 0.0);
        assert_eq!(TokenOverlapScorer::new().name(), "token_overlap");
    }

    #[test]
    fn test_overlap_counts_distinct_tokens() {
        // "blue" twice in the claim counts once
        let score = KeywordOverlapScorer::overlap("blue blue sky", "a blue car");
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_overlap_empty_claim() {
        assert_eq!(KeywordOverlapScorer::overlap("", "anything"), 0.0);
        assert_eq!(KeywordOverlapScorer::overlap("  ...  ", "anything"), 0.0);
    }

    #[tokio::test]
    async fn test_keyword_batch_preserves_order() {
        let scorer = KeywordOverlapScorer::new();
        let scores = scorer
            .score_batch("red apple", &["red apple", "green pear", "apple"])
            .await
            .unwrap();
        let scores: Vec<f64> = scores.into_iter().map(|s| s.unwrap()).collect();
        assert_eq!(scores, vec![1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_keyword_scorer_from_sync_context() {
        let scorer = KeywordOverlapScorer::new();
        let score = tokio_test::block_on(scorer.score("blue sky", "the sky is blue")).unwrap();
        assert!((score - 1.0).abs() < 1e-12);
        assert_eq!(scorer.name(), "keyword_overlap");
    }

    struct TopicBackend;

    #[async_trait]
    impl EmbeddingBackend for TopicBackend {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("sky") {
                        vec![1.0, 0.0]
                    } else if t.contains("weather") {
                        vec![1.0, 1.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }

        fn name(&self) -> &str {
            "topic"
        }
    }

    struct ShortBackend;

    #[async_trait]
    impl EmbeddingBackend for ShortBackend {
        async fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0]])
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    #[tokio::test]
    async fn test_embedding_scorer_cosine() {
        let scorer = EmbeddingScorer::new(TopicBackend);
        let scores = scorer
            .score_batch("the sky is blue", &["sky report", "weather", "cars"])
            .await
            .unwrap();
        let scores: Vec<f64> = scores.into_iter().map(|s| s.unwrap()).collect();
        assert!((scores[0] - 1.0).abs() < 1e-9);
        assert!((scores[1] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert_eq!(scores[2], 0.0);

        let single = scorer.score("the sky is blue", "sky").await.unwrap();
        assert!((single - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_embedding_scorer_count_mismatch() {
        let scorer = EmbeddingScorer::new(ShortBackend);
        let err = scorer.score_batch("claim", &["a", "b"]).await.unwrap_err();
        assert!(matches!(err, Error::Scorer(_)));
    }

    struct RaggedBackend;

    #[async_trait]
    impl EmbeddingBackend for RaggedBackend {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| if *t == "short" { vec![1.0] } else { vec![1.0, 0.0] })
                .collect())
        }

        fn name(&self) -> &str {
            "ragged"
        }
    }

    #[tokio::test]
    async fn test_embedding_dimension_mismatch_fails_one_source() {
        let scorer = EmbeddingScorer::new(RaggedBackend);
        let scores = scorer.score_batch("claim", &["long", "short"]).await.unwrap();
        assert!((*scores[0].as_ref().unwrap() - 1.0).abs() < 1e-9);
        assert!(matches!(scores[1], Err(Error::Scorer(_))));
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        assert!(cosine(&[1.0, 0.0], &[1.0]).is_err());
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
    }
}
