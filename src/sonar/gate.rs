//! Compression-ratio novelty gate
//!
//! `ratio = |zlib(context + new_text)| / |zlib(context)|`. Content the
//! compressor can express through back-references into the context barely
//! grows the output, so redundant text stays near 1.0 while genuinely new
//! text pushes the ratio up.

use super::types::{SaturationLevel, SaturationState, SonarResult, FRESH_GAIN};
use crate::config::SonarConfig;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// Stateful saturation detector for one research session
#[derive(Debug, Clone)]
pub struct NoveltyGate {
    config: SonarConfig,
    state: SaturationState,
}

impl NoveltyGate {
    pub fn new(config: &SonarConfig) -> Self {
        Self {
            state: SaturationState::new(config.escalation_threshold),
            config: config.clone(),
        }
    }

    /// Analyze `new_text` against `context` using the configured threshold.
    pub fn analyze(&mut self, new_text: &str, context: &str) -> SonarResult {
        let threshold = self.config.threshold;
        self.analyze_with_threshold(new_text, context, threshold)
    }

    /// Analyze with an explicit saturation threshold for this call.
    pub fn analyze_with_threshold(&mut self, new_text: &str, context: &str, threshold: f64) -> SonarResult {
        if context.is_empty() {
            self.state.observe(false);
            return SonarResult::new(FRESH_GAIN, false, SaturationLevel::Fresh, self.state.counter);
        }

        let ratio = information_gain(context, new_text);
        let is_saturated = ratio < threshold;
        self.state.observe(is_saturated);

        let level = self.classify(ratio, threshold);
        let gain = format!("{:.4}", ratio);
        tracing::info!(gain = %gain, level = %level, streak = self.state.counter, "Sonar");

        SonarResult::new(ratio, is_saturated, level, self.state.counter)
    }

    /// Level for `ratio`, using the current saturation streak.
    fn classify(&self, ratio: f64, threshold: f64) -> SaturationLevel {
        if ratio >= self.config.highly_novel {
            SaturationLevel::HighlyNovel
        } else if ratio >= self.config.moderately_novel {
            SaturationLevel::ModeratelyNovel
        } else if ratio >= threshold {
            SaturationLevel::MarginallyNovel
        } else if self.state.is_escalated() {
            SaturationLevel::CriticallySaturated
        } else {
            SaturationLevel::Saturated
        }
    }

    /// Zero the saturation streak
    pub fn reset(&mut self) {
        self.state.reset();
        tracing::debug!("Sonar saturation counter reset");
    }

    pub fn state(&self) -> SaturationState {
        self.state
    }
}

impl Default for NoveltyGate {
    fn default() -> Self {
        Self::new(&SonarConfig::default())
    }
}

/// Compression ratio of `context + new_text` over `context`.
///
/// Falls back to `FRESH_GAIN` if the compressed context is empty.
pub fn information_gain(context: &str, new_text: &str) -> f64 {
    let base = compressed_len(&[context.as_bytes()]);
    let combined = compressed_len(&[context.as_bytes(), new_text.as_bytes()]);
    match (base, combined) {
        (Some(base), Some(combined)) if base > 0 => combined as f64 / base as f64,
        _ => FRESH_GAIN,
    }
}

fn compressed_len(parts: &[&[u8]]) -> Option<usize> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    for part in parts {
        encoder.write_all(part).ok()?;
    }
    encoder.finish().ok().map(|out| out.len())
}
