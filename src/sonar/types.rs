//! Sonar result types

use serde::{Deserialize, Serialize};

/// Information gain reported when there is no context to compare against
pub const FRESH_GAIN: f64 = 2.0;

/// Novelty classification of one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationLevel {
    /// No context yet, everything is new
    Fresh,
    HighlyNovel,
    ModeratelyNovel,
    MarginallyNovel,
    /// Low gain, below the escalation threshold
    Saturated,
    /// Low gain for too many consecutive calls
    CriticallySaturated,
}

impl SaturationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaturationLevel::Fresh => "fresh",
            SaturationLevel::HighlyNovel => "highly_novel",
            SaturationLevel::ModeratelyNovel => "moderately_novel",
            SaturationLevel::MarginallyNovel => "marginally_novel",
            SaturationLevel::Saturated => "saturated",
            SaturationLevel::CriticallySaturated => "critically_saturated",
        }
    }

    /// Fixed guidance for the caller at this level
    pub fn recommendation(&self) -> &'static str {
        match self {
            SaturationLevel::Fresh => "Continue gathering information.",
            SaturationLevel::HighlyNovel => {
                "Significant new information. Continue exploring this thread."
            }
            SaturationLevel::ModeratelyNovel => {
                "Good information gain. Continue with current approach."
            }
            SaturationLevel::MarginallyNovel => {
                "Some new information. Consider diversifying sources."
            }
            SaturationLevel::Saturated => {
                "Low information gain. Consider pivoting to alternative sources."
            }
            SaturationLevel::CriticallySaturated => {
                "SURFACE NOW: Critical saturation detected. You are likely reading \
                 redundant content or SEO spam. Pivot to a different source or \
                 reformulate your query."
            }
        }
    }

    /// Whether the caller should stop searching and surface results
    pub fn should_surface(&self) -> bool {
        matches!(self, SaturationLevel::CriticallySaturated)
    }
}

impl std::fmt::Display for SaturationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one `NoveltyGate::analyze` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SonarResult {
    /// Compression ratio, rounded to 4 decimals
    pub information_gain: f64,
    pub is_saturated: bool,
    pub saturation_level: SaturationLevel,
    pub recommendation: String,
    /// Saturated observations in a row, including this one
    pub consecutive_saturations: u32,
}

impl SonarResult {
    pub(crate) fn new(ratio: f64, is_saturated: bool, level: SaturationLevel, streak: u32) -> Self {
        Self {
            information_gain: round4(ratio),
            is_saturated,
            saturation_level: level,
            recommendation: level.recommendation().to_string(),
            consecutive_saturations: streak,
        }
    }
}

/// Saturation bookkeeping owned by one gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaturationState {
    /// Consecutive saturated observations
    pub counter: u32,
    /// Counter value at which saturation turns critical
    pub escalation_threshold: u32,
}

impl SaturationState {
    pub fn new(escalation_threshold: u32) -> Self {
        Self {
            counter: 0,
            escalation_threshold,
        }
    }

    /// Apply one observation: +1 when saturated, back to 0 otherwise.
    pub fn observe(&mut self, saturated: bool) {
        if saturated {
            self.counter = self.counter.saturating_add(1);
        } else {
            self.counter = 0;
        }
    }

    pub fn is_escalated(&self) -> bool {
        self.counter >= self.escalation_threshold
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
