//! Evidentia configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main Evidentia configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidentiaConfig {
    /// Capture archive configuration
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Novelty sonar configuration
    #[serde(default)]
    pub sonar: SonarConfig,

    /// Claim triangulation configuration
    #[serde(default)]
    pub triangulation: TriangulationConfig,

    /// Content distillation configuration
    #[serde(default)]
    pub distill: DistillConfig,
}

impl EvidentiaConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the scoring invariants.
    pub fn validate(&self) -> Result<()> {
        if self.archive.allowed_content_types.is_empty() {
            return Err(Error::Config(
                "archive.allowed_content_types must not be empty".to_string(),
            ));
        }
        if !(4..=64).contains(&self.archive.filename_hash_len) {
            return Err(Error::Config(format!(
                "archive.filename_hash_len must be within 4..=64, got {}",
                self.archive.filename_hash_len
            )));
        }
        if self.sonar.threshold.is_nan() || self.sonar.threshold <= 0.0 {
            return Err(Error::Config(format!(
                "sonar.threshold must be positive, got {}",
                self.sonar.threshold
            )));
        }
        if self.sonar.escalation_threshold == 0 {
            return Err(Error::Config(
                "sonar.escalation_threshold must be at least 1".to_string(),
            ));
        }
        if self.sonar.highly_novel < self.sonar.moderately_novel {
            return Err(Error::Config(
                "sonar.highly_novel must not be below sonar.moderately_novel".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.triangulation.relevance_floor) {
            return Err(Error::Config(format!(
                "triangulation.relevance_floor must be within [0, 1), got {}",
                self.triangulation.relevance_floor
            )));
        }
        if self.triangulation.strictness.is_nan()
            || self.triangulation.strictness <= 0.0
            || self.triangulation.strictness > 1.0
        {
            return Err(Error::Config(format!(
                "triangulation.strictness must be within (0, 1], got {}",
                self.triangulation.strictness
            )));
        }
        Ok(())
    }
}

/// Capture archive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory archive files are written to
    pub storage_dir: PathBuf,

    /// Content-type fragments that are worth archiving
    pub allowed_content_types: Vec<String>,

    /// Hex characters of the target URL digest embedded in file names
    pub filename_hash_len: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        let storage_dir = dirs_next::data_local_dir()
            .map(|p| p.join("evidentia").join("archive"))
            .unwrap_or_else(|| PathBuf::from("./web_archive"));

        Self {
            storage_dir,
            allowed_content_types: default_allowed_content_types(),
            filename_hash_len: 16,
        }
    }
}

/// Default allow-list: documents, structured data and plain text.
pub fn default_allowed_content_types() -> Vec<String> {
    [
        "text/html",
        "application/xhtml+xml",
        "application/json",
        "application/xml",
        "text/xml",
        "text/plain",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Novelty sonar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SonarConfig {
    /// Information gain below this ratio counts as saturated
    pub threshold: f64,

    /// Consecutive saturated calls before escalating to critical
    pub escalation_threshold: u32,

    /// Ratio at or above which content is highly novel
    pub highly_novel: f64,

    /// Ratio at or above which content is moderately novel
    pub moderately_novel: f64,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            threshold: 1.05,
            escalation_threshold: 3,
            highly_novel: 1.20,
            moderately_novel: 1.10,
        }
    }
}

/// Claim triangulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangulationConfig {
    /// Sources scoring at or below this are discarded
    pub relevance_floor: f64,

    /// Discount applied to each source's relevance (alpha)
    pub strictness: f64,

    /// Relevant sources a caller would like to see (advisory)
    pub min_sources: usize,
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            relevance_floor: 0.7,
            strictness: 0.8,
            min_sources: 3,
        }
    }
}

/// Content distillation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistillConfig {
    /// Characters of extracted content kept in capture reports
    pub excerpt_chars: usize,
}

impl Default for DistillConfig {
    fn default() -> Self {
        Self { excerpt_chars: 500 }
    }
}
