//! Caller-facing capture summary

use super::recorder::FrozenArchive;
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Result of one capture mission, ready to hand back to a tool caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureReport {
    pub success: bool,
    pub url: String,
    pub warc_path: Option<String>,
    pub payload_hash: Option<String>,
    pub headers_hash: Option<String>,
    /// Distilled page text, truncated for display
    pub extracted_content: Option<String>,
    pub error: Option<String>,
}

impl CaptureReport {
    /// Build a report from the outcome of `ArchiveRecorder::freeze`.
    ///
    /// `extracted` is truncated to `excerpt_chars` characters plus `...`.
    pub fn from_freeze(
        url: impl Into<String>,
        frozen: &Result<FrozenArchive, Error>,
        extracted: Option<String>,
        excerpt_chars: usize,
    ) -> Self {
        let url = url.into();
        match frozen {
            Ok(archive) => Self {
                success: true,
                url,
                warc_path: Some(archive.path.display().to_string()),
                payload_hash: Some(archive.payload_hash.clone()),
                headers_hash: Some(archive.headers_hash.clone()),
                extracted_content: extracted.map(|text| excerpt(&text, excerpt_chars)),
                error: None,
            },
            Err(e) => Self::failure(url, e.to_string()),
        }
    }

    /// A report for a capture that did not produce an archive
    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: url.into(),
            warc_path: None,
            payload_hash: None,
            headers_hash: None,
            extracted_content: None,
            error: Some(error.into()),
        }
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
