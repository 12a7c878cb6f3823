//! Content-type filter for captured traffic
//!
//! Only documents, structured data and plain text are evidence. Images,
//! scripts, stylesheets, media and fonts are dropped before their bodies are
//! fetched. Rejection is routine and never an error.

use crate::config::default_allowed_content_types;
use serde::{Deserialize, Serialize};

/// Coarse class of a response content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentClass {
    /// HTML or XHTML document
    Document,
    /// JSON or XML payload
    Data,
    /// Plain text
    Text,
    /// Anything else (images, scripts, styles, media, fonts, unknown)
    Noise,
}

/// Allow-list filter over lower-cased content types
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    allowed: Vec<String>,
}

impl TransactionFilter {
    /// Create a filter from content-type fragments (matched as substrings).
    pub fn new(allowed: Vec<String>) -> Self {
        Self {
            allowed: allowed.into_iter().map(|t| t.to_ascii_lowercase()).collect(),
        }
    }

    /// Whether a transaction with this content type should be archived
    pub fn accept(&self, content_type: &str) -> bool {
        let content_type = content_type.to_ascii_lowercase();
        self.allowed.iter().any(|t| content_type.contains(t.as_str()))
    }

    /// Classify a content type. Types outside the allow-list are `Noise`.
    pub fn classify(&self, content_type: &str) -> ContentClass {
        if !self.accept(content_type) {
            return ContentClass::Noise;
        }
        let content_type = content_type.to_ascii_lowercase();
        if is_html(&content_type) {
            ContentClass::Document
        } else if content_type.contains("json") || content_type.contains("xml") {
            ContentClass::Data
        } else if content_type.contains("text/plain") {
            ContentClass::Text
        } else {
            // Allowed by a custom fragment we do not know how to label
            ContentClass::Data
        }
    }
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self::new(default_allowed_content_types())
    }
}

/// Whether a lower-cased content type denotes an HTML document
pub fn is_html(content_type: &str) -> bool {
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}
