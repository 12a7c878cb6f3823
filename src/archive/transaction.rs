//! Captured HTTP transaction types
//!
//! A `Transaction` is one observed request/response exchange as delivered by
//! the Browsing Surface. `ResponseEvent` is the surface's live handle for a
//! response whose body has not been fetched yet.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered header list with case-insensitive lookup.
///
/// Keeps the order the transport reported, so archives can reproduce it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderList(Vec<(String, String)>);

impl HeaderList {
    /// Create an empty header list
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a header, keeping any earlier value with the same name
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value for `name`, compared case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterate headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderList
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One observed HTTP exchange.
///
/// Immutable once recorded. `payload` holds the exact bytes the transport
/// delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Response URL
    pub url: String,
    /// Request method
    pub method: String,
    /// Request headers
    pub request_headers: HeaderList,
    /// Response headers
    pub response_headers: HeaderList,
    /// HTTP status code
    pub status_code: u16,
    /// Raw response body
    #[serde(skip)]
    pub payload: Bytes,
    /// Lower-cased `content-type` response header
    pub content_type: String,
    /// When the response was observed
    pub observed_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a transaction, deriving the content type from the response headers.
    pub fn new(
        url: impl Into<String>,
        method: impl Into<String>,
        request_headers: HeaderList,
        response_headers: HeaderList,
        status_code: u16,
        payload: impl Into<Bytes>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let content_type = content_type_of(&response_headers);
        Self {
            url: url.into(),
            method: method.into(),
            request_headers,
            response_headers,
            status_code,
            payload: payload.into(),
            content_type,
            observed_at,
        }
    }
}

/// Lower-cased `content-type` header, or an empty string when absent.
pub fn content_type_of(headers: &HeaderList) -> String {
    headers
        .get("content-type")
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// A response observed by the Browsing Surface during navigation.
///
/// Everything except the body is available at interception time; the body
/// is fetched lazily and may fail (stream closed, transport error).
#[async_trait]
pub trait ResponseEvent: Send + Sync {
    fn url(&self) -> &str;

    fn method(&self) -> &str;

    fn request_headers(&self) -> HeaderList;

    fn response_headers(&self) -> HeaderList;

    fn status(&self) -> u16;

    /// Fetch the response body bytes.
    async fn body(&self) -> std::result::Result<Bytes, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let headers: HeaderList = [("Content-Type", "text/HTML"), ("ETag", "\"abc\"")]
            .into_iter()
            .collect();
        assert_eq!(headers.get("content-type"), Some("text/HTML"));
        assert_eq!(headers.get("etag"), Some("\"abc\""));
        assert_eq!(headers.get("server"), None);
    }

    #[test]
    fn test_header_order_preserved() {
        let mut headers = HeaderList::new();
        headers.push("b", "2");
        headers.push("a", "1");
        headers.push("B", "3");
        let names: Vec<&str> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a", "B"]);
        assert_eq!(headers.get("b"), Some("2"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_transaction_lowercases_content_type() {
        let headers: HeaderList = [("Content-Type", " Application/JSON; charset=UTF-8")]
            .into_iter()
            .collect();
        let tx = Transaction::new(
            "https://example.com/api",
            "GET",
            HeaderList::new(),
            headers,
            200,
            Bytes::from_static(b"{}"),
            Utc::now(),
        );
        assert_eq!(tx.content_type, "application/json; charset=utf-8");
        assert_eq!(tx.payload.as_ref(), b"{}");
    }

    #[test]
    fn test_missing_content_type_is_empty() {
        assert_eq!(content_type_of(&HeaderList::new()), "");
    }
}
