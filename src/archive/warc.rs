//! WARC-style record codec
//!
//! An archive file is a single gzip stream holding N sequential records:
//!
//! ```text
//! WARC/1.0\r\n
//! WARC-Type: response\r\n
//! WARC-Target-URI: <url>\r\n
//! WARC-Date: 2026-10-14T09:30:00Z\r\n
//! Content-Type: <content type>\r\n
//! Content-Length: <n>\r\n
//! \r\n
//! <n body bytes>\r\n\r\n
//! ```
//!
//! There is no index or footer, readers scan sequentially.

use super::digest::payload_hash;
use super::transaction::Transaction;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;

const VERSION_LINE: &str = "WARC/1.0";
const RECORD_DELIMITER: &[u8] = b"\r\n\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format the plaintext header block for one transaction.
pub fn format_record_header(tx: &Transaction) -> String {
    format!(
        "{}\r\n\
         WARC-Type: response\r\n\
         WARC-Target-URI: {}\r\n\
         WARC-Date: {}\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         \r\n",
        VERSION_LINE,
        tx.url,
        tx.observed_at.format(DATE_FORMAT),
        tx.content_type,
        tx.payload.len()
    )
}

/// Serialize transactions, in order, into one gzip-compressed archive buffer.
pub fn encode_archive(transactions: &[Transaction]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for tx in transactions {
        encoder.write_all(format_record_header(tx).as_bytes())?;
        encoder.write_all(&tx.payload)?;
        encoder.write_all(RECORD_DELIMITER)?;
    }
    Ok(encoder.finish()?)
}

/// One record read back from an archive file
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedRecord {
    /// `WARC-Target-URI`
    pub target_uri: String,
    /// `WARC-Date`
    pub date: DateTime<Utc>,
    /// `Content-Type`
    pub content_type: String,
    /// Body bytes, exactly `Content-Length` long
    #[serde(skip)]
    pub body: Vec<u8>,
    /// Digest of `body`
    pub payload_hash: String,
}

/// Decode a gzip archive buffer into its records.
pub fn decode_archive(compressed: &[u8]) -> Result<Vec<ArchivedRecord>> {
    let mut raw = Vec::new();
    GzDecoder::new(compressed)
        .read_to_end(&mut raw)
        .map_err(|e| Error::MalformedArchive(format!("gzip stream: {}", e)))?;

    let mut records = Vec::new();
    let mut pos = 0;
    while pos < raw.len() {
        let (record, next) = parse_record(&raw, pos)?;
        records.push(record);
        pos = next;
    }
    Ok(records)
}

/// Read an archive file from disk.
pub async fn read_archive(path: impl AsRef<Path>) -> Result<Vec<ArchivedRecord>> {
    let compressed = tokio::fs::read(path.as_ref()).await?;
    decode_archive(&compressed)
}

/// Outcome of re-verifying an archive file
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveVerification {
    /// Records found in the file
    pub records: Vec<ArchivedRecord>,
    /// Whether some record body matches the anchored payload hash
    pub payload_matched: bool,
    /// Target URI of the matching record
    pub matched_uri: Option<String>,
}

/// Re-read an archive and check that a record with the anchored payload hash
/// is still present.
pub async fn verify_archive(path: impl AsRef<Path>, expected_payload_hash: &str) -> Result<ArchiveVerification> {
    let records = read_archive(path).await?;
    let expected = expected_payload_hash.trim().to_ascii_lowercase();
    let matched_uri = records
        .iter()
        .find(|r| r.payload_hash == expected)
        .map(|r| r.target_uri.clone());

    Ok(ArchiveVerification {
        payload_matched: matched_uri.is_some(),
        matched_uri,
        records,
    })
}

fn parse_record(raw: &[u8], start: usize) -> Result<(ArchivedRecord, usize)> {
    let header_len = find(&raw[start..], HEADER_END).ok_or_else(|| {
        Error::MalformedArchive(format!("unterminated header block at offset {}", start))
    })?;
    let header = std::str::from_utf8(&raw[start..start + header_len])
        .map_err(|_| Error::MalformedArchive(format!("non-UTF-8 header at offset {}", start)))?;

    let mut lines = header.split("\r\n");
    if lines.next() != Some(VERSION_LINE) {
        return Err(Error::MalformedArchive(format!(
            "missing {} at offset {}",
            VERSION_LINE, start
        )));
    }

    let mut target_uri = None;
    let mut date = None;
    let mut content_type = String::new();
    let mut length = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            return Err(Error::MalformedArchive(format!("bad header line: {:?}", line)));
        };
        let value = value.trim();
        match name.trim() {
            "WARC-Target-URI" => target_uri = Some(value.to_string()),
            "WARC-Date" => {
                let parsed = NaiveDateTime::parse_from_str(value, DATE_FORMAT)
                    .map_err(|e| Error::MalformedArchive(format!("bad WARC-Date {:?}: {}", value, e)))?;
                date = Some(parsed.and_utc());
            }
            "Content-Type" => content_type = value.to_string(),
            "Content-Length" => {
                length = Some(value.parse::<usize>().map_err(|_| {
                    Error::MalformedArchive(format!("bad Content-Length {:?}", value))
                })?)
            }
            _ => {}
        }
    }

    let target_uri =
        target_uri.ok_or_else(|| Error::MalformedArchive("missing WARC-Target-URI".to_string()))?;
    let date = date.ok_or_else(|| Error::MalformedArchive("missing WARC-Date".to_string()))?;
    let length =
        length.ok_or_else(|| Error::MalformedArchive("missing Content-Length".to_string()))?;

    let body_start = start + header_len + HEADER_END.len();
    let body_end = body_start
        .checked_add(length)
        .filter(|end| *end <= raw.len())
        .ok_or_else(|| Error::MalformedArchive(format!("truncated body for {}", target_uri)))?;
    let delimiter_end = body_end + RECORD_DELIMITER.len();
    if raw.get(body_end..delimiter_end) != Some(RECORD_DELIMITER) {
        return Err(Error::MalformedArchive(format!(
            "missing record delimiter after {}",
            target_uri
        )));
    }

    let body = raw[body_start..body_end].to_vec();
    let record = ArchivedRecord {
        payload_hash: payload_hash(&body),
        target_uri,
        date,
        content_type,
        body,
    };
    Ok((record, delimiter_end))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
