//! Content-addressing digests
//!
//! All digests are SHA-256 rendered as lowercase hex.

use super::transaction::HeaderList;
use serde::Serialize;
use serde_json::ser::Formatter;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io;

/// Response headers that make up the freshness fingerprint.
pub const FINGERPRINT_HEADERS: [&str; 4] = ["date", "server", "etag", "last-modified"];

/// Digest of raw payload bytes
pub fn payload_hash(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Canonical serialization of the fingerprint headers present on a response.
///
/// Keys are lower-cased and sorted; absent or empty headers are omitted. The
/// text is `{"date": "...", "server": "..."}` with `", "` and `": "`
/// separators and non-ASCII escaped as `\uXXXX`, so hashes agree with
/// archives anchored by Python tooling (`json.dumps(sort_keys=True)`).
pub fn canonical_header_subset(headers: &HeaderList) -> String {
    let subset: BTreeMap<&str, &str> = FINGERPRINT_HEADERS
        .iter()
        .filter_map(|name| {
            headers
                .get(name)
                .filter(|v| !v.is_empty())
                .map(|v| (*name, v))
        })
        .collect();
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedAsciiFormatter);
    // A map of strings always serializes
    if subset.serialize(&mut serializer).is_err() {
        return "{}".to_string();
    }
    String::from_utf8(buf).unwrap_or_else(|_| "{}".to_string())
}

/// JSON formatter with spaced separators and ASCII-only output
struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        for ch in fragment.chars() {
            if (' '..='~').contains(&ch) {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Digest of the canonical fingerprint header subset
pub fn header_hash(headers: &HeaderList) -> String {
    hex::encode(Sha256::digest(canonical_header_subset(headers).as_bytes()))
}

/// Truncated digest of a target URL, used in archive file names
pub fn url_digest(url: &str, len: usize) -> String {
    let mut digest = hex::encode(Sha256::digest(url.as_bytes()));
    digest.truncate(len);
    digest
}
