//! Capture-unit recorder
//!
//! Buffers the accepted transactions of one capture unit and freezes them
//! into a content-addressed archive file. One recorder per browsing session;
//! recorders never share state.
//!
//! `freeze` does not drain the buffer. Freezing twice without `clear()` and
//! new traffic writes a second file with the same records and hashes.

use super::digest::{header_hash, payload_hash, url_digest};
use super::filter::{is_html, ContentClass, TransactionFilter};
use super::transaction::{content_type_of, ResponseEvent, Transaction};
use super::warc::encode_archive;
use crate::config::ArchiveConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const FILE_PREFIX: &str = "record_";
const FILE_SUFFIX: &str = ".warc.gz";

/// Durable output of a freeze
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrozenArchive {
    /// Archive file path
    pub path: PathBuf,
    /// SHA-256 of the primary transaction's body
    pub payload_hash: String,
    /// SHA-256 of the primary response's fingerprint headers
    pub headers_hash: String,
    /// URL of the primary transaction
    pub primary_url: String,
    /// Content class of the primary transaction
    pub primary_class: ContentClass,
    /// Records written
    pub record_count: usize,
}

#[derive(Default)]
struct CaptureBuffer {
    transactions: Vec<Transaction>,
    /// Set by `freeze`, cleared by new traffic or `clear`
    frozen: bool,
}

/// Recorder for one capture unit
pub struct ArchiveRecorder {
    storage_dir: PathBuf,
    filename_hash_len: usize,
    filter: TransactionFilter,
    buffer: Mutex<CaptureBuffer>,
}

impl ArchiveRecorder {
    /// Create a recorder from archive configuration
    pub fn new(config: &ArchiveConfig) -> Self {
        Self {
            storage_dir: config.storage_dir.clone(),
            filename_hash_len: config.filename_hash_len,
            filter: TransactionFilter::new(config.allowed_content_types.clone()),
            buffer: Mutex::new(CaptureBuffer::default()),
        }
    }

    /// Create a recorder with default settings writing into `storage_dir`
    pub fn with_storage_dir(storage_dir: impl Into<PathBuf>) -> Self {
        let config = ArchiveConfig {
            storage_dir: storage_dir.into(),
            ..ArchiveConfig::default()
        };
        Self::new(&config)
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Intercept a live response from the Browsing Surface.
    ///
    /// Noise is filtered before the body is fetched. A body that cannot be
    /// fetched drops the transaction. Returns whether it was recorded.
    pub async fn intercept(&self, event: &dyn ResponseEvent) -> bool {
        let observed_at = Utc::now();
        let response_headers = event.response_headers();
        let content_type = content_type_of(&response_headers);
        let class = self.filter.classify(&content_type);
        if class == ContentClass::Noise {
            tracing::debug!(url = event.url(), content_type = %content_type, "Filtered non-evidence response");
            return false;
        }

        let body = match event.body().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(url = event.url(), error = %e, "Failed to fetch body, dropping transaction");
                return false;
            }
        };

        let transaction = Transaction {
            url: event.url().to_string(),
            method: event.method().to_string(),
            request_headers: event.request_headers(),
            response_headers,
            status_code: event.status(),
            payload: body,
            content_type,
            observed_at,
        };
        tracing::debug!(url = %transaction.url, class = ?class, "Recorded transaction");
        self.push(transaction).await;
        true
    }

    /// Record an already-fetched transaction, applying the same filter.
    pub async fn record(&self, transaction: Transaction) -> bool {
        let class = self.filter.classify(&transaction.content_type);
        if class == ContentClass::Noise {
            tracing::debug!(url = %transaction.url, "Filtered non-evidence transaction");
            return false;
        }
        tracing::debug!(url = %transaction.url, class = ?class, "Recorded transaction");
        self.push(transaction).await;
        true
    }

    async fn push(&self, transaction: Transaction) {
        let mut buffer = self.buffer.lock().await;
        buffer.transactions.push(transaction);
        buffer.frozen = false;
    }

    /// Transactions currently buffered
    pub async fn len(&self) -> usize {
        self.buffer.lock().await.transactions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.buffer.lock().await.transactions.is_empty()
    }

    /// Freeze the buffered transactions into an archive file.
    ///
    /// Fails with `Error::EmptyArchive` (and writes nothing) when no
    /// transaction was accepted. The buffer lock is held for the whole
    /// freeze, so concurrent intercepts wait.
    pub async fn freeze(&self, target_url: &str) -> Result<FrozenArchive> {
        let mut buffer = self.buffer.lock().await;
        if buffer.transactions.is_empty() {
            return Err(Error::EmptyArchive);
        }
        if buffer.frozen {
            tracing::warn!(
                target_url,
                "Freezing a capture unit again without new traffic, records will be duplicated"
            );
        }

        // Stable: ties keep interception order
        buffer.transactions.sort_by_key(|t| t.observed_at);
        let transactions = &buffer.transactions;

        let primary = select_primary(transactions, target_url).ok_or(Error::EmptyArchive)?;
        let payload_hash = payload_hash(&primary.payload);
        let headers_hash = header_hash(&primary.response_headers);
        let primary_url = primary.url.clone();
        let primary_class = self.filter.classify(&primary.content_type);

        let encoded = encode_archive(transactions)?;
        tokio::fs::create_dir_all(&self.storage_dir).await?;
        let path = self
            .storage_dir
            .join(archive_file_name(target_url, Utc::now(), self.filename_hash_len));
        write_archive_file(&path, &encoded).await?;

        let record_count = transactions.len();
        buffer.frozen = true;

        tracing::info!(
            path = %path.display(),
            records = record_count,
            primary = %primary_url,
            "Capture archive frozen"
        );

        Ok(FrozenArchive {
            path,
            payload_hash,
            headers_hash,
            primary_url,
            primary_class,
            record_count,
        })
    }

    /// Drop all buffered transactions before reusing the recorder.
    pub async fn clear(&self) {
        let mut buffer = self.buffer.lock().await;
        buffer.transactions.clear();
        buffer.frozen = false;
    }

    /// Archive files previously frozen for `target_url` in this recorder's directory
    pub async fn archives_for(&self, target_url: &str) -> Result<Vec<PathBuf>> {
        archives_for_url(&self.storage_dir, target_url, self.filename_hash_len).await
    }
}

async fn write_archive_file(path: &Path, encoded: &[u8]) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| Error::Archive(format!("Failed to create {}: {}", path.display(), e)))?;
    let written = write_synced(&mut file, encoded).await;
    drop(file);
    discard_on_error(path, written).await
}

async fn write_synced(file: &mut tokio::fs::File, encoded: &[u8]) -> std::io::Result<()> {
    file.write_all(encoded).await?;
    file.flush().await?;
    file.sync_all().await
}

/// Remove a partially written archive so it is never listed as a capture.
async fn discard_on_error(path: &Path, written: std::io::Result<()>) -> Result<()> {
    let Err(e) = written else {
        return Ok(());
    };
    if let Err(remove_err) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %remove_err, "Failed to remove partial archive");
    }
    Err(Error::Archive(format!("Failed to write {}: {}", path.display(), e)))
}

/// Choose the transaction that represents a capture unit.
///
/// Preference: exact target URL match, then the first HTML document, then
/// the earliest transaction. `transactions` must already be time-sorted.
pub fn select_primary<'a>(transactions: &'a [Transaction], target_url: &str) -> Option<&'a Transaction> {
    transactions
        .iter()
        .find(|t| t.url == target_url)
        .or_else(|| transactions.iter().find(|t| is_html(&t.content_type)))
        .or_else(|| transactions.first())
}

/// `record_<unix secs>_<url digest>_<nonce>.warc.gz`
///
/// The nonce keeps same-second captures of the same URL from colliding.
pub fn archive_file_name(target_url: &str, created_at: DateTime<Utc>, hash_len: usize) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}{}_{}_{}{}",
        FILE_PREFIX,
        created_at.timestamp(),
        url_digest(target_url, hash_len),
        &nonce[..8],
        FILE_SUFFIX
    )
}

/// List archive files in `dir` whose name embeds the digest of `target_url`.
pub async fn archives_for_url(dir: &Path, target_url: &str, hash_len: usize) -> Result<Vec<PathBuf>> {
    let digest = url_digest(target_url, hash_len);
    let mut found = Vec::new();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(stem) = name
            .strip_prefix(FILE_PREFIX)
            .and_then(|n| n.strip_suffix(FILE_SUFFIX))
        else {
            continue;
        };
        // <secs>_<digest>_<nonce>
        let mut parts = stem.split('_');
        let (_, Some(d), _) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        if d == digest {
            found.push(entry.path());
        }
    }

    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::transaction::HeaderList;
    use crate::archive::warc::read_archive;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn tx(url: &str, content_type: &str, body: &str, secs: i64) -> Transaction {
        let headers: HeaderList = [
            ("content-type", content_type),
            ("server", "nginx"),
            ("x-request-id", url),
        ]
        .into_iter()
        .collect();
        Transaction::new(
            url,
            "GET",
            HeaderList::new(),
            headers,
            200,
            Bytes::from(body.to_string()),
            at(secs),
        )
    }

    struct MockResponse {
        url: String,
        content_type: String,
        body: std::result::Result<Bytes, String>,
        body_calls: Arc<AtomicUsize>,
    }

    impl MockResponse {
        fn new(url: &str, content_type: &str, body: std::result::Result<&str, &str>) -> Self {
            Self {
                url: url.to_string(),
                content_type: content_type.to_string(),
                body: body
                    .map(|b| Bytes::from(b.to_string()))
                    .map_err(|e| e.to_string()),
                body_calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl ResponseEvent for MockResponse {
        fn url(&self) -> &str {
            &self.url
        }

        fn method(&self) -> &str {
            "GET"
        }

        fn request_headers(&self) -> HeaderList {
            [("accept", "*/*")].into_iter().collect()
        }

        fn response_headers(&self) -> HeaderList {
            [("Content-Type", self.content_type.as_str())].into_iter().collect()
        }

        fn status(&self) -> u16 {
            200
        }

        async fn body(&self) -> std::result::Result<Bytes, String> {
            self.body_calls.fetch_add(1, Ordering::SeqCst);
            self.body.clone()
        }
    }

    #[test]
    fn test_primary_exact_match_wins() {
        // Captured in order B, C, A; target C
        let txs = vec![
            tx("https://b.example/", "text/html", "B", 0),
            tx("https://c.example/", "text/html", "C", 1),
            tx("https://a.example/", "application/json", "A", 2),
        ];
        let primary = select_primary(&txs, "https://c.example/").unwrap();
        assert_eq!(primary.url, "https://c.example/");
    }

    #[test]
    fn test_primary_falls_back_to_first_html() {
        let txs = vec![
            tx("https://a.example/api", "application/json", "A", 0),
            tx("https://b.example/", "text/html", "B", 1),
            tx("https://c.example/", "text/html", "C", 2),
        ];
        let primary = select_primary(&txs, "https://elsewhere.example/").unwrap();
        assert_eq!(primary.url, "https://b.example/");
    }

    #[test]
    fn test_primary_falls_back_to_earliest() {
        let txs = vec![
            tx("https://a.example/api", "application/json", "A", 0),
            tx("https://b.example/feed", "application/xml", "B", 1),
        ];
        let primary = select_primary(&txs, "https://elsewhere.example/").unwrap();
        assert_eq!(primary.url, "https://a.example/api");
        assert!(select_primary(&[], "x").is_none());
    }

    #[tokio::test]
    async fn test_freeze_empty_fails_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("archive");
        let recorder = ArchiveRecorder::with_storage_dir(&storage);

        let result = recorder.freeze("https://example.com/").await;
        assert!(matches!(result, Err(Error::EmptyArchive)));
        assert!(!storage.exists());
    }

    #[tokio::test]
    async fn test_freeze_writes_sorted_records_and_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ArchiveRecorder::with_storage_dir(dir.path());

        assert!(recorder.record(tx("https://a.example/api", "application/json", "{}", 5)).await);
        assert!(recorder.record(tx("https://c.example/", "text/html", "<p>C</p>", 1)).await);
        assert!(recorder.record(tx("https://b.example/", "text/html", "<p>B</p>", 0)).await);
        assert!(!recorder.record(tx("https://c.example/logo.png", "image/png", "png", 2)).await);
        assert_eq!(recorder.len().await, 3);

        let frozen = recorder.freeze("https://c.example/").await.unwrap();
        assert_eq!(frozen.primary_url, "https://c.example/");
        assert_eq!(frozen.primary_class, ContentClass::Document);
        assert_eq!(frozen.payload_hash, payload_hash(b"<p>C</p>"));
        assert_eq!(frozen.record_count, 3);
        assert!(frozen.path.exists());

        let records = read_archive(&frozen.path).await.unwrap();
        let uris: Vec<&str> = records.iter().map(|r| r.target_uri.as_str()).collect();
        assert_eq!(
            uris,
            vec!["https://b.example/", "https://c.example/", "https://a.example/api"]
        );
        assert_eq!(records[1].body, b"<p>C</p>");
    }

    #[tokio::test]
    async fn test_hashes_reproducible_across_recorders() {
        let dir = tempfile::tempdir().unwrap();
        let first = ArchiveRecorder::with_storage_dir(dir.path());
        let second = ArchiveRecorder::with_storage_dir(dir.path());

        for recorder in [&first, &second] {
            recorder.record(tx("https://c.example/", "text/html", "<p>C</p>", 0)).await;
            recorder.record(tx("https://c.example/data", "application/json", "[1]", 1)).await;
        }

        let a = first.freeze("https://c.example/").await.unwrap();
        let b = second.freeze("https://c.example/").await.unwrap();
        assert_eq!(a.payload_hash, b.payload_hash);
        assert_eq!(a.headers_hash, b.headers_hash);
        assert_ne!(a.path, b.path);
    }

    #[tokio::test]
    async fn test_headers_hash_ignores_request_ids() {
        let dir = tempfile::tempdir().unwrap();
        let first = ArchiveRecorder::with_storage_dir(dir.path());
        let second = ArchiveRecorder::with_storage_dir(dir.path());

        let mut one = tx("https://c.example/", "text/html", "<p>C</p>", 0);
        one.response_headers.push("x-trace", "abc");
        let mut two = tx("https://c.example/", "text/html", "<p>C</p>", 0);
        two.response_headers.push("x-trace", "def");
        first.record(one).await;
        second.record(two).await;

        let a = first.freeze("https://c.example/").await.unwrap();
        let b = second.freeze("https://c.example/").await.unwrap();
        assert_eq!(a.headers_hash, b.headers_hash);
    }

    #[tokio::test]
    async fn test_intercept_filters_before_fetching_body() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ArchiveRecorder::with_storage_dir(dir.path());

        let image = MockResponse::new("https://example.com/a.png", "image/png", Ok("png"));
        assert!(!recorder.intercept(&image).await);
        assert_eq!(image.body_calls.load(Ordering::SeqCst), 0);

        let page = MockResponse::new("https://example.com/", "text/html; charset=utf-8", Ok("<html/>"));
        assert!(recorder.intercept(&page).await);
        assert_eq!(page.body_calls.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.len().await, 1);
    }

    #[tokio::test]
    async fn test_intercept_drops_failed_body() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ArchiveRecorder::with_storage_dir(dir.path());

        let broken = MockResponse::new("https://example.com/", "text/html", Err("stream closed"));
        assert!(!recorder.intercept(&broken).await);
        assert!(recorder.is_empty().await);

        let ok = MockResponse::new("https://example.com/api", "application/json", Ok("{}"));
        assert!(recorder.intercept(&ok).await);

        let frozen = recorder.freeze("https://example.com/").await.unwrap();
        assert_eq!(frozen.primary_url, "https://example.com/api");
    }

    #[tokio::test]
    async fn test_clear_resets_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ArchiveRecorder::with_storage_dir(dir.path());
        recorder.record(tx("https://c.example/", "text/html", "C", 0)).await;
        recorder.freeze("https://c.example/").await.unwrap();

        recorder.clear().await;
        assert!(recorder.is_empty().await);
        assert!(matches!(
            recorder.freeze("https://c.example/").await,
            Err(Error::EmptyArchive)
        ));
    }

    #[tokio::test]
    async fn test_refreeze_without_clear_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ArchiveRecorder::with_storage_dir(dir.path());
        recorder.record(tx("https://c.example/", "text/html", "C", 0)).await;

        let a = recorder.freeze("https://c.example/").await.unwrap();
        let b = recorder.freeze("https://c.example/").await.unwrap();
        assert_eq!(a.payload_hash, b.payload_hash);
        assert_ne!(a.path, b.path);
        assert_eq!(recorder.archives_for("https://c.example/").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_archives_for_url() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ArchiveRecorder::with_storage_dir(dir.path());
        recorder.record(tx("https://c.example/", "text/html", "C", 0)).await;
        let frozen = recorder.freeze("https://c.example/").await.unwrap();

        std::fs::write(dir.path().join("unrelated.txt"), b"x").unwrap();

        let found = recorder.archives_for("https://c.example/").await.unwrap();
        assert_eq!(found, vec![frozen.path]);
        assert!(recorder.archives_for("https://d.example/").await.unwrap().is_empty());

        let missing = archives_for_url(&dir.path().join("none"), "https://c.example/", 16)
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_primary_class_reported_for_data_capture() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ArchiveRecorder::with_storage_dir(dir.path());
        recorder.record(tx("https://api.example/v1", "application/json", "{}", 0)).await;
        recorder.record(tx("https://api.example/notes", "text/plain", "n", 1)).await;

        let frozen = recorder.freeze("https://elsewhere.example/").await.unwrap();
        assert_eq!(frozen.primary_url, "https://api.example/v1");
        assert_eq!(frozen.primary_class, ContentClass::Data);
    }

    #[tokio::test]
    async fn test_failed_write_removes_partial_archive() {
        let dir = tempfile::tempdir().unwrap();
        let name = archive_file_name("https://c.example/", at(0), 16);
        let path = dir.path().join(name);
        std::fs::write(&path, b"\x1f\x8b truncated").unwrap();

        let written = Err(std::io::Error::other("disk full"));
        let err = discard_on_error(&path, written).await.unwrap_err();
        assert!(matches!(err, Error::Archive(ref msg) if msg.contains("disk full")));
        assert!(!path.exists());
        assert!(archives_for_url(dir.path(), "https://c.example/", 16)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_successful_write_keeps_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record_0_abc_def.warc.gz");
        write_archive_file(&path, b"payload").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");

        // create_new refuses to overwrite an existing capture
        let err = write_archive_file(&path, b"other").await.unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }

    #[test]
    fn test_archive_file_name_shape() {
        let name = archive_file_name("https://c.example/", at(0), 16);
        assert!(name.starts_with(&format!("record_{}_", at(0).timestamp())));
        assert!(name.ends_with(".warc.gz"));
        assert!(name.contains(&url_digest("https://c.example/", 16)));
        assert_ne!(name, archive_file_name("https://c.example/", at(0), 16));
    }
}
