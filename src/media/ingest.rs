//! Streaming file ingestion
//!
//! Consumes an inbound byte stream into a file under the storage directory
//! with a running size cap, an idle-read timeout against stalled transfers,
//! and a throttled progress sink. Failure anywhere deletes the partial
//! file; a partial is never left where the registry could adopt it.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default maximum accepted file size: 50 MB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Default idle-read timeout: fail the transfer after 30 seconds without a
/// chunk.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

/// Default minimum gap between progress reports.
pub const DEFAULT_PROGRESS_INTERVAL_SECS: u64 = 2;

/// Ingestion errors
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("file too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("transfer stalled: no data received for {secs}s")]
    Stalled { secs: u64 },

    #[error("transfer stream failed: {0}")]
    Stream(String),

    #[error("storage i/o failed: {0}")]
    Io(#[from] io::Error),
}

/// Configuration for the ingestion pipeline
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Running size cap; exceeding it fails the transfer.
    pub max_file_size: u64,
    /// Per-chunk read deadline.
    pub idle_timeout: Duration,
    /// Minimum wall-clock gap between progress reports.
    pub progress_interval: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            progress_interval: Duration::from_secs(DEFAULT_PROGRESS_INTERVAL_SECS),
        }
    }
}

impl IngestConfig {
    /// Set the maximum accepted file size
    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = max;
        self
    }

    /// Set the idle-read timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the minimum gap between progress reports
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// A successfully ingested file.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Where the bytes were written.
    pub path: PathBuf,
    /// Size measured from disk after the final write.
    pub size_bytes: u64,
}

/// Strip a declared file name down to `[A-Za-z0-9._ ]` and trim whitespace.
///
/// An empty result becomes `file`. Idempotent, and the output can never
/// contain a path separator.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ' '))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// On-disk name for one message's file.
///
/// The message-id prefix keeps identically named uploads from different
/// messages apart.
pub fn storage_file_name(source_id: i64, sanitized_name: &str) -> String {
    format!("{source_id}_{sanitized_name}")
}

/// Stream `stream` into `dest`.
///
/// `declared_size` is the transport's claim, used only for progress totals
/// and an early size check; the returned [`StoredFile`] carries the size
/// measured from disk. `progress` sees at most one call per
/// `progress_interval`, plus exactly one final call where current equals
/// total. Every failure path deletes the partial file before returning.
pub async fn ingest<S, E, P>(
    stream: S,
    dest: &Path,
    declared_size: u64,
    config: &IngestConfig,
    progress: P,
) -> Result<StoredFile, IngestError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
    P: FnMut(u64, u64),
{
    if declared_size > config.max_file_size {
        return Err(IngestError::TooLarge {
            size: declared_size,
            max: config.max_file_size,
        });
    }

    match write_stream(stream, dest, declared_size, config, progress).await {
        Ok(size_bytes) => {
            debug!(path = %dest.display(), size_bytes, "ingested file");
            Ok(StoredFile {
                path: dest.to_path_buf(),
                size_bytes,
            })
        }
        Err(e) => {
            remove_partial(dest).await;
            Err(e)
        }
    }
}

async fn write_stream<S, E, P>(
    mut stream: S,
    dest: &Path,
    declared_size: u64,
    config: &IngestConfig,
    mut progress: P,
) -> Result<u64, IngestError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
    P: FnMut(u64, u64),
{
    let mut file = File::create(dest).await?;
    let mut written: u64 = 0;
    let mut last_report: Option<Instant> = None;

    loop {
        let chunk = match tokio::time::timeout(config.idle_timeout, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => return Err(IngestError::Stream(e.to_string())),
            Ok(None) => break,
            Err(_) => {
                return Err(IngestError::Stalled {
                    secs: config.idle_timeout.as_secs(),
                })
            }
        };

        written = written.saturating_add(chunk.len() as u64);
        if written > config.max_file_size {
            return Err(IngestError::TooLarge {
                size: written,
                max: config.max_file_size,
            });
        }
        file.write_all(&chunk).await?;

        if last_report.map_or(true, |t| t.elapsed() >= config.progress_interval) {
            progress(written, declared_size);
            last_report = Some(Instant::now());
        }
    }

    file.flush().await?;
    drop(file);

    // The declared size is advisory; the bytes on disk are the record of
    // truth.
    let size_bytes = tokio::fs::metadata(dest).await?.len();
    progress(size_bytes, size_bytes);
    Ok(size_bytes)
}

/// Best-effort removal of a partially written file.
async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove partial file");
        }
    }
}
