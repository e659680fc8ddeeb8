//! Token-to-file registry with TTL expiry
//!
//! Every stored file is reachable through exactly one token. Records live
//! in memory only: a restart invalidates all links, so files left in the
//! storage directory from a previous run are purged during construction.
//! The registry never touches backing files on the hot path; file deletion
//! belongs to [`LinkRegistry::sweep`] and to callers repairing a record
//! whose file has gone missing.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default link time-to-live: 24 hours.
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Default interval between sweeper ticks: 5 minutes.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Token length in bytes (before base64url encoding).
pub const TOKEN_BYTES: usize = 16;

/// Registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to create storage directory {path}: {message}")]
    StorageDir { path: String, message: String },

    #[error("failed to generate random token bytes")]
    TokenGeneration,
}

/// A registered download link and the file it serves.
///
/// Immutable after registration; the only state transition is removal.
#[derive(Debug, Clone)]
pub struct LinkRecord {
    /// Opaque URL-safe token identifying this record.
    pub token: String,
    /// Identifier of the originating chat message.
    pub source_id: i64,
    /// Sanitized name offered to downloaders.
    pub display_name: String,
    /// Backing file path; owned by the registry until the record is removed.
    pub storage_path: PathBuf,
    /// Size measured from disk when the file was stored.
    pub size_bytes: u64,
    /// Registration time; expiry is computed from this.
    pub created_at: DateTime<Utc>,
}

impl LinkRecord {
    /// Whether this record has outlived `ttl` as of `now`.
    pub fn is_expired_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at).num_milliseconds() >= ttl.as_millis() as i64
    }
}

/// Configuration for the link registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Directory where backing files live.
    pub storage_dir: PathBuf,
    /// How long a link stays resolvable after registration.
    pub ttl: Duration,
    /// Interval between sweeper ticks.
    pub sweep_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("downloads"),
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl RegistryConfig {
    /// Set the storage directory
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Set the link time-to-live
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the sweeper tick interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Concurrent token-to-record table with TTL expiry.
///
/// All operations take `&self` and are safe to call from any task. Lock
/// guards are never held across await points.
pub struct LinkRegistry {
    config: RegistryConfig,
    records: RwLock<HashMap<String, LinkRecord>>,
}

impl LinkRegistry {
    /// Create a registry, ensuring the storage directory exists.
    ///
    /// Files already present in the storage directory are deleted: their
    /// tokens did not survive the restart, so they can never be served
    /// again. Deletion failures are logged and skipped.
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        fs::create_dir_all(&config.storage_dir).map_err(|e| RegistryError::StorageDir {
            path: config.storage_dir.display().to_string(),
            message: e.to_string(),
        })?;

        let registry = Self {
            config,
            records: RwLock::new(HashMap::new()),
        };
        registry.purge_storage_dir();
        Ok(registry)
    }

    /// Delete leftover files from a previous run.
    fn purge_storage_dir(&self) {
        let entries = match fs::read_dir(&self.config.storage_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    path = %self.config.storage_dir.display(),
                    error = %e,
                    "failed to scan storage directory"
                );
                return;
            }
        };

        let mut purged = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => purged += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to delete orphaned file");
                }
            }
        }

        if purged > 0 {
            info!(count = purged, "purged orphaned files from storage directory");
        }
    }

    /// Register a stored file and return its download token.
    ///
    /// On a token collision a fresh token is drawn; existing records are
    /// never overwritten.
    pub fn register(
        &self,
        source_id: i64,
        display_name: &str,
        storage_path: PathBuf,
        size_bytes: u64,
    ) -> Result<String, RegistryError> {
        let mut records = self.records.write();

        let token = loop {
            let candidate = generate_token()?;
            if !records.contains_key(&candidate) {
                break candidate;
            }
        };

        let record = LinkRecord {
            token: token.clone(),
            source_id,
            display_name: display_name.to_string(),
            storage_path,
            size_bytes,
            created_at: Utc::now(),
        };
        records.insert(token.clone(), record);

        debug!(token = %token, source_id, size_bytes, "registered link");
        Ok(token)
    }

    /// Look up a token.
    ///
    /// Returns `None` for unknown, removed, and expired tokens alike;
    /// callers cannot distinguish the three. An expired record stays in the
    /// table until the sweeper evicts it, but is already unresolvable here.
    pub fn resolve(&self, token: &str) -> Option<LinkRecord> {
        let records = self.records.read();
        let record = records.get(token)?;
        if record.is_expired_at(self.config.ttl, Utc::now()) {
            return None;
        }
        Some(record.clone())
    }

    /// Remove a record, returning it if it was present.
    pub fn remove(&self, token: &str) -> Option<LinkRecord> {
        self.records.write().remove(token)
    }

    /// Remove and return every record expired as of `now`.
    ///
    /// Backing files are untouched; the caller owns their deletion.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> Vec<LinkRecord> {
        // Collect candidates under the read lock, remove under the write
        // lock. A token removed in between is simply skipped.
        let expired: Vec<String> = {
            let records = self.records.read();
            records
                .values()
                .filter(|r| r.is_expired_at(self.config.ttl, now))
                .map(|r| r.token.clone())
                .collect()
        };

        if expired.is_empty() {
            return Vec::new();
        }

        let mut records = self.records.write();
        expired
            .iter()
            .filter_map(|token| records.remove(token))
            .collect()
    }

    /// Number of records in the table, expired-but-unswept ones included.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Directory where backing files live.
    pub fn storage_dir(&self) -> &Path {
        &self.config.storage_dir
    }

    /// Configured link time-to-live.
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// One sweep: evict expired records and delete their backing files.
    ///
    /// Returns the number of evicted records. Deletion failures are logged
    /// per file and never abort the sweep; a file that is already gone is
    /// fine (retrieval may have repaired the record's file earlier).
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let evicted = self.evict_expired(now);
        let count = evicted.len();

        for record in evicted {
            match fs::remove_file(&record.storage_path) {
                Ok(()) => {
                    debug!(
                        token = %record.token,
                        path = %record.storage_path.display(),
                        "deleted expired file"
                    );
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(
                        token = %record.token,
                        path = %record.storage_path.display(),
                        "expired file already gone"
                    );
                }
                Err(e) => {
                    warn!(
                        token = %record.token,
                        path = %record.storage_path.display(),
                        error = %e,
                        "failed to delete expired file"
                    );
                }
            }
        }

        if count > 0 {
            info!(count, "evicted expired links");
        }
        count
    }

    /// Spawn the background expiry sweeper.
    ///
    /// Sweeps every `sweep_interval` until `shutdown` flips to true. Ticks
    /// run on one task, so sweeps never overlap; a tick missed while a slow
    /// sweep runs is skipped rather than bursted.
    pub fn start_sweeper_task(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.sweep_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // An interval's first tick fires immediately; consume it so the
            // first sweep lands one full interval after startup.
            interval.tick().await;

            info!(
                interval_secs = self.config.sweep_interval.as_secs(),
                "expiry sweeper started"
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.sweep(Utc::now());
                    }
                    result = shutdown.changed() => {
                        if result.is_err() || *shutdown.borrow() {
                            debug!("expiry sweeper stopping");
                            break;
                        }
                    }
                }
            }
        })
    }
}

/// Generate a fresh token: CSPRNG bytes, base64url without padding.
fn generate_token() -> Result<String, RegistryError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    getrandom::fill(&mut bytes).map_err(|_| RegistryError::TokenGeneration)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
