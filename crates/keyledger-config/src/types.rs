//! Configuration sections.
//!
//! `Default` for every section agrees with the embedded `defaults.toml`,
//! so a file may name only the keys it changes.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The whole configuration: `[ledger]`, `[storage]` and `[logging]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ledger limits and cache timing.
    pub ledger: LedgerSection,
    /// Backing store selection.
    pub storage: StorageSection,
    /// Level, format, directives and optional log directory.
    pub logging: LoggingSection,
}

/// Limits enforced by the identity ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// Seconds the gzipped username listing is served before a rebuild.
    pub username_cache_ttl_secs: u64,
    /// Follow requests queued per recipient.
    pub max_pending_followers: usize,
    /// Username length in bytes.
    pub max_username_len: usize,
    /// Links accepted in one chain update.
    pub max_tail_len: usize,
    /// Length of a metadata pointer hash.
    pub max_hash_len: usize,
    /// Size in bytes of one follow-request blob.
    pub max_follow_request_len: usize,
}

impl LedgerSection {
    /// [`Self::username_cache_ttl_secs`] as a [`Duration`].
    #[must_use]
    pub fn username_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.username_cache_ttl_secs)
    }
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            username_cache_ttl_secs: 60,
            max_pending_followers: 10,
            max_username_len: 64,
            max_tail_len: 2,
            max_hash_len: 4096,
            max_follow_request_len: 16384,
        }
    }
}

/// Key-value backend behind the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local, lost on exit.
    #[default]
    Memory,
    /// Embedded persistent `SurrealKV` tree.
    Surrealkv,
}

/// `[storage]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Backend to open.
    pub backend: StorageBackend,
    /// Data directory for `surrealkv`, `<home>/data` when unset.
    pub path: Option<PathBuf>,
}

/// `[logging]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
    /// Extra `tracing` directives, e.g. `keyledger_ledger=debug`.
    pub directives: Vec<String>,
    /// Write daily-rotated log files here instead of to stderr.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            directory: None,
        }
    }
}
