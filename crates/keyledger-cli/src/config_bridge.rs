//! Bridge from `keyledger_config::Config` to the types the CLI opens.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use keyledger_config::{Config, StorageBackend};
use keyledger_ledger::{Ledger, LedgerLimits};
use keyledger_storage::{KvStore, MemoryKvStore, SurrealKvStore};
use keyledger_telemetry::{LogConfig, LogTarget};
use tracing::warn;

/// Convert the `[logging]` section to a [`LogConfig`].
///
/// The format was validated at load time, so an unknown one cannot reach
/// here; it would fall back to compact.
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    let target = match &cfg.logging.directory {
        Some(dir) => LogTarget::File(dir.clone()),
        None => LogTarget::Stderr,
    };
    let mut log_config = LogConfig::new(&cfg.logging.level)
        .with_format(cfg.logging.format.parse().unwrap_or_default())
        .with_target(target);
    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }
    log_config
}

/// Directory the persistent backend lives in.
pub(crate) fn data_dir(cfg: &Config, home: &Path) -> PathBuf {
    cfg.storage
        .path
        .clone()
        .unwrap_or_else(|| home.join("data"))
}

/// Open the configured key-value backend.
pub(crate) fn open_store(cfg: &Config, home: &Path) -> anyhow::Result<Arc<dyn KvStore>> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            warn!("Using the memory backend; nothing will persist after this command");
            Ok(Arc::new(MemoryKvStore::new()))
        },
        StorageBackend::Surrealkv => {
            let dir = data_dir(cfg, home);
            std::fs::create_dir_all(&dir)?;
            Ok(Arc::new(SurrealKvStore::open(dir.join("ledger"))?))
        },
    }
}

/// Open the ledger with the configured store and limits.
pub(crate) fn open_ledger(cfg: &Config, home: &Path) -> anyhow::Result<Ledger> {
    let store = open_store(cfg, home)?;
    Ok(Ledger::new(store, LedgerLimits::from(&cfg.ledger)))
}
