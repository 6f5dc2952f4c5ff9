//! Raw key-value store trait and implementations.
//!
//! Records are addressed by `(namespace, key)` and stored under
//! `"{namespace}\0{key}"`, so both parts must be non-empty and free of the
//! null byte. Reads go through [`KvStore::get`] and
//! [`KvStore::list_keys`]; every write goes through [`KvStore::commit`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// One addressable record.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    namespace: String,
    key: String,
}

impl Slot {
    fn new(namespace: &str, key: &str) -> Self {
        Self {
            namespace: namespace.to_owned(),
            key: key.to_owned(),
        }
    }

    fn check(&self) -> StorageResult<()> {
        check_part("namespace", &self.namespace)?;
        check_part("key", &self.key)
    }

    fn full_key(&self) -> String {
        full_key(&self.namespace, &self.key)
    }
}

fn check_part(what: &str, part: &str) -> StorageResult<()> {
    if part.is_empty() {
        Err(StorageError::InvalidKey(format!("{what} must not be empty")))
    } else if part.contains('\0') {
        Err(StorageError::InvalidKey(format!("{what} must not contain null bytes")))
    } else {
        Ok(())
    }
}

fn full_key(namespace: &str, key: &str) -> String {
    format!("{namespace}\0{key}")
}

fn namespace_prefix(namespace: &str) -> StorageResult<String> {
    check_part("namespace", namespace)?;
    Ok(format!("{namespace}\0"))
}

/// Guards and writes applied as one atomic unit.
///
/// A guard names the exact value a record must hold at commit time, or
/// `None` for "absent". A write stores a value, or `None` to delete.
///
/// ```
/// use keyledger_storage::WriteBatch;
///
/// let mut batch = WriteBatch::new();
/// batch
///     .require_absent("ledger:heads", "alice")
///     .put("ledger:heads", "alice", b"head".to_vec())
///     .put("ledger:links", "alice/00000000", b"link".to_vec());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    guards: Vec<(Slot, Option<Vec<u8>>)>,
    writes: Vec<(Slot, Option<Vec<u8>>)>,
}

impl WriteBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to hold `value`, or to be absent when `value` is `None`.
    pub fn require(&mut self, namespace: &str, key: &str, value: Option<Vec<u8>>) -> &mut Self {
        self.guards.push((Slot::new(namespace, key), value));
        self
    }

    /// Require `key` to be absent at commit time.
    pub fn require_absent(&mut self, namespace: &str, key: &str) -> &mut Self {
        self.require(namespace, key, None)
    }

    /// Require `key` to hold exactly `value` at commit time.
    pub fn require_equals(&mut self, namespace: &str, key: &str, value: Vec<u8>) -> &mut Self {
        self.require(namespace, key, Some(value))
    }

    /// Queue a put. Later writes to the same key win.
    pub fn put(&mut self, namespace: &str, key: &str, value: Vec<u8>) -> &mut Self {
        self.writes.push((Slot::new(namespace, key), Some(value)));
        self
    }

    /// Queue a delete.
    pub fn delete(&mut self, namespace: &str, key: &str) -> &mut Self {
        self.writes.push((Slot::new(namespace, key), None));
        self
    }

    fn check(&self) -> StorageResult<()> {
        self.guards
            .iter()
            .chain(&self.writes)
            .try_for_each(|(slot, _)| slot.check())
    }

    /// Run every guard against `current`, stopping at the first that fails.
    fn check_guards<F>(&self, mut current: F) -> StorageResult<()>
    where
        F: FnMut(&str) -> StorageResult<Option<Vec<u8>>>,
    {
        for (slot, expected) in &self.guards {
            if current(&slot.full_key())? != *expected {
                debug!(namespace = %slot.namespace, key = %slot.key, "batch guard failed");
                return Err(StorageError::Conflict(format!(
                    "guard failed on {}/{}",
                    slot.namespace, slot.key
                )));
            }
        }
        Ok(())
    }
}

/// Namespaced byte-level storage with guarded atomic batches.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value. Returns `None` if the key does not exist.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// List all keys in a namespace in ascending byte order.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;

    /// Apply `batch` atomically.
    ///
    /// Every guard is evaluated against the state at commit time. If any
    /// guard fails, nothing is written and [`StorageError::Conflict`] is
    /// returned. Concurrent commits are serialized, so two batches guarded
    /// on the same key can never both succeed.
    async fn commit(&self, batch: WriteBatch) -> StorageResult<()>;
}

/// In-memory key-value store for tests and ephemeral servers.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: std::sync::RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Internal(e.to_string())
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let slot = Slot::new(namespace, key);
        slot.check()?;
        let data = self.data.read().map_err(poisoned)?;
        Ok(data.get(&slot.full_key()).cloned())
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        let prefix = namespace_prefix(namespace)?;
        let data = self.data.read().map_err(poisoned)?;
        Ok(data
            .range(prefix.clone()..)
            .map_while(|(k, _)| k.strip_prefix(&prefix).map(String::from))
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> StorageResult<()> {
        batch.check()?;
        let mut data = self.data.write().map_err(poisoned)?;
        batch.check_guards(|k| Ok(data.get(k).cloned()))?;
        for (slot, value) in batch.writes {
            match value {
                Some(value) => data.insert(slot.full_key(), value),
                None => data.remove(&slot.full_key()),
            };
        }
        Ok(())
    }
}

/// Persistent key-value store backed by `SurrealKV`.
///
/// Commits are serialized through a process-local lock so guard checks and
/// the writes that depend on them see a consistent tree.
#[cfg(feature = "kv")]
pub struct SurrealKvStore {
    tree: surrealkv::Tree,
    write_lock: tokio::sync::Mutex<()>,
}

#[cfg(feature = "kv")]
impl std::fmt::Debug for SurrealKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealKvStore").finish_non_exhaustive()
    }
}

#[cfg(feature = "kv")]
impl SurrealKvStore {
    /// Open a persistent store at the given directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the store cannot be opened.
    pub fn open(path: impl AsRef<std::path::Path>) -> StorageResult<Self> {
        let tree = surrealkv::TreeBuilder::new()
            .with_path(path.as_ref().to_path_buf())
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self {
            tree,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }
}

#[cfg(feature = "kv")]
#[allow(clippy::needless_pass_by_value)]
fn kv_err(e: surrealkv::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

#[cfg(feature = "kv")]
#[async_trait]
impl KvStore for SurrealKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let slot = Slot::new(namespace, key);
        slot.check()?;
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(kv_err)?;
        tx.get(slot.full_key().as_bytes()).map_err(kv_err)
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        let prefix = namespace_prefix(namespace)?;
        // The namespace ends at the first key that no longer starts with "{ns}\0".
        let mut end = namespace.as_bytes().to_vec();
        end.push(1);

        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(kv_err)?;
        let start = prefix.as_bytes().to_vec();
        let mut iter = tx.range(&start, &end).map_err(kv_err)?;
        iter.seek_first().map_err(kv_err)?;

        let mut keys = Vec::new();
        while iter.valid() {
            let raw = iter.key();
            if let Some(key) = std::str::from_utf8(&raw)
                .ok()
                .and_then(|k| k.strip_prefix(prefix.as_str()))
                .filter(|k| !k.is_empty())
            {
                keys.push(key.to_owned());
            }
            iter.next().map_err(kv_err)?;
        }
        Ok(keys)
    }

    async fn commit(&self, batch: WriteBatch) -> StorageResult<()> {
        batch.check()?;
        let _serial = self.write_lock.lock().await;
        let mut tx = self.tree.begin().map_err(kv_err)?;
        batch.check_guards(|k| tx.get(k.as_bytes()).map_err(kv_err))?;
        for (slot, value) in &batch.writes {
            let key = slot.full_key();
            match value {
                Some(value) => tx.set(key.as_bytes(), value),
                None => tx.delete(key.as_bytes()),
            }
            .map_err(kv_err)?;
        }
        tx.commit().await.map_err(kv_err)
    }
}
