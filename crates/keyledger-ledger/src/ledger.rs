//! The identity ledger service.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use keyledger_config::LedgerSection;
use keyledger_core::{CodecResult, KeyLink, Merged, UpdateKind, merge, validate_username};
use keyledger_crypto::PublicKey;
use keyledger_storage::{KvStore, StorageError, WriteBatch};
use tracing::{debug, error, info};

use crate::cache::{TtlCache, UsernameCache};
use crate::error::{LedgerError, LedgerResult};
use crate::listing::encode_username_set;
use crate::schema::{ChainHead, NS_HEADS, NS_KEYS, NS_LINKS, NS_OWNERS, key_id, link_key};

/// Attempts at a consistent chain read, or at a retried mailbox write,
/// before reporting contention.
pub(crate) const MAX_ATTEMPTS: usize = 8;

/// Limits the ledger enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLimits {
    /// Longest tail one update may carry.
    pub max_tail_len: usize,
    /// Longest username in bytes.
    pub max_username_len: usize,
    /// Follow requests queued per recipient.
    pub max_pending_followers: usize,
    /// Longest pointer hash accepted.
    pub max_hash_len: usize,
    /// Largest follow-request blob accepted.
    pub max_follow_request_len: usize,
    /// Freshness window of the username listing.
    pub username_cache_ttl: Duration,
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self::from(&LedgerSection::default())
    }
}

impl From<&LedgerSection> for LedgerLimits {
    fn from(section: &LedgerSection) -> Self {
        Self {
            max_tail_len: section.max_tail_len,
            max_username_len: section.max_username_len,
            max_pending_followers: section.max_pending_followers,
            max_hash_len: section.max_hash_len,
            max_follow_request_len: section.max_follow_request_len,
            username_cache_ttl: section.username_cache_ttl(),
        }
    }
}

/// A chain as read from storage, with the head it was read under.
pub(crate) struct Snapshot {
    pub(crate) chain: Vec<KeyLink>,
    /// Raw head bytes, `None` when the username is unregistered.
    pub(crate) head: Option<Vec<u8>>,
}

/// Links written by `merged` keyed by index, plus the new head record.
fn encode_update(merged: &Merged, existing_len: usize) -> CodecResult<(Vec<(u32, Vec<u8>)>, Vec<u8>)> {
    let links = merged
        .written(existing_len)
        .iter()
        .map(|link| link.encode().map(|bytes| (link.index(), bytes)))
        .collect::<CodecResult<Vec<_>>>()?;
    Ok((links, ChainHead::of(&merged.chain)?.encode()?))
}

/// Authoritative store of username chains, follow requests and pointers.
///
/// Every mutation is a single guarded [`WriteBatch`]: chain updates are
/// guarded on the chain head they were decided against, so two concurrent
/// updates to one username can never both commit.
pub struct Ledger {
    pub(crate) store: Arc<dyn KvStore>,
    pub(crate) limits: LedgerLimits,
    usernames: Arc<dyn UsernameCache>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Ledger over `store` with its own listing cache.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, limits: LedgerLimits) -> Self {
        Self::with_cache(store, limits, Arc::new(TtlCache::new()))
    }

    /// Ledger over `store` sharing an externally owned listing cache.
    #[must_use]
    pub fn with_cache(
        store: Arc<dyn KvStore>,
        limits: LedgerLimits,
        usernames: Arc<dyn UsernameCache>,
    ) -> Self {
        Self {
            store,
            limits,
            usernames,
        }
    }

    /// Limits in force.
    #[must_use]
    pub fn limits(&self) -> &LedgerLimits {
        &self.limits
    }

    /// Username whose current key is `key`.
    ///
    /// # Errors
    ///
    /// Storage failures or an undecodable owner record.
    pub async fn username_for(&self, key: &PublicKey) -> LedgerResult<Option<String>> {
        let id = key_id(key);
        let Some(raw) = self.store.get(NS_OWNERS, &id).await? else {
            return Ok(None);
        };
        String::from_utf8(raw)
            .map(Some)
            .map_err(|e| LedgerError::corrupt_record(NS_OWNERS, id, e))
    }

    /// Full chain for `username`, empty when unregistered.
    ///
    /// # Errors
    ///
    /// [`LedgerError::CorruptChain`] if the stored links do not add up to
    /// the stored head.
    pub async fn chain(&self, username: &str) -> LedgerResult<Vec<KeyLink>> {
        Ok(self.snapshot(username).await?.chain)
    }

    /// Read a chain together with the head it belongs to.
    ///
    /// Links and head are separate records, so a read can straddle a
    /// concurrent commit. The digest in the head detects that; the read is
    /// retried while the head keeps moving.
    pub(crate) async fn snapshot(&self, username: &str) -> LedgerResult<Snapshot> {
        let corrupt = |reason: String| {
            error!(username, %reason, "Stored chain is corrupt");
            LedgerError::CorruptChain {
                username: username.to_owned(),
                reason,
            }
        };

        let mut head_raw = self.store.get(NS_HEADS, username).await?;
        for _ in 0..MAX_ATTEMPTS {
            let Some(raw) = head_raw else {
                return Ok(Snapshot {
                    chain: Vec::new(),
                    head: None,
                });
            };
            let head = ChainHead::decode(&raw).map_err(|e| corrupt(e.to_string()))?;

            let mut chain = Vec::new();
            for index in 0..head.len {
                let bytes = self
                    .store
                    .get(NS_LINKS, &link_key(username, index))
                    .await?
                    .ok_or_else(|| corrupt(format!("link {index} is missing")))?;
                let link = KeyLink::decode(&bytes).map_err(|e| corrupt(e.to_string()))?;
                if link.index() != index {
                    return Err(corrupt(format!(
                        "slot {index} holds link {}",
                        link.index()
                    )));
                }
                chain.push(link);
            }

            if ChainHead::of(&chain).map_err(|e| corrupt(e.to_string()))? == head {
                return Ok(Snapshot {
                    chain,
                    head: Some(raw),
                });
            }

            let reread = self.store.get(NS_HEADS, username).await?;
            if reread.as_ref() == Some(&raw) {
                return Err(corrupt("links do not match the chain head".into()));
            }
            debug!(username, "Chain moved during read, retrying");
            head_raw = reread;
        }
        Err(LedgerError::Contention(format!("chain {username}")))
    }

    /// Apply a register, rotate or refresh tail.
    ///
    /// Returns `Ok(false)` when the update is rejected, including when a
    /// concurrent update to the same username won the race.
    ///
    /// # Errors
    ///
    /// Storage failures and corrupt stored chains.
    pub async fn update(&self, username: &str, tail: &[KeyLink]) -> LedgerResult<bool> {
        if let Err(e) = validate_username(username, self.limits.max_username_len) {
            debug!(username, error = %e, "Rejected username");
            return Ok(false);
        }

        let Snapshot {
            chain: existing,
            head,
        } = self.snapshot(username).await?;

        let merged = match merge(&existing, tail, username, self.limits.max_tail_len) {
            Ok(merged) => merged,
            Err(e) => {
                debug!(username, error = %e, "Rejected chain update");
                return Ok(false);
            },
        };

        let (links, new_head) = match encode_update(&merged, existing.len()) {
            Ok(encoded) => encoded,
            Err(e) => {
                debug!(username, error = %e, "Rejected chain update that does not encode");
                return Ok(false);
            },
        };
        let mut batch = WriteBatch::new();
        batch.require(NS_HEADS, username, head);
        for (index, bytes) in links {
            batch.put(NS_LINKS, &link_key(username, index), bytes);
        }
        batch.put(NS_HEADS, username, new_head);

        if merged.kind.binds_new_key() {
            let Some(incoming) = merged.current_key() else {
                return Ok(false);
            };
            let incoming_id = key_id(incoming);
            if self.store.get(NS_KEYS, &incoming_id).await?.is_some() {
                debug!(username, key = %incoming.short_hex(), "Key already bound, rejecting reuse");
                return Ok(false);
            }
            batch
                .require_absent(NS_KEYS, &incoming_id)
                .put(NS_KEYS, &incoming_id, username.as_bytes().to_vec())
                .put(NS_OWNERS, &incoming_id, username.as_bytes().to_vec());
            if merged.kind == UpdateKind::Rotate {
                if let Some(outgoing) = existing.last() {
                    batch.delete(NS_OWNERS, &key_id(outgoing.owner()));
                }
            }
        }

        match self.store.commit(batch).await {
            Ok(()) => {
                info!(
                    username,
                    kind = %merged.kind,
                    links = merged.chain.len(),
                    "Chain updated"
                );
                Ok(true)
            },
            Err(StorageError::Conflict(reason)) => {
                debug!(username, %reason, "Lost chain update race");
                Ok(false)
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Gzipped list of every registered username, cached for
    /// [`LedgerLimits::username_cache_ttl`].
    ///
    /// # Errors
    ///
    /// Storage failures on a cache miss.
    pub async fn usernames_gzip(&self) -> LedgerResult<Vec<u8>> {
        if let Some(cached) = self.usernames.get() {
            return Ok(cached);
        }
        let names = self.store.list_keys(NS_HEADS).await?;
        let gz = encode_username_set(&names)?;
        debug!(count = names.len(), "Rebuilt username listing");
        self.usernames
            .set(gz.clone(), self.limits.username_cache_ttl);
        Ok(gz)
    }
}

#[cfg(test)]
mod tests {
    use keyledger_core::Claim;
    use keyledger_crypto::KeyPair;
    use keyledger_storage::MemoryKvStore;

    use super::*;

    fn ledger() -> Ledger {
        Ledger::new(Arc::new(MemoryKvStore::new()), LedgerLimits::default())
    }

    fn genesis(name: &str, kp: &KeyPair) -> KeyLink {
        KeyLink::sign(
            kp,
            &Claim {
                username: name.into(),
                index: 0,
                expiry: keyledger_test::expiry(1),
                predecessor: None,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_and_read_back() {
        let ledger = ledger();
        let k0 = KeyPair::generate();
        let link = genesis("alice", &k0);

        assert!(ledger.update("alice", &[link.clone()]).await.unwrap());
        assert_eq!(ledger.chain("alice").await.unwrap(), vec![link]);
        assert_eq!(
            ledger.username_for(&k0.export_public_key()).await.unwrap().as_deref(),
            Some("alice")
        );
        assert!(ledger.chain("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_username_rejected() {
        let ledger = ledger();
        let k0 = KeyPair::generate();
        assert!(!ledger.update("a/b", &[genesis("a/b", &k0)]).await.unwrap());
        assert!(!ledger.update("", &[genesis("", &k0)]).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_link_is_corruption() {
        let store = Arc::new(MemoryKvStore::new());
        let ledger = Ledger::new(store.clone(), LedgerLimits::default());
        let k0 = KeyPair::generate();
        assert!(ledger.update("alice", &[genesis("alice", &k0)]).await.unwrap());

        let mut batch = WriteBatch::new();
        batch.delete(NS_LINKS, &link_key("alice", 0));
        store.commit(batch).await.unwrap();
        assert!(matches!(
            ledger.chain("alice").await,
            Err(LedgerError::CorruptChain { .. })
        ));
    }

    #[tokio::test]
    async fn test_tampered_link_is_corruption() {
        let store = Arc::new(MemoryKvStore::new());
        let ledger = Ledger::new(store.clone(), LedgerLimits::default());
        let k0 = KeyPair::generate();
        assert!(ledger.update("alice", &[genesis("alice", &k0)]).await.unwrap());

        let other = genesis("alice", &KeyPair::generate());
        let mut batch = WriteBatch::new();
        batch.put(NS_LINKS, &link_key("alice", 0), other.encode().unwrap());
        store.commit(batch).await.unwrap();
        assert!(matches!(
            ledger.chain("alice").await,
            Err(LedgerError::CorruptChain { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_is_cached() {
        let ledger = ledger();
        assert!(ledger.update("alice", &[genesis("alice", &KeyPair::generate())]).await.unwrap());
        let first = ledger.usernames_gzip().await.unwrap();

        assert!(ledger.update("bob", &[genesis("bob", &KeyPair::generate())]).await.unwrap());
        assert_eq!(ledger.usernames_gzip().await.unwrap(), first);

        tokio::time::advance(ledger.limits().username_cache_ttl).await;
        let fresh = ledger.usernames_gzip().await.unwrap();
        assert_eq!(
            crate::decode_username_set(&fresh).unwrap(),
            ["alice", "bob"]
        );
    }
}
