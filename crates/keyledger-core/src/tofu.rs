//! Trust-on-first-use pinning of remote chains.
//!
//! The first chain a client sees for a username becomes its baseline. Every
//! later chain must be reachable from that baseline through merges the
//! client runs itself, so a ledger that swaps in a different key after the
//! fact is caught locally.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use keyledger_crypto::PublicKey;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{NodeError, NodeResult, TofuError, TofuResult};
use crate::link::{KeyLink, decode_chain, encode_chain};
use crate::merge::{DEFAULT_MAX_TAIL_LEN, Merged, catch_up, extends, merge};
use crate::node::CoreNode;
use crate::validate::validate;

const STORE_VERSION: u32 = 1;

/// On-disk form: chains as hex of their canonical encoding.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    chains: BTreeMap<String, String>,
}

/// Locally pinned chains plus a reverse index of current keys.
#[derive(Debug, Clone)]
pub struct TofuKeyStore {
    chains: BTreeMap<String, Vec<KeyLink>>,
    reverse: HashMap<PublicKey, String>,
    max_tail: usize,
}

impl Default for TofuKeyStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TAIL_LEN)
    }
}

impl TofuKeyStore {
    /// Empty store accepting tails of at most `max_tail` links.
    #[must_use]
    pub fn new(max_tail: usize) -> Self {
        Self {
            chains: BTreeMap::new(),
            reverse: HashMap::new(),
            max_tail,
        }
    }

    /// Current pinned key for `username`.
    #[must_use]
    pub fn get_public_key(&self, username: &str) -> Option<PublicKey> {
        self.chains
            .get(username)
            .and_then(|c| c.last())
            .map(|l| *l.owner())
    }

    /// Username whose pinned chain currently ends in `key`.
    #[must_use]
    pub fn get_username(&self, key: &PublicKey) -> Option<&str> {
        self.reverse.get(key).map(String::as_str)
    }

    /// Pinned chain for `username`.
    #[must_use]
    pub fn get_chain(&self, username: &str) -> Option<&[KeyLink]> {
        self.chains.get(username).map(Vec::as_slice)
    }

    /// Usernames with a pinned chain, sorted.
    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    /// Number of pinned usernames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether nothing is pinned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Run the merge `tail` would cause without pinning anything.
    ///
    /// # Errors
    ///
    /// [`TofuError::Rejected`] if the merge fails, [`TofuError::KeyConflict`]
    /// if the resulting key is pinned to someone else.
    pub fn check_update(&self, username: &str, tail: &[KeyLink]) -> TofuResult<Merged> {
        let existing = self.get_chain(username).unwrap_or_default();
        let merged =
            merge(existing, tail, username, self.max_tail).map_err(|source| {
                TofuError::Rejected {
                    username: username.to_owned(),
                    source,
                }
            })?;
        self.check_key_free(username, &merged.chain)?;
        Ok(merged)
    }

    /// Apply `tail` to the locally pinned chain for `username`.
    ///
    /// With nothing pinned yet, `tail` must be a genesis link.
    ///
    /// # Errors
    ///
    /// See [`TofuKeyStore::check_update`].
    pub fn update_chain(&mut self, username: &str, tail: &[KeyLink]) -> TofuResult<Merged> {
        let merged = self.check_update(username, tail)?;
        debug!(username, kind = %merged.kind, "TOFU store accepted update");
        self.pin(username, merged.chain.clone());
        Ok(merged)
    }

    /// Reconcile a full chain received from a ledger.
    ///
    /// An unseen username is pinned once the chain validates. A pinned one
    /// only moves forward if the remote chain keeps the pinned history and
    /// every later link is a proven rotation, however many happened since.
    ///
    /// # Errors
    ///
    /// - [`TofuError::InvalidChain`] for an unseen chain that fails validation
    /// - [`TofuError::Shortened`] if the remote chain lost links
    /// - [`TofuError::Diverged`] if the remote history differs from the pin
    /// - [`TofuError::Rejected`] if the new links are not acceptable
    /// - [`TofuError::KeyConflict`] if the current key is pinned elsewhere
    pub fn observe_chain(&mut self, username: &str, remote: &[KeyLink]) -> TofuResult<()> {
        let Some(pinned) = self.chains.get(username) else {
            validate(remote, username).map_err(|source| TofuError::InvalidChain {
                username: username.to_owned(),
                source,
            })?;
            self.check_key_free(username, remote)?;
            info!(username, links = remote.len(), "Pinned first observed chain");
            self.pin(username, remote.to_vec());
            return Ok(());
        };

        if pinned.as_slice() == remote {
            return Ok(());
        }
        if remote.len() < pinned.len() {
            warn!(username, "Remote chain is shorter than the pinned chain");
            return Err(TofuError::Shortened {
                username: username.to_owned(),
                pinned: pinned.len(),
                observed: remote.len(),
            });
        }
        if !extends(pinned, remote) {
            warn!(username, "Remote chain diverges from pinned history");
            return Err(TofuError::Diverged {
                username: username.to_owned(),
            });
        }

        let merged = catch_up(pinned, remote, username).map_err(|source| TofuError::Rejected {
            username: username.to_owned(),
            source,
        })?;
        self.check_key_free(username, &merged.chain)?;
        info!(username, kind = %merged.kind, links = merged.chain.len(), "Advanced pinned chain");
        self.pin(username, merged.chain);
        Ok(())
    }

    fn check_key_free(&self, username: &str, chain: &[KeyLink]) -> TofuResult<()> {
        let Some(key) = chain.last().map(KeyLink::owner) else {
            return Ok(());
        };
        match self.reverse.get(key) {
            Some(owner) if owner != username => Err(TofuError::KeyConflict {
                key: key.to_hex(),
                pinned_to: owner.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn pin(&mut self, username: &str, chain: Vec<KeyLink>) {
        self.chains.insert(username.to_owned(), chain);
        self.rebuild_reverse();
    }

    /// Rebuild the reverse index from scratch.
    fn rebuild_reverse(&mut self) {
        self.reverse = self
            .chains
            .iter()
            .filter_map(|(name, chain)| chain.last().map(|l| (*l.owner(), name.clone())))
            .collect();
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TofuError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> TofuResult<String> {
        let chains = self
            .chains
            .iter()
            .map(|(name, chain)| {
                encode_chain(chain)
                    .map(|bytes| (name.clone(), hex::encode(bytes)))
                    .map_err(|e| TofuError::Serialization(format!("{name}: {e}")))
            })
            .collect::<TofuResult<_>>()?;
        let file = StoreFile {
            version: STORE_VERSION,
            chains,
        };
        serde_json::to_string_pretty(&file).map_err(|e| TofuError::Serialization(e.to_string()))
    }

    /// Parse JSON written by [`TofuKeyStore::to_json`], re-validating every
    /// chain.
    ///
    /// # Errors
    ///
    /// [`TofuError::Serialization`] for unreadable input,
    /// [`TofuError::InvalidChain`] for a chain that no longer validates and
    /// [`TofuError::KeyConflict`] if two chains end in the same key.
    pub fn from_json(json: &str, max_tail: usize) -> TofuResult<Self> {
        let file: StoreFile =
            serde_json::from_str(json).map_err(|e| TofuError::Serialization(e.to_string()))?;
        if file.version != STORE_VERSION {
            return Err(TofuError::Serialization(format!(
                "unsupported trust store version {}",
                file.version
            )));
        }

        let mut store = Self::new(max_tail);
        for (name, encoded) in file.chains {
            let bytes = hex::decode(&encoded)
                .map_err(|e| TofuError::Serialization(format!("{name}: {e}")))?;
            let chain = decode_chain(&bytes)
                .map_err(|e| TofuError::Serialization(format!("{name}: {e}")))?;
            validate(&chain, &name).map_err(|source| TofuError::InvalidChain {
                username: name.clone(),
                source,
            })?;
            store.check_key_free(&name, &chain)?;
            store.pin(&name, chain);
        }
        Ok(store)
    }

    /// Write the store to `path`.
    ///
    /// # Errors
    ///
    /// [`TofuError::Io`] or [`TofuError::Serialization`].
    pub fn save(&self, path: &Path) -> TofuResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TofuError::Io(e.to_string()))?;
        }
        std::fs::write(path, self.to_json()?).map_err(|e| TofuError::Io(e.to_string()))
    }

    /// Load a store from `path`; a missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// See [`TofuKeyStore::from_json`].
    pub fn load(path: &Path, max_tail: usize) -> TofuResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json, max_tail),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new(max_tail)),
            Err(e) => Err(TofuError::Io(e.to_string())),
        }
    }
}

/// A [`CoreNode`] whose chains have all passed local TOFU checks.
///
/// Lookups go to the wrapped node; everything it returns about identities
/// is reconciled against the local [`TofuKeyStore`] first.
#[derive(Debug)]
pub struct TofuCoreNode<C> {
    remote: C,
    store: Mutex<TofuKeyStore>,
}

impl<C: CoreNode> TofuCoreNode<C> {
    /// Wrap `remote`, pinning into `store`.
    pub fn new(remote: C, store: TofuKeyStore) -> Self {
        Self {
            remote,
            store: Mutex::new(store),
        }
    }

    /// The wrapped node.
    pub fn remote(&self) -> &C {
        &self.remote
    }

    /// A copy of the local store.
    pub async fn snapshot(&self) -> TofuKeyStore {
        self.store.lock().await.clone()
    }

    /// Persist the local store to `path`.
    ///
    /// # Errors
    ///
    /// See [`TofuKeyStore::save`].
    pub async fn save(&self, path: &Path) -> TofuResult<()> {
        self.store.lock().await.save(path)
    }
}

#[async_trait]
impl<C: CoreNode> CoreNode for TofuCoreNode<C> {
    async fn get_username(&self, key: &PublicKey) -> NodeResult<Option<String>> {
        let pinned = self.store.lock().await.get_username(key).map(str::to_owned);
        if pinned.is_some() {
            return Ok(pinned);
        }
        let Some(name) = self.remote.get_username(key).await? else {
            return Ok(None);
        };
        // Only believe the answer if the chain backs it up.
        let chain = self.get_chain(&name).await?;
        if chain.last().map(KeyLink::owner) == Some(key) {
            Ok(Some(name))
        } else {
            warn!(username = %name, key = %key.short_hex(), "Remote reverse lookup not backed by chain");
            Ok(None)
        }
    }

    async fn get_chain(&self, username: &str) -> NodeResult<Vec<KeyLink>> {
        let remote = self.remote.get_chain(username).await?;
        let mut store = self.store.lock().await;
        if remote.is_empty() {
            if let Some(pinned) = store.get_chain(username) {
                return Err(NodeError::Untrusted(TofuError::Shortened {
                    username: username.to_owned(),
                    pinned: pinned.len(),
                    observed: 0,
                }));
            }
            return Ok(remote);
        }
        store.observe_chain(username, &remote)?;
        Ok(remote)
    }

    async fn update_chain(&self, username: &str, tail: &[KeyLink]) -> NodeResult<bool> {
        // Establish the baseline before judging the update.
        self.get_chain(username).await?;
        if let Err(e) = self.store.lock().await.check_update(username, tail) {
            debug!(username, error = %e, "Update rejected locally");
            return Ok(false);
        }
        if !self.remote.update_chain(username, tail).await? {
            return Ok(false);
        }
        // The remote may have moved on meanwhile; re-sync instead of guessing.
        self.get_chain(username).await?;
        Ok(true)
    }

    async fn get_all_usernames_gzip(&self) -> NodeResult<Vec<u8>> {
        self.remote.get_all_usernames_gzip().await
    }

    async fn follow_request(&self, target: &PublicKey, blob: &[u8]) -> NodeResult<bool> {
        self.remote.follow_request(target, blob).await
    }

    async fn remove_follow_request(
        &self,
        owner: &PublicKey,
        signed_blob: &[u8],
    ) -> NodeResult<bool> {
        self.remote.remove_follow_request(owner, signed_blob).await
    }

    async fn get_follow_requests(&self, owner: &PublicKey) -> NodeResult<Vec<u8>> {
        self.remote.get_follow_requests(owner).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use keyledger_crypto::KeyPair;

    use super::*;
    use crate::error::{ChainError, MergeError};
    use crate::link::Claim;

    fn at(days: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap() + Duration::days(days)
    }

    fn link(
        name: &str,
        kp: &KeyPair,
        index: u32,
        days: i64,
        predecessor: Option<&KeyPair>,
    ) -> KeyLink {
        KeyLink::sign(
            kp,
            &Claim {
                username: name.into(),
                index,
                expiry: at(days),
                predecessor: predecessor.map(KeyPair::export_public_key),
            },
        )
        .unwrap()
    }

    fn genesis(name: &str, kp: &KeyPair) -> Vec<KeyLink> {
        vec![link(name, kp, 0, 0, None)]
    }

    fn rotation(name: &str, from: &KeyPair, to: &KeyPair) -> Vec<KeyLink> {
        vec![
            link(name, from, 0, 0, None).with_key_change_proof(from, &to.export_public_key()),
            link(name, to, 1, 1, Some(from)),
        ]
    }

    #[test]
    fn test_first_observation_pins() {
        let k0 = KeyPair::generate();
        let mut store = TofuKeyStore::default();
        store.observe_chain("alice", &genesis("alice", &k0)).unwrap();
        assert_eq!(store.get_public_key("alice"), Some(k0.export_public_key()));
        assert_eq!(store.get_username(&k0.export_public_key()), Some("alice"));
    }

    #[test]
    fn test_invalid_first_observation() {
        let k0 = KeyPair::generate();
        let mut store = TofuKeyStore::default();
        assert!(matches!(
            store.observe_chain("bob", &genesis("alice", &k0)),
            Err(TofuError::InvalidChain {
                source: ChainError::UsernameMismatch { index: 0 },
                ..
            })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_substituted_key_detected() {
        let k0 = KeyPair::generate();
        let evil = KeyPair::generate();
        let mut store = TofuKeyStore::default();
        store.observe_chain("alice", &genesis("alice", &k0)).unwrap();

        // The ledger now claims alice was always `evil`.
        assert!(matches!(
            store.observe_chain("alice", &genesis("alice", &evil)),
            Err(TofuError::Diverged { .. })
        ));
        assert!(store.update_chain("alice", &genesis("alice", &evil)).is_err());
        assert_eq!(store.get_public_key("alice"), Some(k0.export_public_key()));
    }

    #[test]
    fn test_proper_rotation_accepted() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let mut store = TofuKeyStore::default();
        store.observe_chain("alice", &genesis("alice", &k0)).unwrap();
        store.observe_chain("alice", &rotation("alice", &k0, &k1)).unwrap();
        assert_eq!(store.get_public_key("alice"), Some(k1.export_public_key()));
        assert_eq!(store.get_username(&k1.export_public_key()), Some("alice"));
        assert_eq!(store.get_username(&k0.export_public_key()), None);
    }

    #[test]
    fn test_observe_several_rotations_at_once() {
        let keys: Vec<_> = (0..4).map(|_| KeyPair::generate()).collect();
        let mut remote = genesis("alice", &keys[0]);
        let mut store = TofuKeyStore::default();
        store.observe_chain("alice", &remote).unwrap();

        for i in 1..keys.len() {
            let idx = u32::try_from(i).unwrap();
            let prev = remote.pop().unwrap();
            remote.push(prev.with_key_change_proof(&keys[i - 1], &keys[i].export_public_key()));
            remote.push(link("alice", &keys[i], idx, i64::from(idx), Some(&keys[i - 1])));
        }
        store.observe_chain("alice", &remote).unwrap();
        assert_eq!(store.get_chain("alice").unwrap(), remote.as_slice());
    }

    #[test]
    fn test_two_rotations_since_pin() {
        let keys: Vec<_> = (0..3).map(|_| KeyPair::generate()).collect();
        let mut store = TofuKeyStore::default();
        store.observe_chain("alice", &genesis("alice", &keys[0])).unwrap();

        let remote = vec![
            link("alice", &keys[0], 0, 0, None)
                .with_key_change_proof(&keys[0], &keys[1].export_public_key()),
            link("alice", &keys[1], 1, 1, Some(&keys[0]))
                .with_key_change_proof(&keys[1], &keys[2].export_public_key()),
            link("alice", &keys[2], 2, 2, Some(&keys[1])),
        ];
        store.observe_chain("alice", &remote).unwrap();
        assert_eq!(store.get_public_key("alice"), Some(keys[2].export_public_key()));
        assert_eq!(store.get_username(&keys[2].export_public_key()), Some("alice"));
        assert_eq!(store.get_username(&keys[0].export_public_key()), None);
        assert_eq!(store.get_username(&keys[1].export_public_key()), None);
    }

    #[test]
    fn test_observed_expiry_rollback_rejected() {
        let k0 = KeyPair::generate();
        let mut store = TofuKeyStore::default();
        store.observe_chain("alice", &[link("alice", &k0, 0, 30, None)]).unwrap();
        assert!(matches!(
            store.observe_chain("alice", &genesis("alice", &k0)),
            Err(TofuError::Rejected {
                source: MergeError::InvalidTransition(_),
                ..
            })
        ));
    }

    #[test]
    fn test_shortened_chain_rejected() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let mut store = TofuKeyStore::default();
        store.observe_chain("alice", &rotation("alice", &k0, &k1)).unwrap();
        assert!(matches!(
            store.observe_chain("alice", &genesis("alice", &k0)),
            Err(TofuError::Shortened {
                pinned: 2,
                observed: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_key_conflict_between_usernames() {
        let k0 = KeyPair::generate();
        let mut store = TofuKeyStore::default();
        store.observe_chain("alice", &genesis("alice", &k0)).unwrap();
        assert!(matches!(
            store.observe_chain("mallory", &genesis("mallory", &k0)),
            Err(TofuError::KeyConflict { pinned_to, .. }) if pinned_to == "alice"
        ));
    }

    #[test]
    fn test_update_chain_register_then_duplicate() {
        let k0 = KeyPair::generate();
        let mut store = TofuKeyStore::default();
        store.update_chain("alice", &genesis("alice", &k0)).unwrap();
        assert!(matches!(
            store.update_chain("alice", &genesis("alice", &k0)),
            Err(TofuError::Rejected {
                source: MergeError::InvalidTransition(_),
                ..
            })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trust").join("tofu.json");
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let b0 = KeyPair::generate();

        let mut store = TofuKeyStore::default();
        store.observe_chain("alice", &rotation("alice", &k0, &k1)).unwrap();
        store.observe_chain("bob", &genesis("bob", &b0)).unwrap();
        store.save(&path).unwrap();

        let loaded = TofuKeyStore::load(&path, DEFAULT_MAX_TAIL_LEN).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get_username(&k1.export_public_key()), Some("alice"));
        assert_eq!(loaded.get_chain("bob"), store.get_chain("bob"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TofuKeyStore::load(&dir.path().join("absent.json"), 2).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_revalidates() {
        let k0 = KeyPair::generate();
        let mut store = TofuKeyStore::default();
        store.observe_chain("alice", &genesis("alice", &k0)).unwrap();
        // Rename the chain on disk: its claims still say "alice".
        let tampered = store.to_json().unwrap().replace("\"alice\"", "\"bob\"");
        assert!(matches!(
            TofuKeyStore::from_json(&tampered, 2),
            Err(TofuError::InvalidChain { .. })
        ));
    }

    /// A remote node that applies updates without checking anything.
    #[derive(Default)]
    struct CredulousNode {
        chains: StdMutex<HashMap<String, Vec<KeyLink>>>,
    }

    impl CredulousNode {
        fn force(&self, name: &str, chain: Vec<KeyLink>) {
            self.chains.lock().unwrap().insert(name.into(), chain);
        }
    }

    #[async_trait]
    impl CoreNode for CredulousNode {
        async fn get_username(&self, key: &PublicKey) -> NodeResult<Option<String>> {
            Ok(self
                .chains
                .lock()
                .unwrap()
                .iter()
                .find(|(_, c)| c.last().map(KeyLink::owner) == Some(key))
                .map(|(n, _)| n.clone()))
        }

        async fn get_chain(&self, username: &str) -> NodeResult<Vec<KeyLink>> {
            Ok(self
                .chains
                .lock()
                .unwrap()
                .get(username)
                .cloned()
                .unwrap_or_default())
        }

        async fn update_chain(&self, username: &str, tail: &[KeyLink]) -> NodeResult<bool> {
            let mut chains = self.chains.lock().unwrap();
            let existing = chains.get(username).cloned().unwrap_or_default();
            match merge(&existing, tail, username, 2) {
                Ok(m) => {
                    chains.insert(username.into(), m.chain);
                    Ok(true)
                },
                Err(_) => Ok(false),
            }
        }

        async fn get_all_usernames_gzip(&self) -> NodeResult<Vec<u8>> {
            Ok(Vec::new())
        }

        async fn follow_request(&self, _: &PublicKey, _: &[u8]) -> NodeResult<bool> {
            Ok(true)
        }

        async fn remove_follow_request(&self, _: &PublicKey, _: &[u8]) -> NodeResult<bool> {
            Ok(true)
        }

        async fn get_follow_requests(&self, _: &PublicKey) -> NodeResult<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_client_detects_substitution() {
        let k0 = KeyPair::generate();
        let evil = KeyPair::generate();
        let node = TofuCoreNode::new(CredulousNode::default(), TofuKeyStore::default());

        assert!(node.update_chain("alice", &genesis("alice", &k0)).await.unwrap());
        assert_eq!(
            node.get_public_key("alice").await.unwrap(),
            Some(k0.export_public_key())
        );

        node.remote().force("alice", genesis("alice", &evil));
        assert!(matches!(
            node.get_chain("alice").await,
            Err(NodeError::Untrusted(_))
        ));
        assert_eq!(
            node.get_username(&evil.export_public_key()).await.ok().flatten(),
            None
        );
    }

    #[tokio::test]
    async fn test_client_follows_rotation() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let node = TofuCoreNode::new(CredulousNode::default(), TofuKeyStore::default());

        assert!(node.update_chain("alice", &genesis("alice", &k0)).await.unwrap());
        assert!(node.update_chain("alice", &rotation("alice", &k0, &k1)).await.unwrap());
        assert_eq!(
            node.get_username(&k1.export_public_key()).await.unwrap().as_deref(),
            Some("alice")
        );
        assert_eq!(node.snapshot().await.get_chain("alice").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_client_refuses_bad_update_without_forwarding() {
        let k0 = KeyPair::generate();
        let evil = KeyPair::generate();
        let node = TofuCoreNode::new(CredulousNode::default(), TofuKeyStore::default());
        assert!(node.update_chain("alice", &genesis("alice", &k0)).await.unwrap());

        let bogus = vec![
            link("alice", &k0, 0, 0, None).with_key_change_proof(&k0, &KeyPair::generate().export_public_key()),
            link("alice", &evil, 1, 1, Some(&k0)),
        ];
        assert!(!node.update_chain("alice", &bogus).await.unwrap());
        assert_eq!(node.remote().get_chain("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_vanished_chain_is_untrusted() {
        let k0 = KeyPair::generate();
        let node = TofuCoreNode::new(CredulousNode::default(), TofuKeyStore::default());
        assert!(node.update_chain("alice", &genesis("alice", &k0)).await.unwrap());
        node.remote().chains.lock().unwrap().clear();
        assert!(node.get_chain("alice").await.is_err());
        assert!(node.get_chain("nobody").await.unwrap().is_empty());
    }
}
