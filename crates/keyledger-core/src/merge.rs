//! Reconciling a stored chain with a proposed tail.

use std::collections::HashSet;
use std::fmt;

use crate::error::{MergeError, MergeResult};
use crate::link::KeyLink;
use crate::validate::validate;

/// Longest tail accepted by default: the rewritten current link plus one
/// new link.
pub const DEFAULT_MAX_TAIL_LEN: usize = 2;

/// What an accepted update did to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Claimed a new username with its genesis link.
    Register,
    /// Appended a link under a new key.
    Rotate,
    /// Reissued the current link under the same key.
    Refresh,
}

impl UpdateKind {
    /// Whether the update introduces a key the ledger has not seen.
    #[must_use]
    pub fn binds_new_key(self) -> bool {
        matches!(self, Self::Register | Self::Rotate)
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => write!(f, "register"),
            Self::Rotate => write!(f, "rotate"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    /// The full chain after the update.
    pub chain: Vec<KeyLink>,
    /// How the update was classified.
    pub kind: UpdateKind,
}

impl Merged {
    /// Links the update wrote, i.e. the accepted tail.
    #[must_use]
    pub fn written(&self, existing_len: usize) -> &[KeyLink] {
        let from = match self.kind {
            UpdateKind::Register => 0,
            UpdateKind::Rotate | UpdateKind::Refresh => existing_len.saturating_sub(1),
        };
        self.chain.get(from..).unwrap_or_default()
    }

    /// The key the chain now resolves to.
    #[must_use]
    pub fn current_key(&self) -> Option<&keyledger_crypto::PublicKey> {
        self.chain.last().map(KeyLink::owner)
    }
}

fn invalid(reason: impl Into<String>) -> MergeError {
    MergeError::InvalidTransition(reason.into())
}

/// The current link must not hand over to a key that has no link yet.
fn check_no_dangling(chain: &[KeyLink]) -> MergeResult<()> {
    match chain.last() {
        Some(last) if last.key_change_proof().is_some() => {
            Err(invalid("current link hands over to a key with no link"))
        },
        _ => Ok(()),
    }
}

/// A rewritten current link may not expire before the one it replaces,
/// otherwise an old signed copy could roll a refresh back.
fn check_expiry_kept(stored: &KeyLink, rewritten: &KeyLink) -> MergeResult<()> {
    if rewritten.open_claim()?.expiry < stored.open_claim()?.expiry {
        return Err(invalid("rewritten link expires before the stored one"));
    }
    Ok(())
}

/// No key may own two links of one chain.
fn check_distinct_keys(chain: &[KeyLink]) -> MergeResult<()> {
    let mut seen = HashSet::with_capacity(chain.len());
    if chain.iter().all(|l| seen.insert(*l.owner())) {
        Ok(())
    } else {
        Err(invalid("rotation reuses a key from this chain"))
    }
}

/// Whether `remote` grows out of `pinned`: every link before the pinned
/// current one is unchanged and the pinned current slot is still held by
/// the same key.
#[must_use]
pub fn extends(pinned: &[KeyLink], remote: &[KeyLink]) -> bool {
    let Some((current, frozen)) = pinned.split_last() else {
        return true;
    };
    remote.starts_with(frozen)
        && remote
            .get(frozen.len())
            .is_some_and(|link| link.same_slot(current))
}

/// Merge `tail` onto `existing` for `username`.
///
/// The tail must begin at the current last link (same key, same index) and
/// may add at most one link after it. An empty `existing` only accepts a
/// single genesis link. The merged chain is validated as a whole.
///
/// # Errors
///
/// - [`MergeError::EmptyTail`] / [`MergeError::TailTooLong`] on tail shape
/// - [`MergeError::InvalidTransition`] if the tail does not extend the
///   current state, would shorten it, or changes nothing
/// - [`MergeError::InvalidChain`] if the merged chain fails validation
pub fn merge(
    existing: &[KeyLink],
    tail: &[KeyLink],
    username: &str,
    max_tail: usize,
) -> MergeResult<Merged> {
    let head = tail.first().ok_or(MergeError::EmptyTail)?;
    if tail.len() > max_tail {
        return Err(MergeError::TailTooLong {
            len: tail.len(),
            max: max_tail,
        });
    }

    let Some((last, kept)) = existing.split_last() else {
        if tail.len() != 1 || head.index() != 0 {
            return Err(invalid("registration takes exactly one genesis link"));
        }
        check_no_dangling(tail)?;
        validate(tail, username)?;
        return Ok(Merged {
            chain: tail.to_vec(),
            kind: UpdateKind::Register,
        });
    };

    if !head.same_slot(last) {
        return Err(invalid(format!(
            "tail must start at link {} held by the current key",
            last.index()
        )));
    }

    let mut chain = Vec::with_capacity(kept.len().saturating_add(tail.len()));
    chain.extend_from_slice(kept);
    chain.extend_from_slice(tail);

    let kind = match chain.len().checked_sub(existing.len()) {
        Some(0) => UpdateKind::Refresh,
        Some(1) => UpdateKind::Rotate,
        _ => return Err(invalid("tail does not extend the chain by at most one link")),
    };
    if chain == existing {
        return Err(invalid("update changes nothing"));
    }
    check_no_dangling(&chain)?;
    check_expiry_kept(last, head)?;
    if kind == UpdateKind::Rotate {
        let incoming = tail.last().map(KeyLink::owner);
        if existing.iter().any(|l| Some(l.owner()) == incoming) {
            return Err(invalid("rotation reuses a key from this chain"));
        }
    }

    validate(&chain, username)?;
    Ok(Merged { chain, kind })
}

/// Accept a full `remote` chain that may be several updates ahead of
/// `pinned`.
///
/// Unlike [`merge`] there is no tail bound: any number of rotations may
/// have happened since `pinned` was taken. The result is
/// [`UpdateKind::Refresh`] when no link was added.
///
/// # Errors
///
/// - [`MergeError::InvalidTransition`] if `remote` does not grow out of
///   `pinned`, changes nothing, reuses a key, ends in a handover to a key
///   with no link or rolls the pinned current link's expiry back
/// - [`MergeError::InvalidChain`] if `remote` fails validation
pub fn catch_up(pinned: &[KeyLink], remote: &[KeyLink], username: &str) -> MergeResult<Merged> {
    let Some(current) = pinned.last() else {
        check_no_dangling(remote)?;
        validate(remote, username)?;
        return Ok(Merged {
            chain: remote.to_vec(),
            kind: UpdateKind::Register,
        });
    };
    if !extends(pinned, remote) {
        return Err(invalid("history differs from the pinned chain"));
    }
    if pinned == remote {
        return Err(invalid("update changes nothing"));
    }

    validate(remote, username)?;
    check_no_dangling(remote)?;
    check_distinct_keys(remote)?;
    if let Some(rewritten) = remote.get(pinned.len().saturating_sub(1)) {
        check_expiry_kept(current, rewritten)?;
    }

    let kind = if remote.len() == pinned.len() {
        UpdateKind::Refresh
    } else {
        UpdateKind::Rotate
    };
    Ok(Merged {
        chain: remote.to_vec(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use keyledger_crypto::{KeyPair, PublicKey};

    use super::*;
    use crate::error::ChainError;
    use crate::link::Claim;

    const MAX: usize = DEFAULT_MAX_TAIL_LEN;

    fn at(days: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap() + Duration::days(days)
    }

    fn link(kp: &KeyPair, index: u32, days: i64, predecessor: Option<PublicKey>) -> KeyLink {
        KeyLink::sign(
            kp,
            &Claim {
                username: "alice".into(),
                index,
                expiry: at(days),
                predecessor,
            },
        )
        .unwrap()
    }

    /// Rotation tail out of a genesis-only chain held by `from`.
    fn rotation(from: &KeyPair, to: &KeyPair) -> Vec<KeyLink> {
        vec![
            link(from, 0, 0, None).with_key_change_proof(from, &to.export_public_key()),
            link(to, 1, 1, Some(from.export_public_key())),
        ]
    }

    #[test]
    fn test_register() {
        let k0 = KeyPair::generate();
        let merged = merge(&[], &[link(&k0, 0, 0, None)], "alice", MAX).unwrap();
        assert_eq!(merged.kind, UpdateKind::Register);
        assert_eq!(merged.chain.len(), 1);
        assert_eq!(merged.current_key(), Some(&k0.export_public_key()));
    }

    #[test]
    fn test_register_needs_single_genesis() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        assert!(matches!(
            merge(&[], &rotation(&k0, &k1), "alice", MAX),
            Err(MergeError::InvalidTransition(_))
        ));
        assert!(matches!(
            merge(&[], &[link(&k0, 1, 0, None)], "alice", MAX),
            Err(MergeError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let k0 = KeyPair::generate();
        let genesis = link(&k0, 0, 0, None);
        let existing = vec![genesis.clone()];
        assert!(matches!(
            merge(&existing, &[genesis], "alice", MAX),
            Err(MergeError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_competing_registration_rejected() {
        let k0 = KeyPair::generate();
        let thief = KeyPair::generate();
        let existing = vec![link(&k0, 0, 0, None)];
        assert!(matches!(
            merge(&existing, &[link(&thief, 0, 0, None)], "alice", MAX),
            Err(MergeError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_rotate() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let existing = vec![link(&k0, 0, 0, None)];
        let tail = rotation(&k0, &k1);
        let merged = merge(&existing, &tail, "alice", MAX).unwrap();
        assert_eq!(merged.kind, UpdateKind::Rotate);
        assert_eq!(merged.chain, tail);
        assert_eq!(merged.written(existing.len()), tail.as_slice());
        assert_eq!(merged.current_key(), Some(&k1.export_public_key()));
    }

    #[test]
    fn test_refresh() {
        let k0 = KeyPair::generate();
        let existing = vec![link(&k0, 0, 0, None)];
        let renewed = link(&k0, 0, 30, None);
        let merged = merge(&existing, &[renewed.clone()], "alice", MAX).unwrap();
        assert_eq!(merged.kind, UpdateKind::Refresh);
        assert_eq!(merged.chain, vec![renewed]);
    }

    #[test]
    fn test_dangling_handover_rejected() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let announced = link(&k0, 0, 0, None).with_key_change_proof(&k0, &k1.export_public_key());
        assert!(matches!(
            merge(&[], &[announced.clone()], "alice", MAX),
            Err(MergeError::InvalidTransition(_))
        ));

        let existing = vec![link(&k0, 0, 0, None)];
        assert!(matches!(
            merge(&existing, &[announced], "alice", MAX),
            Err(MergeError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_tail_bounds() {
        let k0 = KeyPair::generate();
        let existing = vec![link(&k0, 0, 0, None)];
        assert_eq!(merge(&existing, &[], "alice", MAX), Err(MergeError::EmptyTail));

        let long = vec![existing[0].clone(); 3];
        assert_eq!(
            merge(&existing, &long, "alice", MAX),
            Err(MergeError::TailTooLong { len: 3, max: 2 })
        );
    }

    #[test]
    fn test_tail_must_start_at_current_link() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let existing = vec![link(&k0, 0, 0, None)];
        // Appending without re-submitting the outgoing link.
        let appended = vec![link(&k1, 1, 1, Some(k0.export_public_key()))];
        assert!(matches!(
            merge(&existing, &appended, "alice", MAX),
            Err(MergeError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_substituted_key_rejected() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let imposter = KeyPair::generate();
        let existing = vec![link(&k0, 0, 0, None)];
        let tail = vec![
            link(&k0, 0, 0, None).with_key_change_proof(&k0, &k1.export_public_key()),
            link(&imposter, 1, 1, Some(k0.export_public_key())),
        ];
        assert_eq!(
            merge(&existing, &tail, "alice", MAX),
            Err(MergeError::InvalidChain(ChainError::BrokenContinuity {
                index: 1
            }))
        );
    }

    #[test]
    fn test_rotation_cannot_return_to_old_key() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let existing = rotation(&k0, &k1);
        let back = vec![
            link(&k1, 1, 1, Some(k0.export_public_key()))
                .with_key_change_proof(&k1, &k0.export_public_key()),
            link(&k0, 2, 2, Some(k1.export_public_key())),
        ];
        assert!(matches!(
            merge(&existing, &back, "alice", MAX),
            Err(MergeError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_shrinking_impossible() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let existing = rotation(&k0, &k1);
        // Only the genesis slot, which is no longer the current link.
        assert!(matches!(
            merge(&existing, &[existing[0].clone()], "alice", MAX),
            Err(MergeError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_refresh_cannot_roll_expiry_back() {
        let k0 = KeyPair::generate();
        let original = link(&k0, 0, 0, None);
        let existing = vec![link(&k0, 0, 30, None)];
        assert!(matches!(
            merge(&existing, &[original], "alice", MAX),
            Err(MergeError::InvalidTransition(_))
        ));
        // A rotation may not smuggle the older copy back in either.
        let k1 = KeyPair::generate();
        assert!(matches!(
            merge(&existing, &rotation(&k0, &k1), "alice", MAX),
            Err(MergeError::InvalidTransition(_))
        ));
    }

    /// `keys[0]` rotated through every following key, one link per key.
    fn rotated_through(keys: &[KeyPair]) -> Vec<KeyLink> {
        let mut chain = vec![link(&keys[0], 0, 0, None)];
        for (i, pair) in keys.windows(2).enumerate() {
            let index = u32::try_from(i + 1).unwrap();
            let outgoing = chain.pop().unwrap();
            chain.push(outgoing.with_key_change_proof(&pair[0], &pair[1].export_public_key()));
            chain.push(link(
                &pair[1],
                index,
                i64::from(index),
                Some(pair[0].export_public_key()),
            ));
        }
        chain
    }

    #[test]
    fn test_catch_up_over_several_rotations() {
        let keys: Vec<_> = (0..3).map(|_| KeyPair::generate()).collect();
        let pinned = vec![link(&keys[0], 0, 0, None)];
        let remote = rotated_through(&keys);
        validate(&remote, "alice").unwrap();

        let merged = catch_up(&pinned, &remote, "alice").unwrap();
        assert_eq!(merged.kind, UpdateKind::Rotate);
        assert_eq!(merged.chain, remote);
        assert_eq!(merged.current_key(), Some(&keys[2].export_public_key()));
    }

    #[test]
    fn test_catch_up_refresh_and_rollback() {
        let k0 = KeyPair::generate();
        let pinned = vec![link(&k0, 0, 10, None)];
        let later = vec![link(&k0, 0, 20, None)];
        assert_eq!(catch_up(&pinned, &later, "alice").unwrap().kind, UpdateKind::Refresh);
        assert!(matches!(
            catch_up(&later, &pinned, "alice"),
            Err(MergeError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_catch_up_rejects_foreign_history() {
        let keys: Vec<_> = (0..3).map(|_| KeyPair::generate()).collect();
        let pinned = rotated_through(&keys[..2]);
        let other: Vec<_> = (0..3).map(|_| KeyPair::generate()).collect();
        assert!(!extends(&pinned, &rotated_through(&other)));
        assert!(matches!(
            catch_up(&pinned, &rotated_through(&other), "alice"),
            Err(MergeError::InvalidTransition(_))
        ));
        assert!(matches!(
            catch_up(&pinned, &pinned[..1], "alice"),
            Err(MergeError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_catch_up_rejects_key_reuse_and_dangling_end() {
        let keys: Vec<_> = (0..2).map(|_| KeyPair::generate()).collect();
        let (k0, k1) = (&keys[0], &keys[1]);
        let pinned = vec![link(k0, 0, 0, None)];

        let mut back = rotated_through(&keys);
        let outgoing = back.pop().unwrap();
        back.push(outgoing.with_key_change_proof(k1, &k0.export_public_key()));
        back.push(link(k0, 2, 2, Some(k1.export_public_key())));
        assert!(matches!(
            catch_up(&pinned, &back, "alice"),
            Err(MergeError::InvalidTransition(_))
        ));

        let announced =
            vec![link(k0, 0, 0, None).with_key_change_proof(k0, &k1.export_public_key())];
        assert!(matches!(
            catch_up(&pinned, &announced, "alice"),
            Err(MergeError::InvalidTransition(_))
        ));
    }
}
