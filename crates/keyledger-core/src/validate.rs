//! Chain validation.
//!
//! The same checks run on the ledger before any write and on clients before
//! pinning anything received from the network.

use crate::error::{ChainError, ChainResult};
use crate::link::{Claim, KeyLink};

/// Validate a full chain for `username`. It must start at index 0.
///
/// # Errors
///
/// Returns the first [`ChainError`] found, scanning from the genesis link.
pub fn validate(chain: &[KeyLink], username: &str) -> ChainResult<()> {
    check(chain, username, Some(0))
}

/// Validate a contiguous slice of a chain that may start anywhere.
///
/// Continuity into the first link cannot be checked without its
/// predecessor; everything after it is checked as in [`validate`].
///
/// # Errors
///
/// Returns the first [`ChainError`] found.
pub fn validate_tail(tail: &[KeyLink], username: &str) -> ChainResult<()> {
    check(tail, username, None)
}

fn check(links: &[KeyLink], username: &str, start: Option<u32>) -> ChainResult<()> {
    let first = links.first().ok_or(ChainError::Empty)?;
    let mut expected = start.unwrap_or(first.index());
    let mut previous: Option<(&KeyLink, Claim)> = None;

    for link in links {
        if link.index() != expected {
            return Err(ChainError::NonContiguousIndex {
                expected,
                found: link.index(),
            });
        }
        let index = link.index();

        let claim = link.open_claim()?;
        if claim.username != username {
            return Err(ChainError::UsernameMismatch { index });
        }
        if claim.index != index {
            return Err(ChainError::IndexMismatch { index });
        }
        // Verifies the proof signature even on the last link.
        let successor = link.successor()?;

        match &previous {
            Some((prev_link, prev_claim)) => {
                let proven = prev_link.successor()? == Some(*link.owner());
                let accepted = claim.predecessor == Some(*prev_link.owner());
                if !(proven && accepted) {
                    return Err(ChainError::BrokenContinuity { index });
                }
                if claim.expiry < prev_claim.expiry {
                    return Err(ChainError::ExpiryRegression { index });
                }
            },
            None if index == 0 && claim.predecessor.is_some() => {
                return Err(ChainError::BrokenContinuity { index });
            },
            None => {},
        }

        if successor == Some(*link.owner()) {
            return Err(ChainError::BrokenContinuity {
                index: index.saturating_add(1),
            });
        }

        expected = index
            .checked_add(1)
            .ok_or(ChainError::NonContiguousIndex {
                expected: u32::MAX,
                found: index,
            })?;
        previous = Some((link, claim));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use keyledger_crypto::{KeyPair, PublicKey};

    use super::*;

    fn at(days: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap() + Duration::days(days)
    }

    fn link(
        kp: &KeyPair,
        index: u32,
        expiry: DateTime<Utc>,
        predecessor: Option<PublicKey>,
    ) -> KeyLink {
        KeyLink::sign(
            kp,
            &Claim {
                username: "alice".into(),
                index,
                expiry,
                predecessor,
            },
        )
        .unwrap()
    }

    /// A chain over `keys`, each rotation properly proven.
    fn chain(keys: &[KeyPair]) -> Vec<KeyLink> {
        let mut out = Vec::new();
        for (i, kp) in keys.iter().enumerate() {
            let index = u32::try_from(i).unwrap();
            let pred = i.checked_sub(1).map(|p| keys[p].export_public_key());
            let mut l = link(kp, index, at(i64::from(index)), pred);
            if let Some(next) = keys.get(i + 1) {
                l = l.with_key_change_proof(kp, &next.export_public_key());
            }
            out.push(l);
        }
        out
    }

    #[test]
    fn test_valid_chains() {
        let keys: Vec<_> = (0..4).map(|_| KeyPair::generate()).collect();
        for n in 1..=keys.len() {
            validate(&chain(&keys[..n]), "alice").unwrap();
        }
    }

    #[test]
    fn test_empty_chain() {
        assert_eq!(validate(&[], "alice"), Err(ChainError::Empty));
    }

    #[test]
    fn test_must_start_at_genesis() {
        let keys: Vec<_> = (0..3).map(|_| KeyPair::generate()).collect();
        let full = chain(&keys);
        assert_eq!(
            validate(&full[1..], "alice"),
            Err(ChainError::NonContiguousIndex {
                expected: 0,
                found: 1
            })
        );
        validate_tail(&full[1..], "alice").unwrap();
    }

    #[test]
    fn test_gap_rejected() {
        let keys: Vec<_> = (0..3).map(|_| KeyPair::generate()).collect();
        let full = chain(&keys);
        let gapped = vec![full[0].clone(), full[2].clone()];
        assert_eq!(
            validate(&gapped, "alice"),
            Err(ChainError::NonContiguousIndex {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn test_wrong_username() {
        let keys = [KeyPair::generate()];
        assert_eq!(
            validate(&chain(&keys), "bob"),
            Err(ChainError::UsernameMismatch { index: 0 })
        );
    }

    #[test]
    fn test_claimed_index_must_match() {
        let kp = KeyPair::generate();
        let l = link(&kp, 3, at(0), None);
        let relabelled = KeyLink::from_parts(*l.owner(), 0, l.signed_claim().to_vec(), None);
        assert_eq!(
            validate(&[relabelled], "alice"),
            Err(ChainError::IndexMismatch { index: 0 })
        );
    }

    #[test]
    fn test_rotation_without_proof() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let unproven = vec![
            link(&k0, 0, at(0), None),
            link(&k1, 1, at(1), Some(k0.export_public_key())),
        ];
        assert_eq!(
            validate(&unproven, "alice"),
            Err(ChainError::BrokenContinuity { index: 1 })
        );
    }

    #[test]
    fn test_rotation_to_unnamed_key() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let imposter = KeyPair::generate();
        let substituted = vec![
            link(&k0, 0, at(0), None).with_key_change_proof(&k0, &k1.export_public_key()),
            link(&imposter, 1, at(1), Some(k0.export_public_key())),
        ];
        assert_eq!(
            validate(&substituted, "alice"),
            Err(ChainError::BrokenContinuity { index: 1 })
        );
    }

    #[test]
    fn test_incoming_key_must_accept() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let not_accepted = vec![
            link(&k0, 0, at(0), None).with_key_change_proof(&k0, &k1.export_public_key()),
            link(&k1, 1, at(1), None),
        ];
        assert_eq!(
            validate(&not_accepted, "alice"),
            Err(ChainError::BrokenContinuity { index: 1 })
        );
    }

    #[test]
    fn test_genesis_with_predecessor() {
        let k0 = KeyPair::generate();
        let other = KeyPair::generate().export_public_key();
        assert_eq!(
            validate(&[link(&k0, 0, at(0), Some(other))], "alice"),
            Err(ChainError::BrokenContinuity { index: 0 })
        );
    }

    #[test]
    fn test_self_rotation_rejected() {
        let k0 = KeyPair::generate();
        let looped = link(&k0, 0, at(0), None).with_key_change_proof(&k0, &k0.export_public_key());
        assert_eq!(
            validate(&[looped], "alice"),
            Err(ChainError::BrokenContinuity { index: 1 })
        );
    }

    #[test]
    fn test_expiry_regression() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let regressed = vec![
            link(&k0, 0, at(5), None).with_key_change_proof(&k0, &k1.export_public_key()),
            link(&k1, 1, at(4), Some(k0.export_public_key())),
        ];
        assert_eq!(
            validate(&regressed, "alice"),
            Err(ChainError::ExpiryRegression { index: 1 })
        );
    }

    #[test]
    fn test_equal_expiry_allowed() {
        let k0 = KeyPair::generate();
        let k1 = KeyPair::generate();
        let flat = vec![
            link(&k0, 0, at(5), None).with_key_change_proof(&k0, &k1.export_public_key()),
            link(&k1, 1, at(5), Some(k0.export_public_key())),
        ];
        validate(&flat, "alice").unwrap();
    }

    #[test]
    fn test_forged_proof_on_last_link() {
        let k0 = KeyPair::generate();
        let intruder = KeyPair::generate();
        let forged =
            link(&k0, 0, at(0), None).with_key_change_proof(&intruder, &intruder.export_public_key());
        assert_eq!(
            validate(&[forged], "alice"),
            Err(ChainError::BadSignature { index: 0 })
        );
    }
}
