//! Signed chain fixtures.

use chrono::{DateTime, Duration, TimeZone, Utc};
use keyledger_core::{Claim, KeyLink};
use keyledger_crypto::{KeyPair, PublicKey};

/// Fixed expiry `days` after 2030-01-01, so signatures are reproducible
/// within a test.
///
/// # Panics
///
/// If `days` moves the date outside chrono's range.
#[must_use]
pub fn expiry(days: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0)
        .single()
        .and_then(|base| base.checked_add_signed(Duration::days(days)))
        .expect("expiry stays within chrono's range")
}

/// Sign a link for `username` without any continuity proof.
///
/// # Panics
///
/// If the claim does not encode, which needs a username over 4 GiB.
#[must_use]
pub fn signed_link(
    keypair: &KeyPair,
    username: &str,
    index: u32,
    expiry: DateTime<Utc>,
    predecessor: Option<PublicKey>,
) -> KeyLink {
    KeyLink::sign(
        keypair,
        &Claim {
            username: username.to_owned(),
            index,
            expiry,
            predecessor,
        },
    )
    .expect("fixture claims encode")
}

/// A client-side identity: every key it has held and the chain it expects
/// the ledger to store.
pub struct Identity {
    username: String,
    keys: Vec<KeyPair>,
    chain: Vec<KeyLink>,
    days: i64,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("links", &self.chain.len())
            .finish_non_exhaustive()
    }
}

impl Identity {
    /// New identity with a fresh first key and no chain yet.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            keys: vec![KeyPair::generate()],
            chain: Vec::new(),
            days: 0,
        }
    }

    /// Username this identity claims.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Key pair currently in use.
    ///
    /// # Panics
    ///
    /// Never; an identity always holds at least one key.
    #[must_use]
    pub fn keypair(&self) -> &KeyPair {
        self.keys.last().expect("identity always holds a key")
    }

    /// Public half of [`Identity::keypair`].
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.keypair().export_public_key()
    }

    /// Every key held so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<PublicKey> {
        self.keys.iter().map(KeyPair::export_public_key).collect()
    }

    /// The chain after every tail produced so far was accepted.
    #[must_use]
    pub fn chain(&self) -> &[KeyLink] {
        &self.chain
    }

    fn next_index(&self) -> u32 {
        u32::try_from(self.chain.len()).unwrap_or(u32::MAX)
    }

    /// Genesis tail claiming the username with the current key.
    #[must_use]
    pub fn genesis(&mut self) -> Vec<KeyLink> {
        let link = signed_link(self.keypair(), &self.username, 0, expiry(self.days), None);
        self.chain = vec![link.clone()];
        vec![link]
    }

    /// Two-link rotation tail: the current link with a key-change proof,
    /// then a link under a fresh key.
    ///
    /// # Panics
    ///
    /// If called before [`Identity::genesis`].
    #[must_use]
    pub fn rotate(&mut self) -> Vec<KeyLink> {
        let next = KeyPair::generate();
        let outgoing = self
            .chain
            .pop()
            .expect("rotate needs a chain; call genesis first")
            .with_key_change_proof(self.keypair(), &next.export_public_key());
        self.days = self.days.saturating_add(1);
        let incoming = signed_link(
            &next,
            &self.username,
            outgoing.index().saturating_add(1),
            expiry(self.days),
            Some(self.public_key()),
        );
        self.keys.push(next);
        self.chain.push(outgoing.clone());
        self.chain.push(incoming.clone());
        vec![outgoing, incoming]
    }

    /// One-link refresh tail: the current link re-signed with an expiry
    /// `days` later.
    ///
    /// # Panics
    ///
    /// If called before [`Identity::genesis`].
    #[must_use]
    pub fn refresh(&mut self, days: i64) -> Vec<KeyLink> {
        let current = self
            .chain
            .pop()
            .expect("refresh needs a chain; call genesis first");
        let claim = current.open_claim().expect("fixture links are valid");
        self.days = self.days.saturating_add(days);
        let renewed = signed_link(
            self.keypair(),
            &self.username,
            current.index(),
            expiry(self.days),
            claim.predecessor,
        );
        self.chain.push(renewed.clone());
        vec![renewed]
    }

    /// Rotation tail whose new link is held by `imposter` while the proof
    /// names a different, honest key. The identity is left unchanged.
    ///
    /// # Panics
    ///
    /// If called before [`Identity::genesis`].
    #[must_use]
    pub fn forged_rotation(&self, imposter: &KeyPair) -> Vec<KeyLink> {
        let honest = KeyPair::generate();
        let outgoing = self
            .chain
            .last()
            .cloned()
            .expect("forging needs a chain; call genesis first")
            .with_key_change_proof(self.keypair(), &honest.export_public_key());
        let incoming = signed_link(
            imposter,
            &self.username,
            self.next_index(),
            expiry(self.days.saturating_add(1)),
            Some(self.public_key()),
        );
        vec![outgoing, incoming]
    }
}
