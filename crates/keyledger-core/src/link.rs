//! Key links and chains.
//!
//! A [`KeyLink`] asserts that its `owner` key speaks for a username at a
//! given position. The assertion is the signed [`Claim`]; it is
//! self-certifying because it is signed by the key it names. When a key is
//! rotated out, its link gains a key-change proof: a message signed by the
//! outgoing key naming the incoming one.

use chrono::{DateTime, Utc};
use keyledger_crypto::{KeyPair, PublicKey};

use crate::codec::{Decoder, Encoder, RecordTag};
use crate::error::{ChainError, ChainResult, CodecError, CodecResult};

/// The statement a link's owner signs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// Username the key speaks for.
    pub username: String,
    /// Position of the link in the chain.
    pub index: u32,
    /// When this binding stops being valid.
    pub expiry: DateTime<Utc>,
    /// Key of the previous link, accepting succession from it. `None` for
    /// the genesis link.
    pub predecessor: Option<PublicKey>,
}

impl Claim {
    /// Canonical encoding; this is what the owner signs.
    ///
    /// # Errors
    ///
    /// [`CodecError::FieldTooLong`] for a username longer than `u32::MAX`.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        Ok(Encoder::new(RecordTag::Claim)
            .str(&self.username)?
            .u32(self.index)
            .timestamp(self.expiry)
            .opt_key(self.predecessor.as_ref())
            .finish())
    }

    /// Decode a claim body.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the bytes are not a claim record.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut d = Decoder::new(bytes, RecordTag::Claim)?;
        let claim = Self {
            username: d.string()?,
            index: d.u32()?,
            expiry: d.timestamp()?,
            predecessor: d.opt_key()?,
        };
        d.finish()?;
        Ok(claim)
    }
}

/// Body of a key-change proof: the successor's key.
#[must_use]
pub fn key_change_body(successor: &PublicKey) -> Vec<u8> {
    Encoder::new(RecordTag::KeyChange).key(successor).finish()
}

fn decode_key_change_body(bytes: &[u8]) -> CodecResult<PublicKey> {
    let mut d = Decoder::new(bytes, RecordTag::KeyChange)?;
    let key = d.key()?;
    d.finish()?;
    Ok(key)
}

/// One signed entry in a username's chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLink {
    owner: PublicKey,
    index: u32,
    claim: Vec<u8>,
    key_change_proof: Option<Vec<u8>>,
}

impl KeyLink {
    /// Build a link from already-signed parts. Nothing is verified here.
    #[must_use]
    pub fn from_parts(
        owner: PublicKey,
        index: u32,
        claim: Vec<u8>,
        key_change_proof: Option<Vec<u8>>,
    ) -> Self {
        Self {
            owner,
            index,
            claim,
            key_change_proof,
        }
    }

    /// Sign a fresh link with `keypair` (client side).
    ///
    /// # Errors
    ///
    /// See [`Claim::encode`].
    pub fn sign(keypair: &KeyPair, claim: &Claim) -> CodecResult<Self> {
        Ok(Self {
            owner: keypair.export_public_key(),
            index: claim.index,
            claim: keypair.sign_message(&claim.encode()?),
            key_change_proof: None,
        })
    }

    /// Attach a key-change proof naming `successor`, signed by `keypair`.
    ///
    /// `keypair` must be this link's owner or the proof will not validate.
    #[must_use]
    pub fn with_key_change_proof(mut self, keypair: &KeyPair, successor: &PublicKey) -> Self {
        self.key_change_proof = Some(keypair.sign_message(&key_change_body(successor)));
        self
    }

    /// The key this link binds.
    #[must_use]
    pub fn owner(&self) -> &PublicKey {
        &self.owner
    }

    /// Position in the chain.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The signed claim as stored.
    #[must_use]
    pub fn signed_claim(&self) -> &[u8] {
        &self.claim
    }

    /// The signed key-change proof, if this key has been rotated out.
    #[must_use]
    pub fn key_change_proof(&self) -> Option<&[u8]> {
        self.key_change_proof.as_deref()
    }

    /// Verify and decode the claim.
    ///
    /// # Errors
    ///
    /// [`ChainError::BadSignature`] if the claim is not signed by the owner,
    /// [`ChainError::MalformedClaim`] if the body does not decode.
    pub fn open_claim(&self) -> ChainResult<Claim> {
        let body = self
            .owner
            .unsign_message(&self.claim)
            .map_err(|_| ChainError::BadSignature { index: self.index })?;
        Claim::decode(&body).map_err(|e| ChainError::MalformedClaim {
            index: self.index,
            reason: e.to_string(),
        })
    }

    /// Verify the key-change proof and return the successor it names.
    ///
    /// # Errors
    ///
    /// [`ChainError::BadSignature`] if a proof is present but not signed by
    /// the owner or does not decode.
    pub fn successor(&self) -> ChainResult<Option<PublicKey>> {
        let Some(proof) = &self.key_change_proof else {
            return Ok(None);
        };
        let bad = || ChainError::BadSignature { index: self.index };
        let body = self.owner.unsign_message(proof).map_err(|_| bad())?;
        decode_key_change_body(&body).map(Some).map_err(|_| bad())
    }

    /// Whether `other` occupies the same slot (same key, same index).
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        self.owner == other.owner && self.index == other.index
    }

    /// Canonical encoding.
    ///
    /// # Errors
    ///
    /// [`CodecError::FieldTooLong`] if a signed field exceeds `u32::MAX`.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        Ok(Encoder::new(RecordTag::Link)
            .key(&self.owner)
            .u32(self.index)
            .bytes(&self.claim)?
            .opt_bytes(self.key_change_proof.as_deref())?
            .finish())
    }

    /// Decode a link.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the bytes are not a link record.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut d = Decoder::new(bytes, RecordTag::Link)?;
        let link = Self {
            owner: d.key()?,
            index: d.u32()?,
            claim: d.bytes()?.to_vec(),
            key_change_proof: d.opt_bytes()?.map(<[u8]>::to_vec),
        };
        d.finish()?;
        Ok(link)
    }
}

/// Encode a sequence of links (a chain or a proposed tail).
///
/// # Errors
///
/// [`CodecError::FieldTooLong`] if any length does not fit its prefix.
pub fn encode_chain(links: &[KeyLink]) -> CodecResult<Vec<u8>> {
    links
        .iter()
        .try_fold(Encoder::new(RecordTag::Chain).count(links.len())?, |enc, link| {
            enc.bytes(&link.encode()?)
        })
        .map(Encoder::finish)
}

/// Decode a sequence written by [`encode_chain`].
///
/// # Errors
///
/// Returns a [`CodecError`] on any malformed link.
pub fn decode_chain(bytes: &[u8]) -> CodecResult<Vec<KeyLink>> {
    let mut d = Decoder::new(bytes, RecordTag::Chain)?;
    let count = d.u32()?;
    // Each entry is at least a 4-byte length prefix.
    let remaining = bytes.len();
    if usize::try_from(count).is_ok_and(|c| c > remaining / 4) {
        return Err(CodecError::Truncated {
            needed: remaining.saturating_add(1),
            remaining,
        });
    }
    let mut links = Vec::new();
    for _ in 0..count {
        links.push(KeyLink::decode(d.bytes()?)?);
    }
    d.finish()?;
    Ok(links)
}
