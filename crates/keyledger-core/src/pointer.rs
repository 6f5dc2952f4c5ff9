//! Signed metadata pointer payloads.
//!
//! A pointer is one "latest hash" per writing key. Writers sign an update
//! naming the hash they believe is current and the hash that should replace
//! it; the ledger applies it only if that belief is still true.

use keyledger_crypto::{KeyPair, PublicKey};

use crate::codec::{Decoder, Encoder, RecordTag};
use crate::error::{CodecResult, PayloadError};

/// Compare-and-swap request for a pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerUpdate {
    /// Hash the writer believes is current; `None` if it believes the
    /// pointer does not exist yet.
    pub previous: Option<Vec<u8>>,
    /// Hash to store.
    pub current: Vec<u8>,
}

impl PointerUpdate {
    /// First write of a pointer.
    #[must_use]
    pub fn create(current: impl Into<Vec<u8>>) -> Self {
        Self {
            previous: None,
            current: current.into(),
        }
    }

    /// Replace `previous` with `current`.
    #[must_use]
    pub fn replace(previous: impl Into<Vec<u8>>, current: impl Into<Vec<u8>>) -> Self {
        Self {
            previous: Some(previous.into()),
            current: current.into(),
        }
    }

    /// Canonical body.
    ///
    /// # Errors
    ///
    /// [`FieldTooLong`](crate::CodecError::FieldTooLong) for a hash longer than `u32::MAX`.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        Ok(Encoder::new(RecordTag::PointerUpdate)
            .opt_bytes(self.previous.as_deref())?
            .bytes(&self.current)?
            .finish())
    }

    /// Sign this update with the writing key (client side).
    ///
    /// # Errors
    ///
    /// See [`PointerUpdate::encode`].
    pub fn sign(&self, keypair: &KeyPair) -> CodecResult<Vec<u8>> {
        Ok(keypair.sign_message(&self.encode()?))
    }

    /// Verify `signed` against `writer` and decode it.
    ///
    /// # Errors
    ///
    /// [`PayloadError::BadSignature`] or [`PayloadError::Malformed`].
    pub fn open(writer: &PublicKey, signed: &[u8]) -> Result<Self, PayloadError> {
        let body = writer
            .unsign_message(signed)
            .map_err(|_| PayloadError::BadSignature)?;
        let mut d = Decoder::new(&body, RecordTag::PointerUpdate)?;
        let update = Self {
            previous: d.opt_bytes()?.map(<[u8]>::to_vec),
            current: d.bytes()?.to_vec(),
        };
        d.finish()?;
        Ok(update)
    }
}

/// Request to delete a pointer currently holding `current`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerDelete {
    /// Hash the writer believes is current.
    pub current: Vec<u8>,
}

impl PointerDelete {
    /// Canonical body.
    ///
    /// # Errors
    ///
    /// [`FieldTooLong`](crate::CodecError::FieldTooLong) for a hash longer than `u32::MAX`.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        Ok(Encoder::new(RecordTag::PointerDelete)
            .bytes(&self.current)?
            .finish())
    }

    /// Sign with the writing key.
    ///
    /// # Errors
    ///
    /// See [`PointerDelete::encode`].
    pub fn sign(&self, keypair: &KeyPair) -> CodecResult<Vec<u8>> {
        Ok(keypair.sign_message(&self.encode()?))
    }

    /// Verify `signed` against `writer` and decode it.
    ///
    /// # Errors
    ///
    /// [`PayloadError::BadSignature`] or [`PayloadError::Malformed`].
    pub fn open(writer: &PublicKey, signed: &[u8]) -> Result<Self, PayloadError> {
        let body = writer
            .unsign_message(signed)
            .map_err(|_| PayloadError::BadSignature)?;
        let mut d = Decoder::new(&body, RecordTag::PointerDelete)?;
        let current = d.bytes()?.to_vec();
        d.finish()?;
        Ok(Self { current })
    }
}
