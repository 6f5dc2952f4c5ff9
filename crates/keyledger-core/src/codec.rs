//! Canonical binary encoding for ledger records.
//!
//! Every record starts with a one-byte [`RecordTag`], followed by fixed-width
//! little-endian integers and `u32`-length-prefixed byte fields. The same
//! bytes are what gets signed, so encoding must be deterministic.

use chrono::{DateTime, Utc};
use keyledger_crypto::{PUBLIC_KEY_LENGTH, PublicKey};

use crate::error::{CodecError, CodecResult};

/// The closed set of record kinds the ledger persists or signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordTag {
    /// Body of a link claim.
    Claim = 1,
    /// Body of a key-change proof.
    KeyChange = 2,
    /// A full key link.
    Link = 3,
    /// A sequence of key links.
    Chain = 4,
    /// Body of a signed pointer update.
    PointerUpdate = 5,
    /// Body of a signed pointer delete.
    PointerDelete = 6,
    /// A stored chain head (length and digest).
    ChainHead = 7,
    /// A stored follow-request mailbox.
    Mailbox = 8,
}

/// A length or count as its `u32` prefix.
///
/// # Errors
///
/// [`CodecError::FieldTooLong`] if `len` does not fit.
pub fn length_prefix(len: usize) -> CodecResult<[u8; 4]> {
    u32::try_from(len)
        .map(u32::to_le_bytes)
        .map_err(|_| CodecError::FieldTooLong { len })
}

/// Append `bytes` with a 4-byte little-endian length prefix.
///
/// # Errors
///
/// [`CodecError::FieldTooLong`] if `bytes` is longer than `u32::MAX`.
pub fn write_length_prefixed(out: &mut Vec<u8>, bytes: &[u8]) -> CodecResult<()> {
    out.extend_from_slice(&length_prefix(bytes.len())?);
    out.extend_from_slice(bytes);
    Ok(())
}

/// Builder for one tagged record.
#[derive(Debug)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Start a record of the given kind.
    #[must_use]
    pub fn new(tag: RecordTag) -> Self {
        Self {
            buf: vec![tag as u8],
        }
    }

    /// Append a `u32`.
    #[must_use]
    pub fn u32(mut self, value: u32) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Append an `i64`.
    #[must_use]
    pub fn i64(mut self, value: i64) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Append a timestamp as whole seconds since the epoch.
    #[must_use]
    pub fn timestamp(self, value: DateTime<Utc>) -> Self {
        self.i64(value.timestamp())
    }

    /// Append an element count.
    ///
    /// # Errors
    ///
    /// [`CodecError::FieldTooLong`] if `count` does not fit in a `u32`.
    pub fn count(mut self, count: usize) -> CodecResult<Self> {
        self.buf.extend_from_slice(&length_prefix(count)?);
        Ok(self)
    }

    /// Append a length-prefixed byte field.
    ///
    /// # Errors
    ///
    /// [`CodecError::FieldTooLong`] if `value` is longer than `u32::MAX`.
    pub fn bytes(mut self, value: &[u8]) -> CodecResult<Self> {
        write_length_prefixed(&mut self.buf, value)?;
        Ok(self)
    }

    /// Append a length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bytes`].
    pub fn str(self, value: &str) -> CodecResult<Self> {
        self.bytes(value.as_bytes())
    }

    /// Append a raw 32-byte public key.
    #[must_use]
    pub fn key(mut self, key: &PublicKey) -> Self {
        self.buf.extend_from_slice(key.as_bytes());
        self
    }

    /// Append a presence flag and, if present, the key.
    #[must_use]
    pub fn opt_key(mut self, key: Option<&PublicKey>) -> Self {
        match key {
            Some(k) => {
                self.buf.push(1);
                self.key(k)
            },
            None => {
                self.buf.push(0);
                self
            },
        }
    }

    /// Append a presence flag and, if present, a length-prefixed field.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bytes`].
    pub fn opt_bytes(mut self, value: Option<&[u8]>) -> CodecResult<Self> {
        match value {
            Some(v) => {
                self.buf.push(1);
                self.bytes(v)
            },
            None => {
                self.buf.push(0);
                Ok(self)
            },
        }
    }

    /// Finish and return the encoded record.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Reader for one tagged record.
#[derive(Debug)]
pub struct Decoder<'a> {
    rest: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Open `input`, requiring it to start with `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] on empty input and
    /// [`CodecError::UnexpectedTag`] for any other record kind.
    pub fn new(input: &'a [u8], tag: RecordTag) -> CodecResult<Self> {
        let mut decoder = Self { rest: input };
        let found = decoder.take(1)?[0];
        if found != tag as u8 {
            return Err(CodecError::UnexpectedTag {
                expected: tag as u8,
                found,
            });
        }
        Ok(decoder)
    }

    /// Open `input` with no leading tag, for length-prefixed lists exchanged
    /// with clients.
    #[must_use]
    pub fn untagged(input: &'a [u8]) -> Self {
        Self { rest: input }
    }

    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.rest.len() < n {
            return Err(CodecError::Truncated {
                needed: n,
                remaining: self.rest.len(),
            });
        }
        let (head, tail) = self.rest.split_at(n);
        self.rest = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] if fewer than 4 bytes remain.
    pub fn u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    /// Read an `i64`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] if fewer than 8 bytes remain.
    pub fn i64(&mut self) -> CodecResult<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    /// Read a timestamp written by [`Encoder::timestamp`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidTimestamp`] if out of range.
    pub fn timestamp(&mut self) -> CodecResult<DateTime<Utc>> {
        let secs = self.i64()?;
        DateTime::from_timestamp(secs, 0).ok_or(CodecError::InvalidTimestamp(secs))
    }

    /// Read a length-prefixed byte field.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] if the field overruns the input.
    pub fn bytes(&mut self) -> CodecResult<&'a [u8]> {
        let len = usize::try_from(self.u32()?).map_err(|_| CodecError::Truncated {
            needed: usize::MAX,
            remaining: self.rest.len(),
        })?;
        self.take(len)
    }

    /// Read a length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidUtf8`] if the bytes are not UTF-8.
    pub fn string(&mut self) -> CodecResult<String> {
        let raw = self.bytes()?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    /// Read a raw 32-byte public key.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] if fewer than 32 bytes remain.
    pub fn key(&mut self) -> CodecResult<PublicKey> {
        Ok(PublicKey::from_bytes(self.array::<PUBLIC_KEY_LENGTH>()?))
    }

    fn flag(&mut self) -> CodecResult<bool> {
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidFlag(other)),
        }
    }

    /// Read an optional key written by [`Encoder::opt_key`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidFlag`] on a bad presence byte.
    pub fn opt_key(&mut self) -> CodecResult<Option<PublicKey>> {
        if self.flag()? {
            self.key().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Read an optional field written by [`Encoder::opt_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidFlag`] on a bad presence byte.
    pub fn opt_bytes(&mut self) -> CodecResult<Option<&'a [u8]>> {
        if self.flag()? {
            self.bytes().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Require that the whole input was consumed.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TrailingBytes`] if anything is left.
    pub fn finish(self) -> CodecResult<()> {
        if self.rest.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes {
                count: self.rest.len(),
            })
        }
    }
}
