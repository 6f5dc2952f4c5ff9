//! BLAKE3 chain digests.
//!
//! The ledger stores a digest of each user's encoded chain next to the
//! links themselves; writers compare it before committing so two racing
//! updates to the same chain cannot both land.

use std::fmt;

/// A 32-byte BLAKE3 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash under a derive-key context so digests of different record
    /// kinds never collide.
    ///
    /// ```
    /// use keyledger_crypto::ContentHash;
    ///
    /// let head = ContentHash::hash_with_domain("keyledger chain head", b"links");
    /// assert_ne!(head, ContentHash::hash_with_domain("keyledger mailbox", b"links"));
    /// ```
    #[must_use]
    pub fn hash_with_domain(domain: &str, data: &[u8]) -> Self {
        Self(blake3::derive_key(domain, data))
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns `None` unless the slice is exactly 32 bytes.
    #[must_use]
    pub fn try_from_slice(slice: &[u8]) -> Option<Self> {
        slice.try_into().ok().map(Self)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", hex::encode(&self.0[..8]))
    }
}
