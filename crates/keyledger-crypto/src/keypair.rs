//! Ed25519 identity keys.
//!
//! A [`KeyPair`] is the private half of an identity key: it signs link
//! claims, key-change proofs and pointer updates. A [`PublicKey`] is what
//! the ledger stores and indexes.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::signature;

/// Length in bytes of an Ed25519 public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

const SECRET_KEY_LENGTH: usize = ed25519_dalek::SECRET_KEY_LENGTH;

/// An Ed25519 signing key. `SigningKey` zeroizes its secret on drop.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuild a key pair from its 32-byte secret.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the slice is not exactly 32 bytes.
    pub fn from_secret_key(bytes: &[u8]) -> CryptoResult<Self> {
        let secret: Zeroizing<[u8; SECRET_KEY_LENGTH]> =
            Zeroizing::new(bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: SECRET_KEY_LENGTH,
                actual: bytes.len(),
            })?);
        Ok(Self {
            signing_key: SigningKey::from_bytes(&secret),
        })
    }

    /// The shareable public half.
    #[must_use]
    pub fn export_public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Attached signed message: the signature followed by `body`.
    ///
    /// Open it with [`PublicKey::unsign_message`].
    #[must_use]
    pub fn sign_message(&self, body: &[u8]) -> Vec<u8> {
        signature::attach(&self.signing_key, body)
    }

    /// Export the secret key bytes. Only for writing to secure storage.
    #[must_use]
    pub fn secret_key_bytes(&self) -> Zeroizing<[u8; SECRET_KEY_LENGTH]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    /// Load the key stored at `path`, creating the file (and its parent
    /// directories) with a fresh key when it does not exist yet.
    ///
    /// A new file is created exclusively, with mode 0o600 on Unix. An
    /// existing path that is a symlink is refused.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Io`] on I/O failure or when the path is a
    /// symlink, and [`CryptoError::InvalidKeyLength`] for a corrupt file.
    pub fn load_or_generate(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match create_key_file(path) {
            Ok(mut file) => {
                let key = Self::generate();
                file.write_all(key.secret_key_bytes().as_slice())?;
                file.sync_all()?;
                Ok(key)
            },
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Self::read_key_file(path),
            Err(e) => Err(e.into()),
        }
    }

    fn read_key_file(path: &Path) -> CryptoResult<Self> {
        if std::fs::symlink_metadata(path)?.file_type().is_symlink() {
            return Err(io::Error::other(format!("{} is a symlink", path.display())).into());
        }
        let mut bytes = Zeroizing::new(Vec::with_capacity(SECRET_KEY_LENGTH));
        File::open(path)?.read_to_end(&mut bytes)?;
        Self::from_secret_key(&bytes)
    }
}

#[cfg(unix)]
fn create_key_file(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    File::options().write(true).create_new(true).mode(0o600).open(path)
}

#[cfg(not(unix))]
fn create_key_file(path: &Path) -> io::Result<File> {
    File::options().write(true).create_new(true).open(path)
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.export_public_key().short_hex())
            .finish_non_exhaustive()
    }
}

/// An identity public key.
///
/// Ordered and hashable so it can key both the ledger's indexes and the
/// local trust store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// First 8 bytes as hex, for log lines.
    #[must_use]
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Full hex encoding. Used as the storage key for per-key records.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from hex.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidHexEncoding`] for anything but 64 hex digits.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let mut bytes = [0u8; PUBLIC_KEY_LENGTH];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| CryptoError::InvalidHexEncoding)?;
        Ok(Self(bytes))
    }

    /// Open an attached signed message and return its body.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::TruncatedSignedMessage`] when the input is
    /// shorter than a signature and
    /// [`CryptoError::SignatureVerificationFailed`] when it was not signed
    /// by this key.
    pub fn unsign_message(&self, signed: &[u8]) -> CryptoResult<Vec<u8>> {
        signature::detach(&self.0, signed).map(<[u8]>::to_vec)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.short_hex())
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
