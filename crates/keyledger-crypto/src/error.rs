//! Cryptographic error types.

use thiserror::Error;

/// Errors from key handling and signed-message checks.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material of the wrong size.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// A signed message is too short to hold a signature.
    #[error("signed message truncated: {len} bytes")]
    TruncatedSignedMessage {
        /// Length of the buffer that was presented.
        len: usize,
    },

    /// The bytes are not a usable Ed25519 point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The signature does not match the body and key.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// Not a hex string.
    #[error("invalid hex encoding")]
    InvalidHexEncoding,

    /// Reading or writing a key file failed.
    #[error("key file: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
