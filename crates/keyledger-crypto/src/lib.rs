//! Keyledger Crypto - signing primitives for the identity ledger.
//!
//! Every signed blob in the ledger is an attached signed message: a 64-byte
//! Ed25519 signature followed by the body it covers. A [`KeyPair`] produces
//! them and a [`PublicKey`] opens them. [`ContentHash`] is the BLAKE3 digest
//! the ledger uses as a per-chain write token.
//!
//! Servers never hold private keys. They only call
//! [`PublicKey::unsign_message`].
//!
//! ```
//! use keyledger_crypto::KeyPair;
//!
//! let keypair = KeyPair::generate();
//! let signed = keypair.sign_message(b"alice owns this key");
//!
//! let body = keypair.export_public_key().unsign_message(&signed).unwrap();
//! assert_eq!(body, b"alice owns this key");
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod hash;
mod keypair;
mod signature;

pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use keypair::{KeyPair, PUBLIC_KEY_LENGTH, PublicKey};
pub use signature::SIGNATURE_LENGTH;
