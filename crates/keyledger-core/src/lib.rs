//! Keyledger Core - key-link chains and the rules that govern them.
//!
//! A username is bound to a chain of [`KeyLink`]s. Each link is signed by
//! the key it names; each rotation is proven by the outgoing key and
//! accepted by the incoming one. This crate holds everything needed to
//! judge chains without any storage:
//!
//! - [`validate`]: structural and signature checks on a chain
//! - [`merge`]: classify and check a proposed tail against a stored chain
//! - [`TofuKeyStore`]: client-side pinning built on the same two functions
//! - [`CoreNode`] / [`MutablePointers`]: the service traits the ledger
//!   implements
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use keyledger_core::{Claim, KeyLink, UpdateKind, merge};
//! use keyledger_crypto::KeyPair;
//!
//! let key = KeyPair::generate();
//! let genesis = KeyLink::sign(
//!     &key,
//!     &Claim {
//!         username: "alice".into(),
//!         index: 0,
//!         expiry: Utc::now() + Duration::days(365),
//!         predecessor: None,
//!     },
//! )
//! .unwrap();
//!
//! let merged = merge(&[], &[genesis], "alice", 2).unwrap();
//! assert_eq!(merged.kind, UpdateKind::Register);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod codec;
pub mod error;
pub mod merge;
pub mod validate;

mod link;
mod node;
mod pointer;
mod tofu;
mod username;

pub use error::{
    ChainError, ChainResult, CodecError, CodecResult, MergeError, MergeResult, NodeError,
    NodeResult, PayloadError, TofuError, TofuResult, UsernameError,
};
pub use link::{Claim, KeyLink, decode_chain, encode_chain, key_change_body};
pub use merge::{DEFAULT_MAX_TAIL_LEN, Merged, UpdateKind, catch_up, merge};
pub use node::{CoreNode, MutablePointers};
pub use pointer::{PointerDelete, PointerUpdate};
pub use tofu::{TofuCoreNode, TofuKeyStore};
pub use username::validate_username;
pub use validate::{validate, validate_tail};
