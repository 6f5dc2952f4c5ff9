//! Keyledger Ledger - the authoritative identity ledger.
//!
//! [`Ledger`] persists username chains in a [`KvStore`](keyledger_storage::KvStore)
//! and implements [`CoreNode`](keyledger_core::CoreNode) and
//! [`MutablePointers`](keyledger_core::MutablePointers):
//!
//! - chain updates are validated and merged by `keyledger-core`, then
//!   committed as one batch guarded on the chain head they were decided
//!   against
//! - a key may be bound by at most one link across the whole ledger
//! - the gzipped username listing is served from an injected
//!   [`UsernameCache`]
//! - follow-request mailboxes are bounded per recipient
//! - metadata pointers are compare-and-swap on the writer's signed update

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cache;
mod error;
mod ledger;
mod listing;
mod mailbox;
mod node;
mod pointers;
mod schema;

pub use cache::{TtlCache, UsernameCache};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{Ledger, LedgerLimits};
pub use listing::{decode_username_set, encode_username_set};

/// Decode the `u32`-count, length-prefixed list returned by
/// [`Ledger::follow_requests`].
///
/// # Errors
///
/// Returns a [`CodecError`](keyledger_core::CodecError) on malformed input.
pub fn decode_follow_requests(bytes: &[u8]) -> keyledger_core::CodecResult<Vec<Vec<u8>>> {
    schema::decode_list(bytes)
}
