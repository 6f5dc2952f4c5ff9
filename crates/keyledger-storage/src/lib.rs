//! Keyledger Storage - namespaced key-value persistence.
//!
//! Every ledger record lives in a [`KvStore`] under a namespace such as
//! `ledger:links` or `mutable:pointers`. Writes only happen through a
//! [`WriteBatch`]: guard preconditions plus puts and deletes that either
//! all land or none do. The ledger builds its
//! compare-and-swap semantics on top of that single primitive.
//!
//! # Backends
//!
//! - [`MemoryKvStore`] (always available): tests and ephemeral servers
//! - `SurrealKvStore` (behind the **`kv`** feature): embedded, persistent
//!   `SurrealKV` tree

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, MemoryKvStore, WriteBatch};

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;
