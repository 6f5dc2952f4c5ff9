//! Keyledger Test - shared fixtures for keyledger tests.
//!
//! Builds correctly signed genesis, rotation and refresh tails so tests can
//! focus on what the ledger does with them.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! keyledger-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust
//! use keyledger_core::{UpdateKind, merge};
//! use keyledger_test::Identity;
//!
//! let mut alice = Identity::new("alice");
//! let genesis = alice.genesis();
//! let merged = merge(&[], &genesis, "alice", 2).unwrap();
//! assert_eq!(merged.kind, UpdateKind::Register);
//!
//! let before = alice.chain().to_vec();
//! let rotation = alice.rotate();
//! assert_eq!(merge(&before, &rotation, "alice", 2).unwrap().kind, UpdateKind::Rotate);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;

pub use fixtures::*;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
