//! Time-bounded cache for the bulk username listing.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;

/// Storage for one reproducible payload with an expiry.
///
/// Injected into the [`Ledger`](crate::Ledger) so tests and embedders
/// control its lifetime. Concurrent refreshes may race; the last `set`
/// wins, which is fine because every writer computed the same bytes from
/// committed state.
pub trait UsernameCache: Send + Sync {
    /// The cached bytes, if present and not expired.
    fn get(&self) -> Option<Vec<u8>>;

    /// Replace the cached bytes, fresh for `ttl`.
    fn set(&self, bytes: Vec<u8>, ttl: Duration);
}

#[derive(Debug)]
struct Entry {
    bytes: Vec<u8>,
    stored_at: Instant,
    ttl: Duration,
}

/// In-process [`UsernameCache`] driven by the tokio clock.
#[derive(Debug, Default)]
pub struct TtlCache {
    slot: RwLock<Option<Entry>>,
}

impl TtlCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached value.
    pub fn invalidate(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl UsernameCache for TtlCache {
    fn get(&self) -> Option<Vec<u8>> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .filter(|entry| entry.stored_at.elapsed() < entry.ttl)
            .map(|entry| entry.bytes.clone())
    }

    fn set(&self, bytes: Vec<u8>, ttl: Duration) {
        let entry = Entry {
            bytes,
            stored_at: Instant::now(),
            ttl,
        };
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(entry);
    }
}
