//! Shared key-to-counter storage.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use super::counter::{AdmitOutcome, CounterEntry};
use super::key::ClientKey;

/// Storage backend for per-key window counters.
///
/// Implementations must make `try_admit` atomic per key: when one
/// admission slot remains, two concurrent calls for the same key must
/// never both admit. The call is synchronous, performs no I/O, and
/// completes in bounded time.
pub trait CounterStore: Send + Sync + 'static {
    /// Count one request against `key` and decide admission.
    fn try_admit(
        &self,
        key: &ClientKey,
        max_requests: u32,
        window: Duration,
        now: Instant,
    ) -> AdmitOutcome;
}

/// In-memory fixed-window counter store.
///
/// Entries live in a sharded concurrent map: the shard lock held by the
/// `entry()` call covers the whole read-check-increment, which serializes
/// operations on the same key while letting keys on other shards proceed.
/// First insertion for a new key goes through the same path, so a brand
/// new key racing with itself still creates exactly one entry.
pub struct FixedWindowStore {
    entries: DashMap<ClientKey, CounterEntry>,
}

impl FixedWindowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Drop entries whose window has fully elapsed as of `now`.
    ///
    /// Correctness never depends on this: an expired entry is reset
    /// lazily the next time its key is seen. The sweep only bounds
    /// memory for key spaces with high churn (one-off addresses,
    /// throwaway tokens).
    pub fn sweep_expired(&self, window: Duration, now: Instant) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(window, now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Swept expired counters");
        }
    }

    /// Number of live counter entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Current count for a key, if an entry exists. Test and debug aid.
    pub fn count_for(&self, key: &ClientKey) -> Option<u32> {
        self.entries.get(key).map(|e| e.count())
    }

    /// Remove all counters.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for FixedWindowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore for FixedWindowStore {
    fn try_admit(
        &self,
        key: &ClientKey,
        max_requests: u32,
        window: Duration,
        now: Instant,
    ) -> AdmitOutcome {
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| CounterEntry::new(now));

        entry.observe(max_requests, window, now)
    }
}
