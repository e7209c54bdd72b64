//! Shared counter store.

use dashmap::DashMap;

use super::counter::{CounterEntry, Decision};
use super::key::StoreKey;
use super::rules::RateLimitConfig;

/// In-memory map from store key to its current window.
///
/// The store is owned by whoever constructs it and is shared by reference
/// (usually through an `Arc`) between the limiter and the sweeper. Each
/// check holds the shard lock for its key across the whole
/// read-expire-count sequence, so concurrent checks on one key never lose
/// an increment while checks on other shards proceed in parallel.
#[derive(Debug, Default)]
pub struct CounterStore {
    entries: DashMap<StoreKey, CounterEntry>,
}

impl CounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one fixed-window check for `key` at time `now`.
    ///
    /// Returns the decision and whether a fresh window was opened.
    pub fn check(&self, key: StoreKey, config: &RateLimitConfig, now: u64) -> (Decision, bool) {
        let mut opened = false;
        let mut entry = self.entries.entry(key).or_insert_with(|| {
            opened = true;
            CounterEntry::new(now, config.window_ms)
        });

        if entry.is_expired(now) {
            *entry = CounterEntry::new(now, config.window_ms);
            opened = true;
        }

        (entry.record(config), opened)
    }

    /// Current entry for `key`, if any.
    pub fn get(&self, key: &StoreKey) -> Option<CounterEntry> {
        self.entries.get(key).map(|entry| *entry)
    }

    /// Insert an entry directly, replacing any existing one.
    pub fn insert(&self, key: StoreKey, entry: CounterEntry) {
        self.entries.insert(key, entry);
    }

    /// Remove every entry whose window has passed at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_expired(&self, now: u64) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let expired = entry.is_expired(now);
            if expired {
                removed += 1;
            }
            !expired
        });
        removed
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
