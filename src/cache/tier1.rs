//! Tier 1 Store Module
//!
//! The hot tier: a fixed-capacity map with strict O(1) LRU eviction and lazy
//! TTL expiry.

use std::collections::HashMap;

use serde_json::Value;

use crate::cache::{CacheEntry, LruList, TierStats};

// == LRU Store ==
/// Hot in-memory store combining a key map with an arena-backed recency list.
///
/// Invariants: the entry map and the recency list always hold the same key
/// set, the list head is the most recently touched live key, and the size
/// never exceeds `max_entries` (the tail is evicted immediately after an
/// insert that would overflow).
#[derive(Debug)]
pub struct LruStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Recency order, most recent first
    order: LruList,
    /// Performance counters
    stats: TierStats,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl LruStore {
    // == Constructor ==
    /// Creates a new store holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: LruList::new(),
            stats: TierStats::new(max_entries),
            max_entries,
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// An absent key is a miss. A present but expired entry is reaped in
    /// place and counted as a miss. A live entry is moved to the head of the
    /// recency order, its access metadata is refreshed, and its value is
    /// returned as a hit.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                if entry.is_expired() {
                    // Lazy expiry: reap without touching the eviction counter
                    self.entries.remove(key);
                    self.order.remove(key);
                    self.stats.record_miss();
                    return None;
                }
                entry.touch();
                let value = entry.value.clone();
                self.order.touch(key);
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores a key-value pair with the given TTL.
    ///
    /// An existing key is refreshed in place (value and expiry replaced,
    /// recency bumped) without changing the size. A new key is inserted at
    /// the head; if that pushes the store past capacity, the tail entry is
    /// evicted and counted.
    pub fn set(&mut self, key: String, value: Value, ttl_secs: u64) {
        if let Some(existing) = self.entries.get_mut(&key) {
            existing.refresh(value, ttl_secs);
            self.order.touch(&key);
            return;
        }

        self.entries.insert(key.clone(), CacheEntry::new(value, ttl_secs));
        self.order.touch(&key);

        // Capacity can only ever be exceeded by one, so a single tail
        // eviction restores the invariant.
        if self.entries.len() > self.max_entries {
            if let Some(evicted) = self.order.pop_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
            }
        }
    }

    // == Delete ==
    /// Removes an entry by key, regardless of liveness.
    ///
    /// Returns whether the key was present (an expired-but-unreaped entry
    /// counts as present).
    pub fn delete(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.remove(key);
            true
        } else {
            false
        }
    }

    // == Clear ==
    /// Empties the store and zeroes every counter.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.stats.reset();
    }

    // == Keys ==
    /// Snapshot of all indexed keys, including entries that have expired but
    /// have not been reaped yet; callers must tolerate a later `get` on a
    /// returned key resolving to a miss.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Stats ==
    /// Returns current counters with the live size filled in.
    pub fn stats(&self) -> TierStats {
        let mut stats = self.stats.clone();
        stats.size = self.entries.len();
        stats
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
