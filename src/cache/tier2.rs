//! Tier 2 Store Module
//!
//! The warm tier: a larger map-backed store with coarse LRU-by-last-access
//! eviction and a best-effort disk mirror.
//!
//! Eviction scans for the minimum `last_accessed_at` instead of keeping a
//! linked order: the tier is large and evictions are rare relative to access
//! volume, so an O(n) scan on overflow is the simpler trade. Hits and misses
//! are counted purely against the in-memory index; the mirror is recovery
//! plumbing, never a read path.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEntry, TierStats};
use crate::persist::{MirrorRecord, MirrorWriter};

// == Secondary Store ==
/// Warm in-memory store whose entries are mirrored to durable storage.
#[derive(Debug)]
pub struct SecondaryStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Performance counters
    stats: TierStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Fire-and-forget mirror writer
    mirror: MirrorWriter,
}

impl SecondaryStore {
    // == Constructor ==
    pub fn new(max_entries: usize, mirror: MirrorWriter) -> Self {
        Self {
            entries: HashMap::new(),
            stats: TierStats::new(max_entries),
            max_entries,
            mirror,
        }
    }

    // == Get ==
    /// Retrieves a value by key, with the same lazy-expiry semantics as the
    /// hot tier. A reaped expired entry also has its mirror record removed.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                if entry.is_expired() {
                    self.entries.remove(key);
                    self.mirror.remove(key);
                    self.stats.record_miss();
                    return None;
                }
                entry.touch();
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores a key-value pair and schedules its mirror write.
    ///
    /// A new key that pushes the store past capacity triggers a scan for the
    /// entry with the smallest `last_accessed_at`; ties go to the first one
    /// encountered (iteration order is not behaviorally significant here).
    pub fn set(&mut self, key: String, value: Value, ttl_secs: u64) {
        match self.entries.get_mut(&key) {
            Some(existing) => {
                existing.refresh(value, ttl_secs);
            }
            None => {
                self.entries
                    .insert(key.clone(), CacheEntry::new(value, ttl_secs));
                if self.entries.len() > self.max_entries {
                    self.evict_coldest();
                }
            }
        }
        if let Some(entry) = self.entries.get(&key) {
            self.mirror.store(&MirrorRecord {
                key: key.clone(),
                entry: entry.clone(),
            });
        }
    }

    // == Delete ==
    /// Removes an entry by key, regardless of liveness, and schedules the
    /// mirror removal. Returns whether the key was present in the index.
    pub fn delete(&mut self, key: &str) -> bool {
        let was_present = self.entries.remove(key).is_some();
        // Mirror removal is scheduled unconditionally; an absent record on
        // disk is success, not an error.
        self.mirror.remove(key);
        was_present
    }

    // == Clear ==
    /// Empties the store, zeroes the counters and schedules removal of every
    /// mirror record.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.reset();
        self.mirror.clear();
    }

    // == Adopt ==
    /// Inserts an entry recovered from the mirror at startup, bypassing the
    /// mirror write (the record already exists on disk). Stops accepting
    /// once the store is at capacity.
    pub fn adopt(&mut self, key: String, entry: CacheEntry) {
        if self.entries.len() >= self.max_entries {
            return;
        }
        self.entries.insert(key, entry);
    }

    // == Keys ==
    /// Snapshot of all indexed keys, possibly including expired entries that
    /// have not been reaped yet.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Stats ==
    pub fn stats(&self) -> TierStats {
        let mut stats = self.stats.clone();
        stats.size = self.entries.len();
        stats
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Mirror Access ==
    /// The mirror writer, exposed for flushing in tests and shutdown paths.
    pub fn mirror(&self) -> &MirrorWriter {
        &self.mirror
    }

    // == Internal: eviction ==
    fn evict_coldest(&mut self) {
        let coldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = coldest {
            debug!(key = %key, "tier2: evicting least recently accessed entry");
            self.entries.remove(&key);
            self.mirror.remove(&key);
            self.stats.record_eviction();
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{load_mirror, storage_path};
    use serde_json::json;
    use std::path::Path;

    const TTL: u64 = 300;

    fn store_in(dir: &Path, max_entries: usize) -> SecondaryStore {
        SecondaryStore::new(max_entries, MirrorWriter::spawn(dir.to_path_buf(), false))
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path(), 100);

        store.set("key1".to_string(), json!("value1"), TTL);

        assert_eq!(store.get("key1"), Some(json!("value1")));
        assert_eq!(store.get("missing"), None);
        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_set_mirrors_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path(), 100);

        store.set("user:1".to_string(), json!({ "id": 1 }), TTL);
        let _ = store.mirror().flush().await;

        assert!(storage_path(dir.path(), "user:1", false).exists());
    }

    #[tokio::test]
    async fn test_delete_removes_mirror_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path(), 100);

        store.set("user:1".to_string(), json!(1), TTL);
        assert!(store.delete("user:1"));
        let _ = store.mirror().flush().await;

        assert_eq!(store.get("user:1"), None);
        assert!(!storage_path(dir.path(), "user:1", false).exists());
    }

    #[tokio::test]
    async fn test_delete_absent_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path(), 100);
        assert!(!store.delete("ghost"));
    }

    #[tokio::test]
    async fn test_eviction_picks_least_recently_accessed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path(), 3);

        store.set("a".to_string(), json!(1), TTL);
        store.set("b".to_string(), json!(2), TTL);
        store.set("c".to_string(), json!(3), TTL);

        // Touch a and c so b has the oldest last_accessed_at
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.get("a");
        store.get("c");

        store.set("d".to_string(), json!(4), TTL);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("b"), None);
        assert!(store.get("a").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path(), 2);

        store.set("a".to_string(), json!(1), TTL);
        store.set("b".to_string(), json!(2), TTL);
        store.set("a".to_string(), json!(10), TTL);

        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().evictions, 0);
        assert_eq!(store.get("a"), Some(json!(10)));
    }

    #[tokio::test]
    async fn test_expired_entry_is_reaped_and_unmirrored() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path(), 100);

        store.set("soon".to_string(), json!("gone"), 1);
        let _ = store.mirror().flush().await;
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        assert_eq!(store.get("soon"), None);
        assert_eq!(store.len(), 0);
        let _ = store.mirror().flush().await;
        assert!(!storage_path(dir.path(), "soon", false).exists());
    }

    #[tokio::test]
    async fn test_clear_empties_store_and_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path(), 100);

        store.set("a".to_string(), json!(1), TTL);
        store.set("b".to_string(), json!(2), TTL);
        store.get("a");
        store.clear();
        let _ = store.mirror().flush().await;

        assert_eq!(store.len(), 0);
        assert_eq!(store.stats().hits, 0);
        assert!(load_mirror(dir.path(), false).await.is_empty());
    }

    #[tokio::test]
    async fn test_adopt_respects_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path(), 2);

        store.adopt("a".to_string(), CacheEntry::new(json!(1), TTL));
        store.adopt("b".to_string(), CacheEntry::new(json!(2), TTL));
        store.adopt("c".to_string(), CacheEntry::new(json!(3), TTL));

        assert_eq!(store.len(), 2);
        assert!(store.get("a").is_some());
        assert_eq!(store.get("c"), None);
    }
}
