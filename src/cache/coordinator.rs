//! Cache Coordinator Module
//!
//! Orchestrates the two tiers behind a single async API: reads check the hot
//! tier first and promote warm-tier hits, writes populate both tiers, deletes
//! and pattern deletes propagate to both, and per-tier counters roll up into
//! overall statistics and a health verdict.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::stats::OverallStats;
use crate::cache::{
    CacheHealth, CacheStats, HealthStatus, LruStore, SecondaryStore, TierStatus,
};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::persist::{load_mirror, MirrorWriter};

/// Overall-hit-rate warnings only kick in past this many accesses, so a cold
/// cache is not reported unhealthy.
const HIT_RATE_WARMUP_ACCESSES: u64 = 100;

// == Tiered Cache ==
/// Two-tier cache coordinator.
///
/// Construct one at application startup and share it (behind an `Arc`) with
/// whatever needs caching; all methods take `&self`. Each tier sits behind
/// its own `RwLock`, and the tier-2 disk mirror is written by a background
/// task that the synchronous path never waits on.
#[derive(Debug)]
pub struct TieredCache {
    config: CacheConfig,
    tier1: RwLock<LruStore>,
    tier2: Option<RwLock<SecondaryStore>>,
    /// Coordinator-level counters for warm-tier lookups, kept separate from
    /// the tier's own index counters so overall stats can attribute hits to
    /// the tier that actually served them
    tier2_hits: AtomicU64,
    tier2_misses: AtomicU64,
    started_at: Instant,
}

impl TieredCache {
    // == Constructor ==
    /// Builds the cache from a validated configuration.
    ///
    /// When tier 2 is enabled, the storage directory is scanned and surviving
    /// mirror records repopulate the warm tier (expired records are skipped).
    ///
    /// # Errors
    /// Returns [`crate::CacheError::InvalidConfig`] for zero capacities or a
    /// zero default TTL.
    pub async fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let tier1 = RwLock::new(LruStore::new(config.tier1_max_entries));

        let tier2 = if config.tier2_enabled {
            let mirror = MirrorWriter::spawn(config.storage_dir.clone(), config.compression);
            let mut store = SecondaryStore::new(config.tier2_max_entries, mirror);

            let records = load_mirror(&config.storage_dir, config.compression).await;
            let mut recovered = 0usize;
            for record in records {
                if record.entry.is_expired() {
                    continue;
                }
                store.adopt(record.key, record.entry);
                recovered += 1;
            }
            if recovered > 0 {
                info!(entries = recovered, "tier2: recovered entries from mirror");
            }
            Some(RwLock::new(store))
        } else {
            None
        };

        Ok(Self {
            config,
            tier1,
            tier2,
            tier2_hits: AtomicU64::new(0),
            tier2_misses: AtomicU64::new(0),
            started_at: Instant::now(),
        })
    }

    // == Get ==
    /// Looks up a key, checking tier 1 first and falling back to tier 2.
    ///
    /// A tier-2 hit is promoted into tier 1 with a fresh full default-TTL
    /// window (a deliberate simplification over carrying the remaining TTL).
    ///
    /// A stored JSON `null` is a genuine hit and comes back as the `null` of
    /// the requested type; only the hit/miss counters can tell it apart from
    /// a miss when `T` itself is nullable.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(value) = self.tier1.write().await.get(key) {
            return decode(key, value);
        }

        let tier2 = self.tier2.as_ref()?;
        match tier2.write().await.get(key) {
            Some(value) => {
                self.tier2_hits.fetch_add(1, Ordering::Relaxed);
                // Promote so the next read is a tier-1 hit
                self.tier1.write().await.set(
                    key.to_string(),
                    value.clone(),
                    self.config.default_ttl_secs,
                );
                decode(key, value)
            }
            None => {
                self.tier2_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    // == Set ==
    /// Stores a value in both tiers with the same effective TTL
    /// (`ttl_secs`, or the configured default when omitted).
    ///
    /// # Errors
    /// Fails only if the value cannot be represented as JSON.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: Option<u64>) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let ttl = ttl_secs.unwrap_or(self.config.default_ttl_secs);

        self.tier1
            .write()
            .await
            .set(key.to_string(), value.clone(), ttl);
        if let Some(tier2) = &self.tier2 {
            tier2.write().await.set(key.to_string(), value, ttl);
        }
        Ok(())
    }

    // == Delete ==
    /// Removes a key from both tiers.
    pub async fn delete(&self, key: &str) {
        self.tier1.write().await.delete(key);
        if let Some(tier2) = &self.tier2 {
            tier2.write().await.delete(key);
        }
    }

    // == Delete Pattern ==
    /// Removes every key matching `pattern` from both tiers.
    ///
    /// `*` matches any substring; all other characters match literally. The
    /// match is unanchored, so `user:*` removes any key *containing*
    /// `user:`, not only keys starting with it. Any pattern string is
    /// accepted; there is no validation to fail.
    pub async fn delete_pattern(&self, pattern: &str) {
        let matcher = match compile_pattern(pattern) {
            Some(matcher) => matcher,
            None => {
                warn!(pattern = %pattern, "delete_pattern: pattern did not compile, nothing deleted");
                return;
            }
        };

        let mut removed = 0usize;
        {
            let mut tier1 = self.tier1.write().await;
            for key in tier1.keys() {
                if matcher.is_match(&key) {
                    tier1.delete(&key);
                    removed += 1;
                }
            }
        }
        if let Some(tier2) = &self.tier2 {
            let mut tier2 = tier2.write().await;
            for key in tier2.keys() {
                if matcher.is_match(&key) {
                    tier2.delete(&key);
                    removed += 1;
                }
            }
        }
        debug!(pattern = %pattern, removed, "delete_pattern: done");
    }

    // == Clear ==
    /// Empties both tiers and resets every counter, including the
    /// coordinator's own warm-tier hit/miss counts.
    pub async fn clear(&self) {
        self.tier1.write().await.clear();
        if let Some(tier2) = &self.tier2 {
            tier2.write().await.clear();
        }
        self.tier2_hits.store(0, Ordering::Relaxed);
        self.tier2_misses.store(0, Ordering::Relaxed);
    }

    // == Keys ==
    /// Deduplicated union of both tiers' key snapshots. May include keys
    /// whose entries have expired but not been reaped; a later `get` on such
    /// a key resolves to `None`.
    pub async fn keys(&self) -> Vec<String> {
        let mut set: HashSet<String> = self.tier1.read().await.keys().into_iter().collect();
        if let Some(tier2) = &self.tier2 {
            set.extend(tier2.read().await.keys());
        }
        set.into_iter().collect()
    }

    // == Stats ==
    /// Per-tier counters plus the aggregated overall view.
    pub async fn stats(&self) -> CacheStats {
        let tier1 = self.tier1.read().await.stats();
        let tier2 = match &self.tier2 {
            Some(store) => store.read().await.stats(),
            None => crate::cache::TierStats::new(0),
        };

        let l2_hits = self.tier2_hits.load(Ordering::Relaxed);
        let l2_misses = self.tier2_misses.load(Ordering::Relaxed);
        let total_hits = tier1.hits + l2_hits;
        let total_misses = tier1.misses + l2_misses;
        let total_accesses = total_hits + total_misses;
        let hit_rate = if total_accesses == 0 {
            0.0
        } else {
            total_hits as f64 / total_accesses as f64 * 100.0
        };

        CacheStats {
            overall: OverallStats {
                total_hits,
                total_misses,
                total_evictions: tier1.evictions + tier2.evictions,
                hit_rate,
                uptime_secs: self.started_at.elapsed().as_secs(),
            },
            tier1,
            tier2,
        }
    }

    // == Health ==
    /// Derives the health verdict from current statistics: a tier at 90% or
    /// more of capacity reads as full, and a sub-50% overall hit rate after
    /// the warmup window raises an additional issue. Zero issues is healthy,
    /// one or two is degraded, three or more is unhealthy.
    pub async fn health(&self) -> CacheHealth {
        let stats = self.stats().await;
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        let tier1_status = TierStatus::from_fill(stats.tier1.size, stats.tier1.max_size);
        if tier1_status == TierStatus::Full {
            issues.push(format!(
                "Tier 1 is at {}/{} entries",
                stats.tier1.size, stats.tier1.max_size
            ));
            recommendations
                .push("Increase tier1_max_entries or shorten TTLs to relieve the hot tier".to_string());
        }

        let tier2_status = if self.tier2.is_some() {
            let status = TierStatus::from_fill(stats.tier2.size, stats.tier2.max_size);
            if status == TierStatus::Full {
                issues.push(format!(
                    "Tier 2 is at {}/{} entries",
                    stats.tier2.size, stats.tier2.max_size
                ));
                recommendations
                    .push("Increase tier2_max_entries or shorten TTLs to relieve the warm tier".to_string());
            }
            status
        } else {
            TierStatus::Disabled
        };

        let total_accesses = stats.overall.total_hits + stats.overall.total_misses;
        if total_accesses > HIT_RATE_WARMUP_ACCESSES && stats.overall.hit_rate < 50.0 {
            issues.push(format!(
                "Overall hit rate is {:.1}% across {} accesses",
                stats.overall.hit_rate, total_accesses
            ));
            recommendations.push(
                "Review key choice and TTLs; the workload may not be cache-friendly".to_string(),
            );
        }

        CacheHealth {
            status: HealthStatus::from_issue_count(issues.len()),
            tier1_status,
            tier2_status,
            issues,
            recommendations,
        }
    }

    // == Flush Mirror ==
    /// Waits until every mirror job submitted so far has been applied.
    /// Useful before shutdown and in tests; the regular write path never
    /// calls this.
    pub async fn flush_mirror(&self) {
        let rx = match &self.tier2 {
            Some(tier2) => tier2.read().await.mirror().flush(),
            None => return,
        };
        let _ = rx.await;
    }
}

// == Pattern Compilation ==
/// Turns a glob-like pattern into an unanchored regex: `*` becomes `.*`,
/// everything else is escaped. With everything escaped the only way
/// compilation can fail is the engine's size limit, which yields `None`.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    let translated: String = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&translated).ok()
}

// == Decode Helper ==
fn decode<T: DeserializeOwned>(key: &str, value: serde_json::Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(key = %key, error = %e, "cached value does not match requested type");
            None
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn test_config(dir: &std::path::Path) -> CacheConfig {
        CacheConfig {
            tier1_max_entries: 10,
            tier2_max_entries: 100,
            default_ttl_secs: 300,
            tier2_enabled: true,
            storage_dir: dir.to_path_buf(),
            compression: false,
        }
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            tier1_max_entries: 0,
            ..test_config(dir.path())
        };
        assert!(TieredCache::new(config).await.is_err());
    }

    #[tokio::test]
    async fn test_set_and_get_typed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();

        cache.set("num", &42u32, None).await.unwrap();
        cache.set("text", &"hello", None).await.unwrap();

        assert_eq!(cache.get::<u32>("num").await, Some(42));
        assert_eq!(cache.get::<String>("text").await, Some("hello".to_string()));
        assert_eq!(cache.get::<u32>("missing").await, None);
    }

    #[tokio::test]
    async fn test_get_type_mismatch_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();

        cache.set("text", &"not a number", None).await.unwrap();
        assert_eq!(cache.get::<u32>("text").await, None);
    }

    #[tokio::test]
    async fn test_null_value_is_a_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();

        cache.set("nil", &Value::Null, None).await.unwrap();

        assert_eq!(cache.get::<Value>("nil").await, Some(Value::Null));
        let stats = cache.stats().await;
        assert_eq!(stats.overall.total_hits, 1);
        assert_eq!(stats.overall.total_misses, 0);
    }

    #[tokio::test]
    async fn test_promotion_from_tier2() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();

        // Fill tier 1 past capacity so "old" is evicted from the hot tier
        // but still present in the roomier warm tier
        cache.set("old", &1u32, None).await.unwrap();
        for i in 0..10 {
            cache.set(&format!("fill{}", i), &i, None).await.unwrap();
        }

        let stats_before = cache.stats().await;
        assert!(stats_before.tier1.evictions >= 1);

        // First read is served by tier 2 and promotes
        assert_eq!(cache.get::<u32>("old").await, Some(1));
        let stats = cache.stats().await;
        assert_eq!(stats.tier2.hits, 1);

        // Second read is a tier-1 hit
        assert_eq!(cache.get::<u32>("old").await, Some(1));
        let stats = cache.stats().await;
        assert_eq!(stats.tier1.hits, 1);
    }

    #[tokio::test]
    async fn test_overall_stats_accounting() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            tier2_enabled: false,
            ..test_config(dir.path())
        };
        let cache = TieredCache::new(config).await.unwrap();

        cache.set("key", &"v", None).await.unwrap();
        assert!(cache.get::<String>("key").await.is_some()); // tier-1 hit
        assert!(cache.get::<String>("nope").await.is_none()); // total miss

        let stats = cache.stats().await;
        assert_eq!(stats.overall.total_hits, 1);
        assert_eq!(stats.overall.total_misses, 1);
        assert_eq!(stats.overall.hit_rate, 50.0);
    }

    #[tokio::test]
    async fn test_overall_stats_count_both_tiers_on_total_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();

        // A total miss is a tier-1 miss and a tier-2 miss, and both feed the
        // aggregate
        assert!(cache.get::<u32>("nope").await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.tier1.misses, 1);
        assert_eq!(stats.overall.total_misses, 2);
    }

    #[tokio::test]
    async fn test_delete_removes_from_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();

        cache.set("key", &1u32, None).await.unwrap();
        cache.delete("key").await;

        assert_eq!(cache.get::<u32>("key").await, None);
    }

    #[tokio::test]
    async fn test_delete_pattern_is_unanchored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();

        cache.set("user:1:profile", &1u32, None).await.unwrap();
        cache.set("user:2:profile", &2u32, None).await.unwrap();
        cache.set("task:1:details", &3u32, None).await.unwrap();
        // Contains "user:" in the middle; the unanchored match removes it too
        cache.set("admin:user:7", &4u32, None).await.unwrap();

        cache.delete_pattern("user:*").await;

        assert_eq!(cache.get::<u32>("user:1:profile").await, None);
        assert_eq!(cache.get::<u32>("user:2:profile").await, None);
        assert_eq!(cache.get::<u32>("admin:user:7").await, None);
        assert_eq!(cache.get::<u32>("task:1:details").await, Some(3));
    }

    #[tokio::test]
    async fn test_delete_pattern_literal_dots() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();

        cache.set("a.b", &1u32, None).await.unwrap();
        cache.set("axb", &2u32, None).await.unwrap();

        // '.' must match literally, not as a regex metacharacter
        cache.delete_pattern("a.b").await;

        assert_eq!(cache.get::<u32>("a.b").await, None);
        assert_eq!(cache.get::<u32>("axb").await, Some(2));
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();

        cache.set("key", &1u32, None).await.unwrap();
        let _ = cache.get::<u32>("key").await;
        let _ = cache.get::<u32>("miss").await;

        cache.clear().await;

        assert_eq!(cache.get::<u32>("key").await, None);
        let stats = cache.stats().await;
        // The post-clear lookup above is the only recorded access
        assert_eq!(stats.overall.total_hits, 0);
        assert_eq!(stats.tier1.evictions, 0);
        assert_eq!(stats.tier2.evictions, 0);
    }

    #[tokio::test]
    async fn test_keys_union_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();

        cache.set("a", &1u32, None).await.unwrap();
        cache.set("b", &2u32, None).await.unwrap();

        let mut keys = cache.keys().await;
        keys.sort();
        // Both keys live in both tiers but appear once
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_tier2_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            tier2_enabled: false,
            ..test_config(dir.path())
        };
        let cache = TieredCache::new(config).await.unwrap();

        cache.set("key", &1u32, None).await.unwrap();
        assert_eq!(cache.get::<u32>("key").await, Some(1));

        let health = cache.health().await;
        assert_eq!(health.tier2_status, TierStatus::Disabled);

        // Evicted from tier 1 means gone entirely
        for i in 0..10 {
            cache.set(&format!("fill{}", i), &i, None).await.unwrap();
        }
        assert_eq!(cache.get::<u32>("key").await, None);
    }

    #[tokio::test]
    async fn test_health_escalates_when_tier1_fills() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();

        for i in 0..9 {
            cache.set(&format!("key{}", i), &i, None).await.unwrap();
        }

        let health = cache.health().await;
        assert_eq!(health.tier1_status, TierStatus::Full);
        assert_eq!(health.status, HealthStatus::Degraded);
        assert!(!health.issues.is_empty());
        assert!(!health.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_health_low_hit_rate_needs_warmup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();

        // 50 misses: hit rate 0% but under the warmup threshold
        for i in 0..50 {
            let _ = cache.get::<u32>(&format!("cold{}", i)).await;
        }
        assert_eq!(cache.health().await.status, HealthStatus::Healthy);

        // Past the threshold the low hit rate becomes an issue
        for i in 0..60 {
            let _ = cache.get::<u32>(&format!("colder{}", i)).await;
        }
        let health = cache.health().await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert!(health.issues.iter().any(|i| i.contains("hit rate")));
    }

    #[tokio::test]
    async fn test_restart_recovery_from_mirror() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = TieredCache::new(test_config(dir.path())).await.unwrap();
            cache.set("persist:me", &json!({ "id": 9 }), None).await.unwrap();
            cache.flush_mirror().await;
        }

        // A fresh cache over the same directory sees the entry again
        let cache = TieredCache::new(test_config(dir.path())).await.unwrap();
        assert_eq!(
            cache.get::<Value>("persist:me").await,
            Some(json!({ "id": 9 }))
        );
        // Served from tier 2 (the hot tier starts empty after a restart)
        assert_eq!(cache.stats().await.tier2.hits, 1);
    }

    #[test]
    fn test_compile_pattern_translation() {
        let re = compile_pattern("user:*:profile").unwrap();
        assert!(re.is_match("user:1:profile"));
        assert!(re.is_match("xx-user:42:profile-yy")); // unanchored
        assert!(!re.is_match("user:1:settings"));

        let literal = compile_pattern("a+b").unwrap();
        assert!(literal.is_match("a+b"));
        assert!(!literal.is_match("aab"));
    }
}
