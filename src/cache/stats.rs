//! Cache Statistics Module
//!
//! Per-tier performance counters, the aggregated cache-wide view, and the
//! derived health assessment.

use serde::Serialize;

// == Tier Stats ==
/// Performance counters for a single cache tier.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TierStats {
    /// Number of successful retrievals
    pub hits: u64,
    /// Number of failed retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries evicted due to capacity pressure
    pub evictions: u64,
    /// Current number of entries in the tier
    pub size: usize,
    /// Configured maximum number of entries
    pub max_size: usize,
}

impl TierStats {
    // == Constructor ==
    /// Creates counters at zero for a tier of the given capacity.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            ..Default::default()
        }
    }

    // == Hit Rate ==
    /// Hit rate as a percentage: hits / (hits + misses) * 100,
    /// or 0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }

    // == Record Hit ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Eviction ==
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Reset ==
    /// Zeroes every counter, keeping the configured capacity.
    pub fn reset(&mut self) {
        let max_size = self.max_size;
        *self = Self::new(max_size);
    }
}

// == Overall Stats ==
/// Cache-wide counters aggregated across both tiers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverallStats {
    /// Tier-1 hits plus coordinator-level tier-2 hits
    pub total_hits: u64,
    /// Tier-1 misses plus coordinator-level tier-2 misses
    pub total_misses: u64,
    /// Evictions across both tiers
    pub total_evictions: u64,
    /// Overall hit rate as a percentage
    pub hit_rate: f64,
    /// Seconds since the cache was constructed
    pub uptime_secs: u64,
}

// == Cache Stats ==
/// Full statistics snapshot: per-tier counters plus the aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub tier1: TierStats,
    pub tier2: TierStats,
    pub overall: OverallStats,
}

// == Tier Status ==
/// Capacity verdict for a single tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TierStatus {
    /// Below 90% of capacity
    Ok,
    /// At or above 90% of capacity
    Full,
    /// Tier is not configured
    Disabled,
}

impl TierStatus {
    /// Derives the verdict from a tier's fill level.
    pub fn from_fill(size: usize, max_size: usize) -> Self {
        if size as f64 >= 0.9 * max_size as f64 {
            TierStatus::Full
        } else {
            TierStatus::Ok
        }
    }
}

// == Health Status ==
/// Overall health verdict, escalating with the number of issues found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No issues
    Healthy,
    /// One or two issues
    Degraded,
    /// Three or more issues
    Unhealthy,
}

impl HealthStatus {
    pub fn from_issue_count(count: usize) -> Self {
        match count {
            0 => HealthStatus::Healthy,
            1 | 2 => HealthStatus::Degraded,
            _ => HealthStatus::Unhealthy,
        }
    }
}

// == Cache Health ==
/// Derived health assessment for the whole cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub status: HealthStatus,
    pub tier1_status: TierStatus,
    pub tier2_status: TierStatus,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}
