//! Cache Module
//!
//! Two-tier caching with TTL expiration, LRU eviction and a disk-mirrored
//! warm tier.

mod coordinator;
mod entry;
mod lru;
mod stats;
mod tier1;
mod tier2;


// Re-export public types
pub use coordinator::TieredCache;
pub use entry::CacheEntry;
pub use lru::LruList;
pub use stats::{CacheHealth, CacheStats, HealthStatus, OverallStats, TierStats, TierStatus};
pub use tier1::LruStore;
pub use tier2::SecondaryStore;
