//! Tiercache - A two-tier local cache library
//!
//! Provides a hot in-memory tier with strict O(1) LRU eviction and a larger
//! warm tier mirrored to disk, with per-key TTL expiration throughout.

pub mod cache;
pub mod config;
pub mod error;
pub mod persist;

pub use cache::{CacheHealth, CacheStats, HealthStatus, TierStats, TierStatus, TieredCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
