//! Configuration Module
//!
//! Construction-time cache configuration, immutable once the cache is built.

use std::path::PathBuf;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// Supplied by the application at startup; the cache never reads the
/// environment or the command line itself.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the hot (tier-1) store
    pub tier1_max_entries: usize,
    /// Maximum number of entries in the warm (tier-2) store
    pub tier2_max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl_secs: u64,
    /// Whether the warm tier (and its disk mirror) is active
    pub tier2_enabled: bool,
    /// Directory holding the tier-2 disk mirror
    pub storage_dir: PathBuf,
    /// Gzip-compress mirror records
    pub compression: bool,
}

impl CacheConfig {
    /// Validates the configuration, rejecting values that would produce a
    /// degenerate cache (a zero-capacity tier would evict on every insert).
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidConfig`] for zero capacities or a zero
    /// default TTL.
    pub fn validate(&self) -> Result<()> {
        if self.tier1_max_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "tier1_max_entries must be greater than zero".to_string(),
            ));
        }
        if self.tier2_enabled && self.tier2_max_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "tier2_max_entries must be greater than zero".to_string(),
            ));
        }
        if self.default_ttl_secs == 0 {
            return Err(CacheError::InvalidConfig(
                "default_ttl_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tier1_max_entries: 1000,
            tier2_max_entries: 10_000,
            default_ttl_secs: 300,
            tier2_enabled: true,
            storage_dir: PathBuf::from(".cache"),
            compression: false,
        }
    }
}
