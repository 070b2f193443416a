//! Cache Entry Module
//!
//! Defines the structure stored in both tiers, with TTL and access metadata.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A single cache entry: the payload plus the metadata both tiers need.
///
/// The same shape is serialized verbatim into the tier-2 disk mirror, so it
/// derives `Serialize`/`Deserialize` and keeps its timestamps as plain unix
/// milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Number of successful reads of this entry
    pub access_count: u64,
    /// Timestamp of the last successful read (Unix milliseconds);
    /// the tier-2 eviction key
    pub last_accessed_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl_secs` from now.
    pub fn new(value: Value, ttl_secs: u64) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl_secs * 1000,
            access_count: 0,
            last_accessed_at: now,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired when the current time is
    /// greater than or equal to the expiration time, so the instant the TTL
    /// elapses the entry reads as absent.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }

    // == Touch ==
    /// Records a successful read: bumps the access count and refreshes the
    /// last-accessed timestamp.
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = current_timestamp_ms();
    }

    // == Refresh ==
    /// Replaces the value and restarts the TTL window in place, preserving
    /// `created_at` and the access history. Used when `set` hits an existing
    /// key: semantically an update, not a delete plus reinsert.
    pub fn refresh(&mut self, value: Value, ttl_secs: u64) {
        let now = current_timestamp_ms();
        self.value = value;
        self.expires_at = now + ttl_secs * 1000;
        self.last_accessed_at = now;
    }

    /// Remaining TTL in milliseconds; 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
