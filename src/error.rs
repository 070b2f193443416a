//! Error types for the cache library
//!
//! Provides unified error handling using thiserror.
//!
//! A missing key is never an error: lookups return `Option`. Mirror I/O
//! failures are recovered inside the persistence layer and never reach
//! callers; the variants here cover the few operations that can actually
//! fail (construction and value serialization).

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache library.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Construction-time configuration contract violation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Value could not be converted to a JSON payload
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error surfaced outside the fire-and-forget mirror path
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache library.
pub type Result<T> = std::result::Result<T, CacheError>;
