//! Persistence Module
//!
//! Best-effort asynchronous mirroring of warm-tier entries to disk.

mod sidecar;

pub use sidecar::{load_mirror, storage_path, MirrorRecord, MirrorWriter};
