//! Mirror Sidecar
//!
//! Fire-and-forget mirroring of tier-2 entries to durable storage: one file
//! per cache key, JSON-serialized, optionally gzip-compressed.
//!
//! Callers submit jobs on an unbounded channel and never wait for disk I/O.
//! A single worker task drains the queue and applies jobs strictly in
//! submission order, so a delete submitted after a write for the same key
//! always lands last. Failures are logged and dropped; they never reach the
//! in-memory path and are never retried. The mirror exists only so a restart
//! can repopulate the warm tier - it is not a read path.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::CacheEntry;

// == Mirror Record ==
/// The on-disk shape: the serialized entry plus the original key.
///
/// The filename transform is lossy (every character outside `[A-Za-z0-9_-]`
/// collapses to `_`), so the key itself rides along in the record to make
/// restart recovery possible.
#[derive(Debug, Serialize, Deserialize)]
pub struct MirrorRecord {
    pub key: String,
    #[serde(flatten)]
    pub entry: CacheEntry,
}

// == Mirror Job ==
#[derive(Debug)]
enum MirrorJob {
    Store { path: PathBuf, bytes: Vec<u8> },
    Remove { path: PathBuf },
    Clear,
    Sync(oneshot::Sender<()>),
}

// == Path Transform ==
/// Derives the mirror file path for a cache key.
///
/// Every character outside `[A-Za-z0-9_-]` becomes `_`; the suffix is
/// `.json`, or `.json.gz` when compression is on.
pub fn storage_path(dir: &Path, key: &str, compression: bool) -> PathBuf {
    let safe: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let suffix = if compression { ".json.gz" } else { ".json" };
    dir.join(format!("{}{}", safe, suffix))
}

// == Mirror Writer ==
/// Handle to the mirror worker task.
///
/// Dropping the last handle closes the queue; the worker finishes the jobs
/// already submitted and exits.
#[derive(Debug)]
pub struct MirrorWriter {
    tx: mpsc::UnboundedSender<MirrorJob>,
    dir: PathBuf,
    compression: bool,
    _worker: JoinHandle<()>,
}

impl MirrorWriter {
    // == Spawn ==
    /// Starts the worker task writing into `dir`.
    pub fn spawn(dir: PathBuf, compression: bool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker_dir = dir.clone();
        let worker = tokio::spawn(run_worker(worker_dir, rx));
        Self {
            tx,
            dir,
            compression,
            _worker: worker,
        }
    }

    // == Store ==
    /// Schedules a durable write of `record`. Never blocks, never fails the
    /// caller: serialization or submission problems are logged and dropped.
    pub fn store(&self, record: &MirrorRecord) {
        let bytes = match serde_json::to_vec(record) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %record.key, error = %e, "mirror: failed to serialize record");
                return;
            }
        };
        let bytes = if self.compression {
            match gzip(&bytes) {
                Ok(compressed) => compressed,
                Err(e) => {
                    warn!(key = %record.key, error = %e, "mirror: gzip failed");
                    return;
                }
            }
        } else {
            bytes
        };
        let path = storage_path(&self.dir, &record.key, self.compression);
        self.submit(MirrorJob::Store { path, bytes });
    }

    // == Remove ==
    /// Schedules removal of the durable record for `key`. A record that does
    /// not exist on disk is treated as already removed.
    pub fn remove(&self, key: &str) {
        let path = storage_path(&self.dir, key, self.compression);
        self.submit(MirrorJob::Remove { path });
    }

    // == Clear ==
    /// Schedules removal of every mirror record in the storage directory.
    pub fn clear(&self) {
        self.submit(MirrorJob::Clear);
    }

    // == Flush ==
    /// Returns a receiver that resolves once every job submitted before this
    /// call has been applied. Used by tests and shutdown paths that want the
    /// mirror quiesced.
    pub fn flush(&self) -> oneshot::Receiver<()> {
        let (ack, rx) = oneshot::channel();
        self.submit(MirrorJob::Sync(ack));
        rx
    }

    fn submit(&self, job: MirrorJob) {
        if self.tx.send(job).is_err() {
            warn!("mirror: worker is gone, dropping job");
        }
    }
}

// == Worker ==
async fn run_worker(dir: PathBuf, mut rx: mpsc::UnboundedReceiver<MirrorJob>) {
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        warn!(dir = %dir.display(), error = %e, "mirror: failed to create storage dir");
    }

    while let Some(job) = rx.recv().await {
        match job {
            MirrorJob::Store { path, bytes } => {
                if let Err(e) = tokio::fs::write(&path, &bytes).await {
                    warn!(path = %path.display(), error = %e, "mirror: write failed");
                }
            }
            MirrorJob::Remove { path } => {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {}
                    // Already absent counts as removed
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "mirror: remove failed");
                    }
                }
            }
            MirrorJob::Clear => {
                clear_dir(&dir).await;
            }
            MirrorJob::Sync(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!(dir = %dir.display(), "mirror: worker stopped");
}

async fn clear_dir(dir: &Path) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "mirror: clear scan failed");
            return;
        }
    };
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "mirror: clear iteration failed");
                break;
            }
        };
        let path = entry.path();
        if !is_mirror_file(&path) {
            continue;
        }
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "mirror: clear remove failed");
            }
        }
    }
}

fn is_mirror_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    name.ends_with(".json") || name.ends_with(".json.gz")
}

// == Recovery Scan ==
/// Loads every readable mirror record from `dir`, for repopulating the warm
/// tier after a restart. Undecodable records are logged, deleted best-effort
/// and skipped; the scan itself never fails the caller.
pub async fn load_mirror(dir: &Path, compression: bool) -> Vec<MirrorRecord> {
    let mut records = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return records,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "mirror: recovery scan failed");
            return records;
        }
    };

    let suffix = if compression { ".json.gz" } else { ".json" };
    while let Ok(Some(dir_entry)) = entries.next_entry().await {
        let path = dir_entry.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if !name.ends_with(suffix) {
            continue;
        }

        match read_record(&path, compression).await {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "mirror: dropping unreadable record");
                let _ = tokio::fs::remove_file(&path).await;
            }
        }
    }
    records
}

async fn read_record(path: &Path, compression: bool) -> std::io::Result<MirrorRecord> {
    let bytes = tokio::fs::read(path).await?;
    let bytes = if compression { gunzip(&bytes)? } else { bytes };
    serde_json::from_slice(&bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

// == Gzip Helpers ==
fn gzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn gunzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
