//! Reader Registry & Writer Lock.
//!
//! Tracks long-lived readers (each pinned to an epoch via
//! `withSnapshot`) so compaction/GC never reclaims a page a live reader
//! still depends on, and enforces the single-writer invariant via an
//! exclusive `*.lock` file.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{trace, warn};

#[derive(Debug, Error)]
pub enum ReaderRegistryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid reader record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database is locked by another writer")]
    Locked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderRecord {
    pub pid: u32,
    pub pinned_epoch: u64,
    pub timestamp: u64,
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn pid_is_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

/// Directory of per-reader pin records plus the registry's own
/// stale-entry reclaim policy.
pub struct ReaderRegistry {
    dir: PathBuf,
    timeout: Duration,
}

impl ReaderRegistry {
    pub fn open(dir: impl AsRef<Path>, timeout: Duration) -> Result<Self, ReaderRegistryError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(ReaderRegistry { dir, timeout })
    }

    fn path_for(&self, pid: u32) -> PathBuf {
        self.dir.join(format!("{pid}.json"))
    }

    /// Register (or update) this process's pin at `epoch`.
    pub fn pin(&self, epoch: u64) -> Result<(), ReaderRegistryError> {
        let record = ReaderRecord {
            pid: process::id(),
            pinned_epoch: epoch,
            timestamp: now_unix(),
        };
        let path = self.path_for(record.pid);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&record)?)?;
        fs::rename(&tmp, &path)?;
        trace!(pid = record.pid, epoch, "readers: pinned");
        Ok(())
    }

    /// Unregister this process's pin.
    pub fn unpin(&self) -> Result<(), ReaderRegistryError> {
        let path = self.path_for(process::id());
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// The minimum epoch any live, non-stale reader is pinned to, or
    /// `None` if there are no live readers. Compaction/GC must not
    /// reclaim anything newer-than-or-equal to this epoch.
    pub fn min_pinned_epoch(&self) -> Result<Option<u64>, ReaderRegistryError> {
        let mut min = None;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = match fs::read(entry.path()) {
                Ok(b) => b,
                Err(_) => continue,
            };
            let record: ReaderRecord = match serde_json::from_slice(&bytes) {
                Ok(r) => r,
                Err(_) => continue,
            };
            if self.is_stale(&record) {
                continue;
            }
            min = Some(min.map_or(record.pinned_epoch, |m: u64| m.min(record.pinned_epoch)));
        }
        Ok(min)
    }

    fn is_stale(&self, record: &ReaderRecord) -> bool {
        if !pid_is_alive(record.pid) {
            return true;
        }
        let age = now_unix().saturating_sub(record.timestamp);
        age > self.timeout.as_secs()
    }

    /// Remove every stale entry, returning how many were reclaimed.
    pub fn reclaim_stale(&self) -> Result<usize, ReaderRegistryError> {
        let mut reclaimed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = match fs::read(entry.path()) {
                Ok(b) => b,
                Err(_) => continue,
            };
            let record: ReaderRecord = match serde_json::from_slice(&bytes) {
                Ok(r) => r,
                Err(_) => continue,
            };
            if self.is_stale(&record) {
                warn!(pid = record.pid, "readers: reclaiming stale reader entry");
                let _ = fs::remove_file(entry.path());
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }
}

/// Exclusive writer lock backed by a `*.lock` file.
///
/// `enable_lock = false` is only honored when no lock file is present;
/// if one exists, `acquire` still fails with `ReaderRegistryError::Locked`
/// rather than silently guessing whether the existing lock is stale —
/// an explicit `repair`/manual cleanup is required instead.
pub struct WriterLock {
    path: PathBuf,
    _file: Option<File>,
}

impl WriterLock {
    pub fn acquire(path: impl AsRef<Path>, enable_lock: bool) -> Result<Self, ReaderRegistryError> {
        let path = path.as_ref().to_path_buf();
        if !enable_lock {
            if path.exists() {
                return Err(ReaderRegistryError::Locked);
            }
            return Ok(WriterLock { path, _file: None });
        }
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    ReaderRegistryError::Locked
                } else {
                    ReaderRegistryError::Io(e)
                }
            })?;
        Ok(WriterLock {
            path,
            _file: Some(file),
        })
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if self._file.is_some() {
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn pin_then_min_epoch_reflects_self() {
        let dir = TempDir::new().unwrap();
        let reg = ReaderRegistry::open(dir.path(), Duration::from_secs(60)).unwrap();
        reg.pin(42).unwrap();
        assert_eq!(reg.min_pinned_epoch().unwrap(), Some(42));
        reg.unpin().unwrap();
        assert_eq!(reg.min_pinned_epoch().unwrap(), None);
    }

    #[test]
    fn second_lock_acquisition_fails() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("test.synapsedb.lock");
        let _first = WriterLock::acquire(&lock_path, true).unwrap();
        let second = WriterLock::acquire(&lock_path, true);
        assert!(matches!(second, Err(ReaderRegistryError::Locked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("test.synapsedb.lock");
        {
            let _lock = WriterLock::acquire(&lock_path, true).unwrap();
        }
        let second = WriterLock::acquire(&lock_path, true);
        assert!(second.is_ok());
    }

    #[test]
    fn disabled_lock_rejects_existing_lock_file() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("test.synapsedb.lock");
        fs::write(&lock_path, b"").unwrap();
        let result = WriterLock::acquire(&lock_path, false);
        assert!(matches!(result, Err(ReaderRegistryError::Locked)));
    }
}
