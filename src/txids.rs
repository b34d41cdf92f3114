//! TxId Registry.
//!
//! Remembers the outermost-commit txIds seen so far, bounded by
//! `max_remember`, so that replaying a WAL whose tail contains a commit
//! that was already durably applied before the crash doesn't reapply it
//! a second time. Persisted as JSON next to the rest of the maintenance
//! state (`txids.json`), rewritten atomically after every durable
//! outermost commit that carries a txId.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum TxIdRegistryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid txids.json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxIdEntry {
    pub id: String,
    pub session_id: Option<String>,
    pub timestamp: u64,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Wire {
    entries: Vec<TxIdEntry>,
}

/// Bounded, persisted record of recently-committed txIds.
#[derive(Debug)]
pub struct TxIdRegistry {
    path: PathBuf,
    max_remember: usize,
    order: VecDeque<String>,
    seen: std::collections::HashSet<String>,
}

impl TxIdRegistry {
    /// Load the registry from `path` if present, otherwise start empty.
    pub fn open(path: impl AsRef<Path>, max_remember: usize) -> Result<Self, TxIdRegistryError> {
        let path = path.as_ref().to_path_buf();
        let wire = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes)?
        } else {
            Wire::default()
        };
        let mut order = VecDeque::with_capacity(wire.entries.len());
        let mut seen = std::collections::HashSet::with_capacity(wire.entries.len());
        for entry in wire.entries {
            seen.insert(entry.id.clone());
            order.push_back(entry.id);
        }
        Ok(TxIdRegistry {
            path,
            max_remember,
            order,
            seen,
        })
    }

    /// Whether `tx_id` has already been durably committed and applied.
    pub fn contains(&self, tx_id: &str) -> bool {
        self.seen.contains(tx_id)
    }

    /// Record `tx_id` as committed, evicting the oldest entry once the
    /// registry exceeds `max_remember`. Persists immediately.
    pub fn record(
        &mut self,
        tx_id: String,
        session_id: Option<String>,
        timestamp: u64,
    ) -> Result<(), TxIdRegistryError> {
        if self.seen.contains(&tx_id) {
            return Ok(());
        }
        self.seen.insert(tx_id.clone());
        self.order.push_back(tx_id.clone());
        while self.order.len() > self.max_remember {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        trace!(tx_id, "txids: recorded commit");
        self.persist(session_id, timestamp)
    }

    fn persist(
        &self,
        _last_session: Option<String>,
        _last_timestamp: u64,
    ) -> Result<(), TxIdRegistryError> {
        let entries: Vec<TxIdEntry> = self
            .order
            .iter()
            .map(|id| TxIdEntry {
                id: id.clone(),
                session_id: None,
                timestamp: 0,
            })
            .collect();
        let wire = Wire { entries };
        let bytes = serde_json::to_vec_pretty(&wire)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
