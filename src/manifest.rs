//! Manifest — JSON-encoded description of the on-disk paged index.
//!
//! Unlike the WAL and page files, the manifest's wire format is plain
//! JSON by spec, so this module leans on `serde`/`serde_json` rather than
//! the crate's hand-written binary encoding. The publish discipline
//! (write to a `.tmp` path, fsync, atomically rename over the live file)
//! matches every other durable write in the crate.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::page::PageDescriptor;
use crate::sixindex::Order;
use crate::triple::EncodedTriple;

pub const MANIFEST_FILENAME: &str = "manifest.json";
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported manifest version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionInfo {
    pub codec: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEntry {
    #[serde(rename = "primaryValue")]
    pub primary_value: u32,
    pub offset: u64,
    pub length: u64,
    #[serde(rename = "rawLength")]
    pub raw_length: u64,
    pub crc32: u32,
}

impl From<PageDescriptor> for PageEntry {
    fn from(d: PageDescriptor) -> Self {
        PageEntry {
            primary_value: d.primary_value,
            offset: d.offset,
            length: d.length,
            raw_length: d.raw_length,
            crc32: d.crc32,
        }
    }
}

impl From<PageEntry> for PageDescriptor {
    fn from(e: PageEntry) -> Self {
        PageDescriptor {
            primary_value: e.primary_value,
            offset: e.offset,
            length: e.length,
            raw_length: e.raw_length,
            crc32: e.crc32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupEntry {
    pub order: String,
    pub pages: Vec<PageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    #[serde(rename = "pageSize")]
    pub page_size: usize,
    #[serde(rename = "createdAt")]
    pub created_at: u64,
    pub compression: CompressionInfo,
    pub lookups: Vec<LookupEntry>,
    pub epoch: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tombstones: Vec<(u32, u32, u32)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orphans: Vec<String>,
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Manifest {
    pub fn new(page_size: usize, compress: bool, compression_level: u32) -> Self {
        Manifest {
            version: MANIFEST_VERSION,
            page_size,
            created_at: now_unix(),
            compression: CompressionInfo {
                codec: if compress { "brotli".to_string() } else { "none".to_string() },
                level: compress.then_some(compression_level),
            },
            lookups: Order::ALL
                .into_iter()
                .map(|o| LookupEntry {
                    order: o.name().to_string(),
                    pages: Vec::new(),
                })
                .collect(),
            epoch: 0,
            tombstones: Vec::new(),
            orphans: Vec::new(),
        }
    }

    pub fn pages_for(&self, order: Order) -> &[PageEntry] {
        self.lookups
            .iter()
            .find(|l| l.order == order.name())
            .map(|l| l.pages.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_pages_for(&mut self, order: Order, pages: Vec<PageEntry>) {
        if let Some(entry) = self.lookups.iter_mut().find(|l| l.order == order.name()) {
            entry.pages = pages;
        } else {
            self.lookups.push(LookupEntry {
                order: order.name().to_string(),
                pages,
            });
        }
    }

    pub fn tombstone_set(&self) -> std::collections::HashSet<EncodedTriple> {
        self.tombstones
            .iter()
            .map(|&(s, p, o)| EncodedTriple::new(s, p, o))
            .collect()
    }

    pub fn add_tombstone(&mut self, t: EncodedTriple) {
        let tuple = (t.s, t.p, t.o);
        if !self.tombstones.contains(&tuple) {
            self.tombstones.push(tuple);
        }
    }

    pub fn clear_tombstones(&mut self) {
        self.tombstones.clear();
    }

    /// Read the manifest at `path`, rejecting any version this crate
    /// doesn't understand.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let bytes = fs::read(path.as_ref())?;
        let manifest: Manifest = serde_json::from_slice(&bytes)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ManifestError::UnsupportedVersion(manifest.version));
        }
        Ok(manifest)
    }

    /// Atomically publish this manifest to `path`: write to a sibling
    /// `.tmp` file, fsync, then rename over the live file. The epoch is
    /// bumped unconditionally so every successful publish is observable
    /// as a distinct, monotonically increasing point in time.
    pub fn publish(&mut self, path: impl AsRef<Path>) -> Result<(), ManifestError> {
        self.epoch += 1;
        let path = path.as_ref();
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(self)?;
        {
            let mut file = File::create(&tmp)?;
            use std::io::Write;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        if let Some(parent) = path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        debug!(epoch = self.epoch, path = %path.display(), "manifest: published");
        Ok(())
    }
}

pub fn manifest_path(pages_dir: impl AsRef<Path>) -> PathBuf {
    pages_dir.as_ref().join(MANIFEST_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_bumps_epoch_and_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = manifest_path(dir.path());
        let mut manifest = Manifest::new(64 * 1024, true, 5);
        assert_eq!(manifest.epoch, 0);
        manifest.publish(&path).unwrap();
        assert_eq!(manifest.epoch, 1);

        let reopened = Manifest::open(&path).unwrap();
        assert_eq!(reopened.epoch, 1);
        assert_eq!(reopened.lookups.len(), 6);
    }

    #[test]
    fn set_and_get_pages_for_order() {
        let mut manifest = Manifest::new(4096, false, 0);
        manifest.set_pages_for(
            Order::Spo,
            vec![PageEntry {
                primary_value: 1,
                offset: 0,
                length: 12,
                raw_length: 12,
                crc32: 0xDEADBEEF,
            }],
        );
        assert_eq!(manifest.pages_for(Order::Spo).len(), 1);
        assert!(manifest.pages_for(Order::Pos).is_empty());
    }

    #[test]
    fn tombstones_are_deduplicated() {
        let mut manifest = Manifest::new(4096, false, 0);
        let t = EncodedTriple::new(1, 2, 3);
        manifest.add_tombstone(t);
        manifest.add_tombstone(t);
        assert_eq!(manifest.tombstones.len(), 1);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILENAME);
        let mut manifest = Manifest::new(4096, false, 0);
        manifest.version = 99;
        let bytes = serde_json::to_vec(&manifest).unwrap();
        fs::write(&path, bytes).unwrap();
        let result = Manifest::open(&path);
        assert!(matches!(result, Err(ManifestError::UnsupportedVersion(99))));
    }
}
