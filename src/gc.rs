//! Garbage Collection Engine.
//!
//! Two independent sweeps, both safe to run on a live store:
//!
//! - Orphaned page bytes: compaction (C14) leaves old page file content
//!   behind only implicitly (each `PageFile::rewrite` already replaces
//!   the file in place), but a crash between a manifest publish and the
//!   next page-file write can leave a page file larger than what the
//!   manifest's `lookups` actually reference, or leave filenames listed
//!   in the manifest's `orphans` list from a previous partial
//!   compaction. This sweep walks the manifest and records/removes
//!   anything unreferenced.
//! - Stale reader registry entries: delegates to
//!   [`crate::readers::ReaderRegistry::reclaim_stale`].

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::manifest::Manifest;
use crate::readers::{ReaderRegistry, ReaderRegistryError};
use crate::sixindex::Order;

#[derive(Debug, Clone, Copy, Default)]
pub struct GcReport {
    pub orphan_files_removed: usize,
    pub stale_readers_reclaimed: usize,
}

/// Remove page files under `pages_dir` that no longer correspond to any
/// order's expected filename, plus any filenames the manifest has
/// explicitly flagged as orphaned by a prior compaction pass.
pub fn collect_orphans(pages_dir: impl AsRef<Path>, manifest: &mut Manifest) -> std::io::Result<usize> {
    let pages_dir = pages_dir.as_ref();
    let expected: HashSet<String> = Order::ALL.iter().map(|o| format!("{}.pages", o.name())).collect();
    let mut removed = 0;

    for name in manifest.orphans.drain(..).collect::<Vec<_>>() {
        let path = pages_dir.join(&name);
        if path.exists() {
            fs::remove_file(&path)?;
            removed += 1;
            info!(file = %name, "gc: removed orphaned page file");
        }
    }

    if pages_dir.exists() {
        for entry in fs::read_dir(pages_dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !name.ends_with(".pages") {
                continue;
            }
            if expected.contains(&name) {
                continue;
            }
            fs::remove_file(entry.path())?;
            removed += 1;
            info!(file = %name, "gc: removed unreferenced page file");
        }
    }

    Ok(removed)
}

/// Run a full GC pass: reclaim stale reader entries, then sweep orphaned
/// page files. Order matters — reclaiming stale readers first means a
/// reader that died mid-compaction no longer blocks the orphan sweep
/// that follows it.
pub fn run(
    pages_dir: impl AsRef<Path>,
    manifest: &mut Manifest,
    readers: &ReaderRegistry,
) -> Result<GcReport, GcError> {
    let stale = readers.reclaim_stale()?;
    let orphans = collect_orphans(pages_dir, manifest)?;
    Ok(GcReport {
        orphan_files_removed: orphans,
        stale_readers_reclaimed: stale,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum GcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Readers(#[from] ReaderRegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn collect_orphans_removes_unreferenced_page_file() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("SPO.pages"), b"live").unwrap();
        fs::write(dir.path().join("STRAY.pages"), b"junk").unwrap();
        let mut manifest = Manifest::new(4096, false, 0);
        let removed = collect_orphans(dir.path(), &mut manifest).unwrap();
        assert_eq!(removed, 1);
        assert!(dir.path().join("SPO.pages").exists());
        assert!(!dir.path().join("STRAY.pages").exists());
    }

    #[test]
    fn collect_orphans_honors_manifest_orphan_list() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("SPO.pages.old"), b"junk").unwrap();
        let mut manifest = Manifest::new(4096, false, 0);
        manifest.orphans.push("SPO.pages.old".to_string());
        let removed = collect_orphans(dir.path(), &mut manifest).unwrap();
        assert_eq!(removed, 1);
        assert!(manifest.orphans.is_empty());
    }

    #[test]
    fn run_reclaims_stale_readers_and_orphans() {
        let dir = tempfile::TempDir::new().unwrap();
        let readers_dir = dir.path().join("readers");
        let readers = ReaderRegistry::open(&readers_dir, Duration::from_secs(60)).unwrap();
        fs::write(
            readers_dir.join("999999.json"),
            br#"{"pid":999999,"pinned_epoch":1,"timestamp":0}"#,
        )
        .unwrap();
        fs::write(dir.path().join("STRAY.pages"), b"junk").unwrap();
        let mut manifest = Manifest::new(4096, false, 0);
        let report = run(dir.path(), &mut manifest, &readers).unwrap();
        assert_eq!(report.stale_readers_reclaimed, 1);
        assert_eq!(report.orphan_files_removed, 1);
    }
}
