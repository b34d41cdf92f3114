//! Repair & Check.
//!
//! `check` walks every durable artifact (container header, manifest,
//! every page's crc32, the WAL's tail) without mutating anything and
//! reports what it found. `repair` fixes what `check` flags: `Full`
//! rebuilds every page file from the dictionary/triples sections plus a
//! full WAL replay; `Fast` only rewrites the pages a prior `check` named
//! as corrupt, leaving everything else untouched.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::dict::Dictionary;
use crate::header::{self, Sections};
use crate::manifest::{self, Manifest, PageEntry};
use crate::page::{self, PageFile};
use crate::sixindex::Order;
use crate::triple::{EncodedTriple, TripleStore};
use crate::wal::{TxFrameStack, Wal, WalRecord};

#[derive(Debug, thiserror::Error)]
pub enum RepairError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Header(#[from] crate::header::HeaderError),

    #[error(transparent)]
    Manifest(#[from] crate::manifest::ManifestError),

    #[error(transparent)]
    Page(#[from] crate::page::PageError),

    #[error(transparent)]
    Wal(#[from] crate::wal::WalError),

    #[error(transparent)]
    Encoding(#[from] crate::encoding::EncodingError),
}

fn container_path(base: &Path) -> PathBuf {
    base.with_extension("synapsedb")
}

fn wal_path(base: &Path) -> PathBuf {
    let mut p = base.as_os_str().to_owned();
    p.push(".synapsedb.wal");
    PathBuf::from(p)
}

fn pages_dir_path(base: &Path) -> PathBuf {
    let mut p = base.as_os_str().to_owned();
    p.push(".synapsedb.pages");
    PathBuf::from(p)
}

/// One page flagged as corrupt by [`check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BadPage {
    pub order: Order,
    pub primary_value: u32,
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub header_ok: bool,
    pub manifest_ok: bool,
    pub wal_ok: bool,
    pub wal_safe_offset: u64,
    pub wal_file_len: u64,
    pub bad_pages: Vec<BadPage>,
}

impl CheckReport {
    pub fn is_healthy(&self) -> bool {
        self.header_ok && self.manifest_ok && self.wal_ok && self.bad_pages.is_empty()
    }
}

/// Read-only integrity sweep over every durable artifact for the store
/// rooted at `base_path`.
pub fn check(base_path: impl AsRef<Path>) -> CheckReport {
    let base_path = base_path.as_ref();
    let mut report = CheckReport::default();

    report.header_ok = match header::read_storage_file(container_path(base_path)) {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "repair check: container header invalid");
            false
        }
    };

    let pages_dir = pages_dir_path(base_path);
    let manifest_path = manifest::manifest_path(&pages_dir);
    let manifest = match Manifest::open(&manifest_path) {
        Ok(m) => {
            report.manifest_ok = true;
            Some(m)
        }
        Err(e) => {
            warn!(error = %e, "repair check: manifest invalid");
            None
        }
    };

    if let Some(manifest) = &manifest {
        for order in Order::ALL {
            let Ok(page_file) = PageFile::open(&pages_dir, order) else {
                continue;
            };
            for entry in manifest.pages_for(order) {
                let descriptor: crate::page::PageDescriptor = entry.clone().into();
                let verified = page_file
                    .read_at(entry.offset, entry.length)
                    .and_then(|blob| page::read_blob(&blob, &descriptor, manifest.compression.codec == "brotli"));
                if verified.is_err() {
                    report.bad_pages.push(BadPage {
                        order,
                        primary_value: entry.primary_value,
                    });
                }
            }
        }
    }

    match Wal::replay(wal_path(base_path)) {
        Ok(result) => {
            let file_len = fs::metadata(wal_path(base_path)).map(|m| m.len()).unwrap_or(0);
            report.wal_safe_offset = result.safe_offset;
            report.wal_file_len = file_len;
            report.wal_ok = result.safe_offset == file_len;
        }
        Err(e) => {
            warn!(error = %e, "repair check: WAL replay failed");
            report.wal_ok = false;
        }
    }

    report
}

/// Rebuild the triple set from the container's dictionary/triples
/// sections plus a full, tx-frame-resolved WAL replay. This is the
/// authoritative state both repair modes rebuild pages from.
fn rebuild_triples(base_path: &Path) -> Result<(Dictionary, TripleStore), RepairError> {
    let sections = header::read_storage_file(container_path(base_path))?.unwrap_or_default();
    let mut dict = if sections.dictionary.is_empty() {
        Dictionary::new()
    } else {
        Dictionary::deserialize(&sections.dictionary)?
    };
    let mut triples = if sections.triples.is_empty() {
        TripleStore::new()
    } else {
        TripleStore::deserialize(&sections.triples)?
    };

    let replay = Wal::replay(wal_path(base_path))?;
    let resolved = TxFrameStack::resolve(replay.records)?;
    for record in resolved {
        match record {
            WalRecord::AddTriple { s, p, o } => {
                triples.add(EncodedTriple::new(
                    dict.get_or_create_id(&s),
                    dict.get_or_create_id(&p),
                    dict.get_or_create_id(&o),
                ));
            }
            WalRecord::DeleteTriple { s, p, o } => {
                if let (Some(s), Some(p), Some(o)) = (dict.get_id(&s), dict.get_id(&p), dict.get_id(&o)) {
                    triples.remove(&EncodedTriple::new(s, p, o));
                }
            }
            _ => {}
        }
    }
    Ok((dict, triples))
}

fn primary_of(order: Order, t: &EncodedTriple) -> u32 {
    match order {
        Order::Spo | Order::Sop => t.s,
        Order::Pos | Order::Pso => t.p,
        Order::Osp | Order::Ops => t.o,
    }
}

fn permute(order: Order, t: &EncodedTriple) -> (u32, u32, u32) {
    match order {
        Order::Spo => (t.s, t.p, t.o),
        Order::Sop => (t.s, t.o, t.p),
        Order::Pos => (t.p, t.o, t.s),
        Order::Pso => (t.p, t.s, t.o),
        Order::Osp => (t.o, t.s, t.p),
        Order::Ops => (t.o, t.p, t.s),
    }
}

/// Full repair: rebuild every order's page file from scratch, rewrite
/// the container's dictionary/triples sections, republish the manifest,
/// and truncate the WAL (its history is now fully checkpointed).
pub fn repair_full(base_path: impl AsRef<Path>, config: &StoreConfig) -> Result<(), RepairError> {
    let base_path = base_path.as_ref();
    let pages_dir = pages_dir_path(base_path);
    fs::create_dir_all(&pages_dir)?;

    let (dict, triples) = rebuild_triples(base_path)?;

    let mut manifest = Manifest::new(config.page_size, config.compress_pages, config.compression_level);
    for order in Order::ALL {
        let mut by_primary: std::collections::HashMap<u32, Vec<(u32, u32, u32)>> =
            std::collections::HashMap::new();
        for t in triples.list() {
            by_primary.entry(primary_of(order, t)).or_default().push(permute(order, t));
        }
        let page_file = PageFile::open(&pages_dir, order)?;
        // Start from an empty file: rewrite([]) truncates via rename.
        page_file.rewrite(Vec::new())?;
        let mut entries = Vec::with_capacity(by_primary.len());
        for (primary, mut keys) in by_primary {
            keys.sort_unstable();
            let (blob, mut descriptor) =
                page::build_blob(primary, &keys, config.compress_pages, config.compression_level)?;
            descriptor.offset = page_file.append(&blob)?;
            entries.push(descriptor);
        }
        manifest.set_pages_for(order, entries.into_iter().map(PageEntry::from).collect());
    }

    let container = container_path(base_path);
    header::write_storage_file(
        &container,
        &Sections {
            dictionary: dict.serialize()?,
            triples: triples.serialize()?,
            index_snapshot: Vec::new(),
            properties: header::read_storage_file(&container)?
                .map(|s| s.properties)
                .unwrap_or_default(),
        },
    )?;

    manifest.publish(manifest::manifest_path(&pages_dir))?;

    let mut wal = Wal::open(wal_path(base_path))?;
    wal.reset()?;

    info!(path = %base_path.display(), "repair: full rebuild complete");
    Ok(())
}

/// Fast repair: rewrite only the pages named in `bad_pages`, leaving the
/// rest of each order's page file untouched.
pub fn repair_fast(
    base_path: impl AsRef<Path>,
    config: &StoreConfig,
    bad_pages: &[BadPage],
) -> Result<(), RepairError> {
    let base_path = base_path.as_ref();
    let pages_dir = pages_dir_path(base_path);
    let manifest_path = manifest::manifest_path(&pages_dir);
    let mut manifest = Manifest::open(&manifest_path)?;
    let (_dict, triples) = rebuild_triples(base_path)?;

    let mut by_order: std::collections::HashMap<Order, HashSet<u32>> = std::collections::HashMap::new();
    for bad in bad_pages {
        by_order.entry(bad.order).or_default().insert(bad.primary_value);
    }

    for (order, primaries) in by_order {
        repair_page(&pages_dir, &mut manifest, config, &triples, order, &primaries)?;
    }

    manifest.publish(&manifest_path)?;
    info!(path = %base_path.display(), pages = bad_pages.len(), "repair: fast rebuild complete");
    Ok(())
}

/// Rebuild the page(s) for one `(order, primary)` in place: every
/// existing manifest entry for that primary in that order is dropped and
/// replaced with a single freshly built blob appended to the file.
fn repair_page(
    pages_dir: &Path,
    manifest: &mut Manifest,
    config: &StoreConfig,
    triples: &TripleStore,
    order: Order,
    primaries: &HashSet<u32>,
) -> Result<(), RepairError> {
    let page_file = PageFile::open(pages_dir, order)?;
    let mut kept: Vec<PageEntry> = manifest
        .pages_for(order)
        .iter()
        .filter(|e| !primaries.contains(&e.primary_value))
        .cloned()
        .collect();

    for &primary in primaries {
        let mut keys: Vec<(u32, u32, u32)> = triples
            .list()
            .copied()
            .filter(|t| primary_of(order, t) == primary)
            .map(|t| permute(order, &t))
            .collect();
        keys.sort_unstable();
        let (blob, mut descriptor) =
            page::build_blob(primary, &keys, config.compress_pages, config.compression_level)?;
        descriptor.offset = page_file.append(&blob)?;
        kept.push(descriptor.into());
    }

    manifest.set_pages_for(order, kept);
    Ok(())
}

/// Rebuild exactly one `(order, primary)` page without touching anything
/// else, publishing a fresh manifest epoch immediately.
pub fn repair_single_page(
    base_path: impl AsRef<Path>,
    config: &StoreConfig,
    order: Order,
    primary_value: u32,
) -> Result<(), RepairError> {
    let base_path = base_path.as_ref();
    let pages_dir = pages_dir_path(base_path);
    let manifest_path = manifest::manifest_path(&pages_dir);
    let mut manifest = Manifest::open(&manifest_path)?;
    let (_dict, triples) = rebuild_triples(base_path)?;

    let mut primaries = HashSet::new();
    primaries.insert(primary_value);
    repair_page(&pages_dir, &mut manifest, config, &triples, order, &primaries)?;
    manifest.publish(&manifest_path)?;
    Ok(())
}
