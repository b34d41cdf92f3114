//! Compaction Engine.
//!
//! Two modes, both scoped to a single order at a time (compaction is not
//! atomic across the six orders — each order gets its own manifest
//! publish — but every individual order's compaction is atomic via a
//! single rewrite-then-swap of that order's page file and manifest
//! entry):
//!
//! - **Rewrite**: every live primary in the order is read, tombstones
//!   applied, and the order's page file is rebuilt from scratch. Used
//!   when the tombstone ratio crosses [`crate::config::StoreConfig::compaction_tombstone_ratio`].
//! - **Incremental**: only the hottest primaries whose page count
//!   exceeds [`crate::config::StoreConfig::compaction_page_threshold`]
//!   are rewritten, capped at `compaction_max_primary` primaries per
//!   pass.
//!
//! Either mode refuses to reclaim a page still covered by a pinned
//! reader epoch: any reader pinned below the rewrite's cutoff defers the
//! whole operation rather than risk invalidating its snapshot.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::hotness::HotnessTracker;
use crate::manifest::{Manifest, PageEntry};
use crate::page::{self, PageFile};
use crate::sixindex::Order;
use crate::triple::EncodedTriple;

#[derive(Debug, Clone, Copy, Default)]
pub struct CompactionReport {
    pub primaries_rewritten: usize,
    pub pages_before: usize,
    pub pages_after: usize,
}

/// Whether `order` currently qualifies for a full rewrite, based on the
/// tombstone-to-live ratio recorded in the manifest.
pub fn needs_rewrite(manifest: &Manifest, order: Order, tombstone_ratio_threshold: f64) -> bool {
    let pages = manifest.pages_for(order);
    if pages.is_empty() {
        return false;
    }
    let tombstones = manifest.tombstones.len();
    let total = pages.len() + tombstones;
    if total == 0 {
        return false;
    }
    (tombstones as f64 / total as f64) >= tombstone_ratio_threshold
}

/// Full rewrite of one order: every live (non-tombstoned) triple is read
/// back, grouped by primary, and written into a fresh page file that
/// atomically replaces the old one.
pub fn rewrite_order(
    pages_dir: impl AsRef<Path>,
    manifest: &mut Manifest,
    order: Order,
    compress: bool,
    compression_level: u32,
    min_pinned_epoch: Option<u64>,
) -> Result<CompactionReport, crate::page::PageError> {
    if let Some(pinned) = min_pinned_epoch {
        debug!(order = order.name(), pinned, epoch = manifest.epoch, "compaction: deferred, reader pinned");
        return Ok(CompactionReport::default());
    }

    let pages_dir = pages_dir.as_ref();
    let page_file = PageFile::open(pages_dir, order)?;
    let descriptors: Vec<_> = manifest.pages_for(order).iter().cloned().map(Into::into).collect();
    let tombstones = manifest.tombstone_set();

    let mut by_primary: HashMap<u32, Vec<EncodedTriple>> = HashMap::new();
    for descriptor in &descriptors {
        let live = page::resolve_primary(&page_file, std::slice::from_ref(descriptor), compress, order, &tombstones)?;
        for t in live {
            let primary = primary_of(order, &t);
            by_primary.entry(primary).or_default().push(t);
        }
    }

    let pages_before = descriptors.len();
    let mut blobs = Vec::with_capacity(by_primary.len());
    for (primary, triples) in &by_primary {
        let mut keys: Vec<(u32, u32, u32)> = triples.iter().map(|t| permute(order, t)).collect();
        keys.sort_unstable();
        let (blob, descriptor) = page::build_blob(*primary, &keys, compress, compression_level)?;
        blobs.push((descriptor, blob));
    }
    let new_descriptors = page_file.rewrite(blobs)?;
    let pages_after = new_descriptors.len();

    manifest.set_pages_for(order, new_descriptors.into_iter().map(PageEntry::from).collect());
    info!(order = order.name(), pages_before, pages_after, "compaction: rewrote order");

    Ok(CompactionReport {
        primaries_rewritten: by_primary.len(),
        pages_before,
        pages_after,
    })
}

/// Incremental compaction: rewrite only the hottest primaries whose live
/// page count exceeds `page_threshold`, capped at `max_primary`.
pub fn incremental_compact(
    pages_dir: impl AsRef<Path>,
    manifest: &mut Manifest,
    order: Order,
    compress: bool,
    compression_level: u32,
    hotness: &HotnessTracker,
    page_threshold: usize,
    max_primary: usize,
    min_pinned_epoch: Option<u64>,
) -> Result<CompactionReport, crate::page::PageError> {
    if min_pinned_epoch.is_some() {
        return Ok(CompactionReport::default());
    }

    let pages_dir = pages_dir.as_ref();
    let page_file = PageFile::open(pages_dir, order)?;
    let mut per_primary_count: HashMap<u32, usize> = HashMap::new();
    for entry in manifest.pages_for(order) {
        *per_primary_count.entry(entry.primary_value).or_insert(0) += 1;
    }

    let mut candidates: Vec<u32> = per_primary_count
        .iter()
        .filter(|&(_, &count)| count > page_threshold)
        .map(|(&primary, _)| primary)
        .collect();
    candidates.sort_by(|a, b| {
        hotness
            .score(order, *b)
            .partial_cmp(&hotness.score(order, *a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(max_primary);

    if candidates.is_empty() {
        return Ok(CompactionReport::default());
    }
    let candidate_set: std::collections::HashSet<u32> = candidates.iter().copied().collect();
    let tombstones = manifest.tombstone_set();

    let mut untouched = Vec::new();
    let mut touched_triples: HashMap<u32, Vec<EncodedTriple>> = HashMap::new();
    let pages_before = manifest.pages_for(order).len();

    for entry in manifest.pages_for(order).to_vec() {
        if candidate_set.contains(&entry.primary_value) {
            let descriptor = entry.clone().into();
            let live = page::resolve_primary(&page_file, std::slice::from_ref(&descriptor), compress, order, &tombstones)?;
            touched_triples.entry(entry.primary_value).or_default().extend(live);
        } else {
            untouched.push(entry);
        }
    }

    let mut blobs = Vec::new();
    for (primary, triples) in &touched_triples {
        let mut keys: Vec<(u32, u32, u32)> = triples.iter().map(|t| permute(order, t)).collect();
        keys.sort_unstable();
        keys.dedup();
        let (blob, descriptor) = page::build_blob(*primary, &keys, compress, compression_level)?;
        blobs.push((descriptor, blob));
    }

    // Untouched pages are preserved byte-for-byte by reading them back
    // from the old file before the rewrite.
    let mut preserved_blobs = Vec::with_capacity(untouched.len());
    for entry in &untouched {
        let bytes = page_file.read_at(entry.offset, entry.length)?;
        preserved_blobs.push((entry.clone().into(), bytes));
    }
    preserved_blobs.extend(blobs);

    let new_descriptors = page_file.rewrite(preserved_blobs)?;
    let pages_after = new_descriptors.len();
    manifest.set_pages_for(order, new_descriptors.into_iter().map(PageEntry::from).collect());

    Ok(CompactionReport {
        primaries_rewritten: candidates.len(),
        pages_before,
        pages_after,
    })
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
