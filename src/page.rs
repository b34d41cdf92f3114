//! Paged Index Writer/Reader.
//!
//! Each of the six orders is flushed to its own page file
//! (`<ORDER>.pages`), a raw concatenation of page blobs. A blob is the
//! (optionally Brotli-compressed) little-endian `u32` triple of the
//! order's permuted key for every triple sharing one primary value,
//! sorted ascending. The manifest (not this module) records, per blob,
//! `(primaryValue, offset, length, rawLength, crc32)` so a reader can
//! seek directly to the blob for a given primary without scanning the
//! file.
//!
//! Compression and the length-prefixed block framing follow the same
//! write-then-fsync-then-rename discipline the rest of the crate uses
//! for durable files; there is no bloom filter here; the "page" for a
//! primary is pages concatenated in manifest order with tombstones
//! applied by the caller, not a caller-level probabilistic filter.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::trace;

use crate::sixindex::Order;
use crate::triple::EncodedTriple;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("crc32 mismatch for page at offset {offset} (expected {expected:08x}, found {found:08x})")]
    ChecksumMismatch {
        offset: u64,
        expected: u32,
        found: u32,
    },

    #[error("corrupt brotli stream at offset {0}")]
    CorruptCompression(u64),

    #[error("page payload length {0} is not a multiple of 12")]
    MisalignedPayload(usize),
}

/// Describes one flushed blob inside an order's page file. Persisted by
/// the manifest, not by this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDescriptor {
    pub primary_value: u32,
    pub offset: u64,
    pub length: u64,
    pub raw_length: u64,
    pub crc32: u32,
}

/// Build one compressed, checksummed blob for the sorted triples sharing
/// `primary_value` in `order`'s permuted layout. Returns the blob bytes
/// plus the descriptor metadata the caller should append to the file and
/// record in the manifest.
pub fn build_blob(
    primary_value: u32,
    sorted_keys: &[(u32, u32, u32)],
    compress: bool,
    compression_level: u32,
) -> Result<(Vec<u8>, PageDescriptor), PageError> {
    let mut raw = Vec::with_capacity(sorted_keys.len() * 12);
    for &(a, b, c) in sorted_keys {
        raw.extend_from_slice(&a.to_le_bytes());
        raw.extend_from_slice(&b.to_le_bytes());
        raw.extend_from_slice(&c.to_le_bytes());
    }
    let raw_length = raw.len() as u64;

    let blob = if compress {
        let mut compressed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(
                &mut compressed,
                4096,
                compression_level,
                22,
            );
            writer.write_all(&raw)?;
        }
        compressed
    } else {
        raw
    };

    let crc32 = crc32fast::hash(&blob);
    let descriptor = PageDescriptor {
        primary_value,
        offset: 0, // filled in by the caller once appended
        length: blob.len() as u64,
        raw_length,
        crc32,
    };
    Ok((blob, descriptor))
}

/// Decompress and verify one blob, returning the sorted permuted-key
/// triples it held.
pub fn read_blob(
    blob: &[u8],
    descriptor: &PageDescriptor,
    compressed: bool,
) -> Result<Vec<(u32, u32, u32)>, PageError> {
    let found = crc32fast::hash(blob);
    if found != descriptor.crc32 {
        return Err(PageError::ChecksumMismatch {
            offset: descriptor.offset,
            expected: descriptor.crc32,
            found,
        });
    }

    let raw = if compressed {
        let mut out = Vec::with_capacity(descriptor.raw_length as usize);
        let mut reader = brotli::Decompressor::new(blob, 4096);
        reader
            .read_to_end(&mut out)
            .map_err(|_| PageError::CorruptCompression(descriptor.offset))?;
        out
    } else {
        blob.to_vec()
    };

    if raw.len() % 12 != 0 {
        return Err(PageError::MisalignedPayload(raw.len()));
    }
    let mut keys = Vec::with_capacity(raw.len() / 12);
    for chunk in raw.chunks_exact(12) {
        let a = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let b = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
        let c = u32::from_le_bytes([chunk[8], chunk[9], chunk[10], chunk[11]]);
        keys.push((a, b, c));
    }
    Ok(keys)
}

/// Append-only page file for one order.
pub struct PageFile {
    path: PathBuf,
}

impl PageFile {
    pub fn path_for(dir: impl AsRef<Path>, order: Order) -> PathBuf {
        dir.as_ref().join(format!("{}.pages", order.name()))
    }

    pub fn open(dir: impl AsRef<Path>, order: Order) -> Result<Self, PageError> {
        let path = Self::path_for(dir, order);
        if !path.exists() {
            File::create(&path)?;
        }
        Ok(PageFile { path })
    }

    pub fn len(&self) -> Result<u64, PageError> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// Append `blob` at the end of the file, returning the offset it was
    /// written at.
    pub fn append(&self, blob: &[u8]) -> Result<u64, PageError> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let offset = file.metadata()?.len();
        file.write_all(blob)?;
        file.sync_all()?;
        trace!(path = %self.path.display(), offset, len = blob.len(), "page: appended blob");
        Ok(offset)
    }

    pub fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>, PageError> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Rewrite the whole page file from a set of `(descriptor, blob)`
    /// pairs (used by compaction), atomically replacing the previous
    /// file. Returns the descriptors with corrected offsets.
    pub fn rewrite(
        &self,
        blobs: Vec<(PageDescriptor, Vec<u8>)>,
    ) -> Result<Vec<PageDescriptor>, PageError> {
        let tmp = self.path.with_extension("pages.tmp");
        let mut file = File::create(&tmp)?;
        let mut offset = 0u64;
        let mut out = Vec::with_capacity(blobs.len());
        for (mut descriptor, blob) in blobs {
            file.write_all(&blob)?;
            descriptor.offset = offset;
            offset += blob.len() as u64;
            out.push(descriptor);
        }
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &self.path)?;
        Ok(out)
    }
}

/// Concatenates every triple still reachable from a set of page
/// descriptors known to belong to one primary, applying a tombstone
/// filter supplied by the caller. This is the read-side counterpart to
/// the write path above — the logical value for a primary is the union
/// of every page holding it, minus tombstones, deduplicated.
pub fn resolve_primary(
    page_file: &PageFile,
    descriptors: &[PageDescriptor],
    compressed: bool,
    order: Order,
    tombstones: &std::collections::HashSet<EncodedTriple>,
) -> Result<Vec<EncodedTriple>, PageError> {
    let mut live = std::collections::BTreeSet::new();
    for descriptor in descriptors {
        let blob = page_file.read_at(descriptor.offset, descriptor.length)?;
        let keys = read_blob(&blob, descriptor, compressed)?;
        for key in keys {
            live.insert(key);
        }
    }
    Ok(live
        .into_iter()
        .map(|k| unkey(order, k))
        .filter(|t| !tombstones.contains(t))
        .collect())
}

/// Read triples for `order` straight from disk through the manifest's page
/// descriptors: `primary` narrows to one primary's pages (the common case,
/// mirroring an in-memory range scan bounded to a prefix); `None` walks
/// every page the manifest records for `order`, i.e. a full scan.
/// Tombstones recorded in the manifest are subtracted before returning.
pub fn read_order(
    pages_dir: impl AsRef<Path>,
    manifest: &crate::manifest::Manifest,
    order: Order,
    primary: Option<u32>,
    compressed: bool,
) -> Result<Vec<EncodedTriple>, PageError> {
    let page_file = PageFile::open(pages_dir, order)?;
    let tombstones = manifest.tombstone_set();
    let descriptors: Vec<PageDescriptor> = manifest
        .pages_for(order)
        .iter()
        .filter(|entry| primary.is_none_or(|p| entry.primary_value == p))
        .cloned()
        .map(PageDescriptor::from)
        .collect();
    resolve_primary(&page_file, &descriptors, compressed, order, &tombstones)
}

fn unkey(order: Order, k: (u32, u32, u32)) -> EncodedTriple {
    match order {
        Order::Spo => EncodedTriple::new(k.0, k.1, k.2),
        Order::Sop => EncodedTriple::new(k.0, k.2, k.1),
        Order::Pos => EncodedTriple::new(k.2, k.0, k.1),
        Order::Pso => EncodedTriple::new(k.1, k.0, k.2),
        Order::Osp => EncodedTriple::new(k.1, k.2, k.0),
        Order::Ops => EncodedTriple::new(k.2, k.1, k.0),
    }
}
