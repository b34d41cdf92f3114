//! File Header & Sections.
//!
//! The `<name>.synapsedb` container file holds a fixed-offset header
//! describing four sections (dictionary, triples, six-order index
//! snapshot, properties) so that a restart can repopulate every
//! in-memory structure without replaying the full page set. It is a
//! fast-path cache, not the source of truth — the paged index
//! (`<name>.synapsedb.pages/`) plus WAL replay remain authoritative, and
//! `repair` can always rebuild this file from them.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

const MAGIC: [u8; 8] = *b"SYNAPSDB";
const VERSION: u32 = 1;
// magic(8) + version(4) + 4 x (offset:u64 + length:u64) = 12 + 64 = 76
const HEADER_LEN: usize = 8 + 4 + 4 * (8 + 8);

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt header: bad magic {0:?}")]
    BadMagic([u8; 8]),

    #[error("unsupported container version {0}")]
    UnsupportedVersion(u32),

    #[error("corrupt header: truncated")]
    Truncated,
}

#[derive(Debug, Clone, Copy, Default)]
struct SectionDescriptor {
    offset: u64,
    length: u64,
}

/// The four sections stored in the container file, in a fixed order.
#[derive(Debug, Clone, Default)]
pub struct Sections {
    pub dictionary: Vec<u8>,
    pub triples: Vec<u8>,
    pub index_snapshot: Vec<u8>,
    pub properties: Vec<u8>,
}

/// Read the container file at `path`. Returns `Ok(None)` if the file
/// doesn't exist yet (a brand new store).
pub fn read_storage_file(path: impl AsRef<Path>) -> Result<Option<Sections>, HeaderError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let mut file = File::open(path)?;
    let mut header = [0u8; HEADER_LEN];
    file.read_exact(&mut header).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            HeaderError::Truncated
        } else {
            HeaderError::Io(e)
        }
    })?;

    let mut magic = [0u8; 8];
    magic.copy_from_slice(&header[0..8]);
    if magic != MAGIC {
        return Err(HeaderError::BadMagic(magic));
    }
    let version = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
    if version != VERSION {
        return Err(HeaderError::UnsupportedVersion(version));
    }

    let mut descriptors = [SectionDescriptor::default(); 4];
    let mut cursor = 12;
    for descriptor in &mut descriptors {
        let offset = u64::from_le_bytes(header[cursor..cursor + 8].try_into().unwrap());
        cursor += 8;
        let length = u64::from_le_bytes(header[cursor..cursor + 8].try_into().unwrap());
        cursor += 8;
        *descriptor = SectionDescriptor { offset, length };
    }

    let mut body = Vec::new();
    file.read_to_end(&mut body)?;
    let read_section = |d: &SectionDescriptor| -> Result<Vec<u8>, HeaderError> {
        let start = (d.offset as usize).saturating_sub(HEADER_LEN);
        let end = start + d.length as usize;
        body.get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or(HeaderError::Truncated)
    };

    Ok(Some(Sections {
        dictionary: read_section(&descriptors[0])?,
        triples: read_section(&descriptors[1])?,
        index_snapshot: read_section(&descriptors[2])?,
        properties: read_section(&descriptors[3])?,
    }))
}

/// Write `sections` to `path` atomically (write to a sibling `.tmp` file,
/// fsync, rename over the live file).
pub fn write_storage_file(path: impl AsRef<Path>, sections: &Sections) -> Result<(), HeaderError> {
    let path = path.as_ref();
    let tmp = path.with_extension("synapsedb.tmp");

    let parts = [
        &sections.dictionary,
        &sections.triples,
        &sections.index_snapshot,
        &sections.properties,
    ];
    let mut descriptors = [SectionDescriptor::default(); 4];
    let mut offset = HEADER_LEN as u64;
    for (i, part) in parts.iter().enumerate() {
        descriptors[i] = SectionDescriptor {
            offset,
            length: part.len() as u64,
        };
        offset += part.len() as u64;
    }

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(&MAGIC);
    header.extend_from_slice(&VERSION.to_le_bytes());
    for d in &descriptors {
        header.extend_from_slice(&d.offset.to_le_bytes());
        header.extend_from_slice(&d.length.to_le_bytes());
    }

    let mut file = File::create(&tmp)?;
    file.write_all(&header)?;
    for part in parts {
        file.write_all(part)?;
    }
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    debug!(path = %path.display(), "header: storage file written");
    Ok(())
}

/// Ensure a container file exists at `path`, writing an empty one if
/// missing. Returns whether a new file was created.
pub fn initialize_if_missing(path: impl AsRef<Path>) -> Result<bool, HeaderError> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(false);
    }
    write_storage_file(path, &Sections::default())?;
    warn!(path = %path.display(), "header: initialized new empty storage file");
    Ok(true)
}

pub fn container_path(store_path: impl AsRef<Path>) -> PathBuf {
    store_path.as_ref().to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.synapsedb");
        assert!(read_storage_file(&path).unwrap().is_none());
    }

    #[test]
    fn write_then_read_round_trips_sections() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.synapsedb");
        let sections = Sections {
            dictionary: b"dict-bytes".to_vec(),
            triples: b"triple-bytes".to_vec(),
            index_snapshot: b"".to_vec(),
            properties: b"prop-bytes".to_vec(),
        };
        write_storage_file(&path, &sections).unwrap();
        let read_back = read_storage_file(&path).unwrap().unwrap();
        assert_eq!(read_back.dictionary, sections.dictionary);
        assert_eq!(read_back.triples, sections.triples);
        assert_eq!(read_back.properties, sections.properties);
        assert!(read_back.index_snapshot.is_empty());
    }

    #[test]
    fn initialize_if_missing_only_creates_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.synapsedb");
        assert!(initialize_if_missing(&path).unwrap());
        assert!(!initialize_if_missing(&path).unwrap());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.synapsedb");
        fs::write(&path, vec![0u8; HEADER_LEN]).unwrap();
        let result = read_storage_file(&path);
        assert!(matches!(result, Err(HeaderError::BadMagic(_))));
    }
}
