//! Write-Ahead Log.
//!
//! On-disk record layout is fixed by the external wire format and is not
//! open to redesign:
//!
//! ```text
//! header: magic[6] = "SYNWAL" | version:u32 LE | reserved:u16 LE   (12 bytes)
//! record: type:u8 | payloadLen:u32 LE | checksum:u32 LE | payload
//! ```
//!
//! `checksum` is a modular sum of the payload bytes (`u32`, wrapping
//! addition byte by byte) — not a CRC. Record types:
//!
//! - `0x10` AddTriple      payload = lpStr(s) | lpStr(p) | lpStr(o)
//! - `0x20` DeleteTriple   payload = lpStr(s) | lpStr(p) | lpStr(o)
//! - `0x30` SetNodeProps   payload = u32 nodeId | lpJson
//! - `0x31` SetEdgeProps   payload = u32 s | u32 p | u32 o | lpJson
//! - `0x40` Begin          payload = u8 mask | [lpStr(txId)] | [lpStr(sessionId)]
//! - `0x41` Commit         payload = (empty)
//! - `0x42` Abort          payload = (empty)
//!
//! `lpStr` = `u32 len LE | utf-8 bytes`; `lpJson` = `u32 len LE | utf-8 JSON`.
//! The `Begin` mask's low two bits select which of `txId`/`sessionId` are
//! present (bit 0 = txId present, bit 1 = sessionId present), following
//! the optional-field convention the rest of the crate uses for
//! `Option<T>`.
//!
//! Append/replay/truncate mechanics (buffered writer, checksum-per-record
//! validation with a `safe_offset` watermark, atomic `reset()` back to a
//! bare 12-byte header) follow the same discipline the rest of the crate
//! uses for its durable files, generalized here to the nested-batch
//! (begin/commit/abort stack) semantics the record stream must support.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace, warn};

const MAGIC: [u8; 6] = *b"SYNWAL";
const VERSION: u32 = 2;
const HEADER_LEN: u64 = 12;

const REC_ADD_TRIPLE: u8 = 0x10;
const REC_DELETE_TRIPLE: u8 = 0x20;
const REC_SET_NODE_PROPS: u8 = 0x30;
const REC_SET_EDGE_PROPS: u8 = 0x31;
const REC_BEGIN: u8 = 0x40;
const REC_COMMIT: u8 = 0x41;
const REC_ABORT: u8 = 0x42;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 6], found: [u8; 6] },

    #[error("unsupported WAL version {0}")]
    UnsupportedVersion(u32),

    #[error("truncated record at offset {0}")]
    Truncated(u64),

    #[error("checksum mismatch at offset {0}")]
    ChecksumMismatch(u64),

    #[error("unknown record type 0x{0:02X} at offset {1}")]
    UnknownRecordType(u8, u64),

    #[error("commit with no matching begin at offset {0}")]
    UnmatchedCommit(u64),

    #[error("abort with no matching begin at offset {0}")]
    UnmatchedAbort(u64),
}

/// One decoded WAL record.
#[derive(Debug, Clone, PartialEq)]
pub enum WalRecord {
    AddTriple { s: String, p: String, o: String },
    DeleteTriple { s: String, p: String, o: String },
    SetNodeProps { node_id: u32, json: Vec<u8> },
    SetEdgeProps { s: u32, p: u32, o: u32, json: Vec<u8> },
    Begin { tx_id: Option<String>, session_id: Option<String> },
    Commit,
    Abort,
}

fn write_lp_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn read_lp_str(buf: &[u8], offset: &mut usize) -> Result<String, WalError> {
    let len = read_u32(buf, offset)? as usize;
    let end = *offset + len;
    let bytes = buf
        .get(*offset..end)
        .ok_or(WalError::Truncated(*offset as u64))?;
    let s = String::from_utf8_lossy(bytes).into_owned();
    *offset = end;
    Ok(s)
}

fn read_u32(buf: &[u8], offset: &mut usize) -> Result<u32, WalError> {
    let end = *offset + 4;
    let bytes = buf
        .get(*offset..end)
        .ok_or(WalError::Truncated(*offset as u64))?;
    *offset = end;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn modular_checksum(payload: &[u8]) -> u32 {
    let mut sum: u32 = 0;
    for &b in payload {
        sum = sum.wrapping_add(b as u32);
    }
    sum
}

impl WalRecord {
    fn record_type(&self) -> u8 {
        match self {
            WalRecord::AddTriple { .. } => REC_ADD_TRIPLE,
            WalRecord::DeleteTriple { .. } => REC_DELETE_TRIPLE,
            WalRecord::SetNodeProps { .. } => REC_SET_NODE_PROPS,
            WalRecord::SetEdgeProps { .. } => REC_SET_EDGE_PROPS,
            WalRecord::Begin { .. } => REC_BEGIN,
            WalRecord::Commit => REC_COMMIT,
            WalRecord::Abort => REC_ABORT,
        }
    }

    fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            WalRecord::AddTriple { s, p, o } | WalRecord::DeleteTriple { s, p, o } => {
                write_lp_str(&mut buf, s);
                write_lp_str(&mut buf, p);
                write_lp_str(&mut buf, o);
            }
            WalRecord::SetNodeProps { node_id, json } => {
                buf.extend_from_slice(&node_id.to_le_bytes());
                buf.extend_from_slice(&(json.len() as u32).to_le_bytes());
                buf.extend_from_slice(json);
            }
            WalRecord::SetEdgeProps { s, p, o, json } => {
                buf.extend_from_slice(&s.to_le_bytes());
                buf.extend_from_slice(&p.to_le_bytes());
                buf.extend_from_slice(&o.to_le_bytes());
                buf.extend_from_slice(&(json.len() as u32).to_le_bytes());
                buf.extend_from_slice(json);
            }
            WalRecord::Begin { tx_id, session_id } => {
                let mask: u8 = (tx_id.is_some() as u8) | ((session_id.is_some() as u8) << 1);
                buf.push(mask);
                if let Some(id) = tx_id {
                    write_lp_str(&mut buf, id);
                }
                if let Some(id) = session_id {
                    write_lp_str(&mut buf, id);
                }
            }
            WalRecord::Commit | WalRecord::Abort => {}
        }
        buf
    }

    fn decode(record_type: u8, payload: &[u8], record_offset: u64) -> Result<Self, WalError> {
        let mut off = 0usize;
        match record_type {
            REC_ADD_TRIPLE | REC_DELETE_TRIPLE => {
                let s = read_lp_str(payload, &mut off)?;
                let p = read_lp_str(payload, &mut off)?;
                let o = read_lp_str(payload, &mut off)?;
                Ok(if record_type == REC_ADD_TRIPLE {
                    WalRecord::AddTriple { s, p, o }
                } else {
                    WalRecord::DeleteTriple { s, p, o }
                })
            }
            REC_SET_NODE_PROPS => {
                let node_id = read_u32(payload, &mut off)?;
                let len = read_u32(payload, &mut off)? as usize;
                let end = off + len;
                let json = payload
                    .get(off..end)
                    .ok_or(WalError::Truncated(record_offset))?
                    .to_vec();
                Ok(WalRecord::SetNodeProps { node_id, json })
            }
            REC_SET_EDGE_PROPS => {
                let s = read_u32(payload, &mut off)?;
                let p = read_u32(payload, &mut off)?;
                let o = read_u32(payload, &mut off)?;
                let len = read_u32(payload, &mut off)? as usize;
                let end = off + len;
                let json = payload
                    .get(off..end)
                    .ok_or(WalError::Truncated(record_offset))?
                    .to_vec();
                Ok(WalRecord::SetEdgeProps { s, p, o, json })
            }
            REC_BEGIN => {
                let mask = *payload.first().ok_or(WalError::Truncated(record_offset))?;
                off = 1;
                let tx_id = if mask & 0x01 != 0 {
                    Some(read_lp_str(payload, &mut off)?)
                } else {
                    None
                };
                let session_id = if mask & 0x02 != 0 {
                    Some(read_lp_str(payload, &mut off)?)
                } else {
                    None
                };
                Ok(WalRecord::Begin { tx_id, session_id })
            }
            REC_COMMIT => Ok(WalRecord::Commit),
            REC_ABORT => Ok(WalRecord::Abort),
            other => Err(WalError::UnknownRecordType(other, record_offset)),
        }
    }
}

/// Append-only WAL file handle.
pub struct Wal {
    path: PathBuf,
    file: BufWriter<File>,
    len: u64,
}

impl Wal {
    /// Open (creating if absent) the WAL at `path`, writing a fresh
    /// 12-byte header for a new file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        let existed = path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        if !existed {
            let mut header = Vec::with_capacity(HEADER_LEN as usize);
            header.extend_from_slice(&MAGIC);
            header.extend_from_slice(&VERSION.to_le_bytes());
            header.extend_from_slice(&[0u8; 2]);
            file.write_all(&header)?;
            file.flush()?;
            file.sync_all()?;
        }

        let len = file.metadata()?.len();
        debug!(path = %path.display(), len, "wal: opened");
        Ok(Wal {
            path,
            file: BufWriter::new(file),
            len,
        })
    }

    /// Append one record, returning its checksum-record offset (for
    /// diagnostics). Does not fsync; call [`Self::sync`] for durable
    /// commits.
    pub fn append(&mut self, record: &WalRecord) -> Result<u64, WalError> {
        let payload = record.encode_payload();
        let checksum = modular_checksum(&payload);
        let offset = self.len;

        self.file.write_all(&[record.record_type()])?;
        self.file
            .write_all(&(payload.len() as u32).to_le_bytes())?;
        self.file.write_all(&checksum.to_le_bytes())?;
        self.file.write_all(&payload)?;

        self.len += 1 + 4 + 4 + payload.len() as u64;
        trace!(record_type = record.record_type(), offset, "wal: appended");
        Ok(offset)
    }

    /// Flush buffered writes and fsync the file.
    pub fn sync(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        Ok(())
    }

    /// Truncate the file back to exactly the 12-byte header, forgetting
    /// every record. Used once the state the WAL protects has been
    /// durably checkpointed elsewhere (e.g. into the paged index).
    pub fn reset(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        let file = self.file.get_mut();
        file.set_len(HEADER_LEN)?;
        file.seek(SeekFrom::Start(HEADER_LEN))?;
        file.sync_all()?;
        self.len = HEADER_LEN;
        debug!(path = %self.path.display(), "wal: reset to header");
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay every well-formed record from offset 12 onward.
    ///
    /// Stops at the first structurally invalid record (bad checksum,
    /// truncated trailer, unknown type) rather than erroring the whole
    /// replay, since a torn final record is the expected shape of an
    /// unflushed crash and everything before it is still valid history.
    /// Returns the decoded records plus the byte offset of the last
    /// record known to be intact (`safe_offset`), so a caller can choose
    /// to truncate the file back to that point.
    pub fn replay(path: impl AsRef<Path>) -> Result<ReplayResult, WalError> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        if bytes.len() < HEADER_LEN as usize {
            return Err(WalError::Truncated(0));
        }
        let mut found_magic = [0u8; 6];
        found_magic.copy_from_slice(&bytes[0..6]);
        if found_magic != MAGIC {
            return Err(WalError::BadMagic {
                expected: MAGIC,
                found: found_magic,
            });
        }
        let version = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        if version != VERSION {
            return Err(WalError::UnsupportedVersion(version));
        }

        let mut records = Vec::new();
        let mut offset = HEADER_LEN as usize;
        let mut safe_offset = HEADER_LEN;

        loop {
            if offset == bytes.len() {
                break;
            }
            let record_start = offset as u64;
            if offset + 1 + 4 + 4 > bytes.len() {
                warn!(offset = record_start, "wal: torn record trailer, stopping replay");
                break;
            }
            let record_type = bytes[offset];
            offset += 1;
            let payload_len =
                u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
                    as usize;
            offset += 4;
            let checksum = u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]);
            offset += 4;

            if offset + payload_len > bytes.len() {
                warn!(offset = record_start, "wal: torn payload, stopping replay");
                break;
            }
            let payload = &bytes[offset..offset + payload_len];
            if modular_checksum(payload) != checksum {
                warn!(offset = record_start, "wal: checksum mismatch, stopping replay");
                break;
            }

            let record = match WalRecord::decode(record_type, payload, record_start) {
                Ok(r) => r,
                Err(e) => {
                    warn!(offset = record_start, error = %e, "wal: undecodable record, stopping replay");
                    break;
                }
            };
            offset += payload_len;
            safe_offset = offset as u64;
            records.push(record);
        }

        Ok(ReplayResult {
            records,
            safe_offset,
        })
    }
}

/// Outcome of [`Wal::replay`].
pub struct ReplayResult {
    pub records: Vec<WalRecord>,
    /// Byte offset one past the last structurally valid record.
    pub safe_offset: u64,
}

/// Collapses a flat record stream into applied mutations using the
/// nested begin/commit/abort stack semantics: a frame's records become
/// visible only once every enclosing frame up to the outermost commits.
/// An abort at any depth discards that frame and everything nested
/// inside it; an inner commit just merges into its parent frame without
/// making anything visible on its own.
pub struct TxFrameStack {
    frames: Vec<Vec<WalRecord>>,
}

impl TxFrameStack {
    pub fn new() -> Self {
        TxFrameStack { frames: vec![Vec::new()] }
    }

    /// Feed the replayed records through the stack, returning the
    /// ordered list of mutation records that reached the outermost
    /// (committed, non-transactional) scope.
    pub fn resolve(records: Vec<WalRecord>) -> Result<Vec<WalRecord>, WalError> {
        let mut stack = TxFrameStack::new();
        let mut offset = HEADER_LEN;
        for record in records {
            match record {
                WalRecord::Begin { .. } => stack.frames.push(Vec::new()),
                WalRecord::Commit => {
                    let finished = stack
                        .frames
                        .pop()
                        .ok_or(WalError::UnmatchedCommit(offset))?;
                    match stack.frames.last_mut() {
                        Some(parent) => parent.extend(finished),
                        None => return Err(WalError::UnmatchedCommit(offset)),
                    }
                }
                WalRecord::Abort => {
                    stack.frames.pop().ok_or(WalError::UnmatchedAbort(offset))?;
                    if stack.frames.is_empty() {
                        return Err(WalError::UnmatchedAbort(offset));
                    }
                }
                other => {
                    stack
                        .frames
                        .last_mut()
                        .expect("root frame always present")
                        .push(other);
                }
            }
            offset += 1;
        }
        // The root frame holds every outermost-committed mutation. Any
        // still-open nested frame (an uncommitted in-flight batch at the
        // moment of crash) never reached the root and is correctly
        // dropped.
        Ok(stack.frames.into_iter().next().unwrap_or_default())
    }
}

impl Default for TxFrameStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_wal() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("test.synapsedb.wal");
        (dir, path)
    }

    #[test]
    fn fresh_file_has_12_byte_header() {
        let (_dir, path) = temp_wal();
        let wal = Wal::open(&path).expect("open");
        assert_eq!(wal.len(), HEADER_LEN);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), HEADER_LEN);
    }

    #[test]
    fn append_and_replay_round_trip() {
        let (_dir, path) = temp_wal();
        {
            let mut wal = Wal::open(&path).expect("open");
            wal.append(&WalRecord::AddTriple {
                s: "a".into(),
                p: "knows".into(),
                o: "b".into(),
            })
            .unwrap();
            wal.sync().unwrap();
        }
        let result = Wal::replay(&path).expect("replay");
        assert_eq!(result.records.len(), 1);
        assert_eq!(
            result.records[0],
            WalRecord::AddTriple {
                s: "a".into(),
                p: "knows".into(),
                o: "b".into()
            }
        );
    }

    #[test]
    fn reset_truncates_to_header() {
        let (_dir, path) = temp_wal();
        let mut wal = Wal::open(&path).expect("open");
        wal.append(&WalRecord::AddTriple {
            s: "a".into(),
            p: "p".into(),
            o: "b".into(),
        })
        .unwrap();
        wal.sync().unwrap();
        wal.reset().unwrap();
        assert_eq!(wal.len(), HEADER_LEN);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), HEADER_LEN);
    }

    #[test]
    fn corrupted_final_record_truncates_replay_not_errors() {
        let (_dir, path) = temp_wal();
        {
            let mut wal = Wal::open(&path).expect("open");
            wal.append(&WalRecord::AddTriple {
                s: "a".into(),
                p: "p".into(),
                o: "b".into(),
            })
            .unwrap();
            wal.sync().unwrap();
        }
        // Append a torn trailing record by hand.
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[REC_ADD_TRIPLE, 0xFF, 0xFF, 0xFF]).unwrap();
        }
        let result = Wal::replay(&path).expect("replay");
        assert_eq!(result.records.len(), 1);
    }

    #[test]
    fn nested_batch_inner_commit_survives_outer_abort_is_discarded() {
        let records = vec![
            WalRecord::Begin {
                tx_id: None,
                session_id: None,
            },
            WalRecord::Begin {
                tx_id: None,
                session_id: None,
            },
            WalRecord::AddTriple {
                s: "a".into(),
                p: "p".into(),
                o: "b".into(),
            },
            WalRecord::Commit, // inner commit merges into outer frame
            WalRecord::Abort,  // outer abort discards everything
        ];
        let resolved = TxFrameStack::resolve(records).expect("resolve");
        assert!(resolved.is_empty());
    }

    #[test]
    fn outermost_commit_makes_nested_writes_visible() {
        let records = vec![
            WalRecord::Begin {
                tx_id: Some("tx1".into()),
                session_id: None,
            },
            WalRecord::Begin {
                tx_id: None,
                session_id: None,
            },
            WalRecord::AddTriple {
                s: "a".into(),
                p: "p".into(),
                o: "b".into(),
            },
            WalRecord::Commit,
            WalRecord::Commit,
        ];
        let resolved = TxFrameStack::resolve(records).expect("resolve");
        assert_eq!(resolved.len(), 1);
    }
}
