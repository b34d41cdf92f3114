//! PersistentStore.
//!
//! The top-level orchestrator: owns every in-memory structure, the WAL,
//! and the manifest, and is the only place that sequences a mutation
//! across all of them. The public type is a thin, cheaply-clonable
//! `Arc<RwLock<Inner>>` handle; all state and the locking discipline
//! around it live on the inner struct.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::config::{Durability, StoreConfig};
use crate::dict::Dictionary;
use crate::error::{Error, Result, StorageError};
use crate::header::{self, Sections};
use crate::hotness::HotnessTracker;
use crate::inverted::InvertedIndex;
use crate::manifest::{self, Manifest};
use crate::page::{self, PageFile};
use crate::property::{EdgeKey, PropertyMap, PropertyStore};
use crate::query::{DiskContext, QuerySnapshot};
use crate::readers::{ReaderRegistry, WriterLock};
use crate::sixindex::{Criteria, Order, SixOrderIndex};
use crate::staging::StagingArea;
use crate::triple::{EncodedTriple, TripleStore};
use crate::txids::TxIdRegistry;
use crate::wal::{Wal, WalRecord};

/// Rollback entry recorded while a batch is open, so an `abortBatch`
/// (at any nesting depth) can undo exactly what happened inside it.
enum Undo {
    RemoveTriple(EncodedTriple),
    ReAddTriple(EncodedTriple),
    RestoreNodeProps(u32, Option<PropertyMap>),
    RestoreEdgeProps(EdgeKey, Option<PropertyMap>),
}

struct Inner {
    dict: Dictionary,
    triples: TripleStore,
    index: SixOrderIndex,
    properties: PropertyStore,
    inverted: InvertedIndex,
    staging: StagingArea,
    hotness: HotnessTracker,
    wal: Wal,
    manifest: Manifest,
    txids: TxIdRegistry,
    readers: ReaderRegistry,
    _lock: WriterLock,
    config: StoreConfig,
    base_path: PathBuf,
    pages_dir: PathBuf,
    dirty: bool,
    current_epoch: u64,
    undo_frames: Vec<Vec<Undo>>,
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

fn lock_path(base: &Path) -> PathBuf {
    let mut p = base.as_os_str().to_owned();
    p.push(".synapsedb.lock");
    PathBuf::from(p)
}

impl Inner {
    fn open(base_path: PathBuf, config: StoreConfig) -> Result<Self> {
        let pages_dir = pages_dir_path(&base_path);
        fs::create_dir_all(&pages_dir)?;

        let lock = WriterLock::acquire(lock_path(&base_path), config.enable_lock)
            .map_err(|_| Error::Busy("database is locked by another writer".to_string()))?;

        let container = container_path(&base_path);
        header::initialize_if_missing(&container).map_err(|e| {
            Error::Storage(StorageError::Internal(format!("header init failed: {e}")))
        })?;
        let sections = header::read_storage_file(&container)
            .map_err(|e| Error::Storage(StorageError::Internal(format!("header read failed: {e}"))))?
            .unwrap_or_default();

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
        let mut properties = if sections.properties.is_empty() {
            PropertyStore::new()
        } else {
            PropertyStore::deserialize(&sections.properties)
                .map_err(|e| Error::Storage(StorageError::Internal(e.to_string())))?
        };

        let manifest_path = manifest::manifest_path(&pages_dir);
        let manifest = if manifest_path.exists() {
            Manifest::open(&manifest_path)?
        } else {
            let mut m = Manifest::new(config.page_size, config.compress_pages, config.compression_level);
            m.publish(&manifest_path)?;
            m
        };

        let mut index = SixOrderIndex::new();
        for t in triples.list() {
            index.add(*t);
        }

        let mut inverted = InvertedIndex::new();
        // Rebuilt from the property store on every open; the inverted
        // index itself is in-memory-only and isn't persisted.
        for (node_id, props) in properties.iter_nodes() {
            inverted.index_node(node_id, props);
        }
        for (edge, props) in properties.iter_edges() {
            inverted.index_edge(*edge, props);
        }

        let wal = Wal::open(wal_path(&base_path))?;
        let replay = Wal::replay(wal_path(&base_path))?;
        let resolved = crate::wal::TxFrameStack::resolve(replay.records)?;
        let replayed_any = !resolved.is_empty();
        for record in resolved {
            apply_wal_record(&mut dict, &mut triples, &mut index, &mut properties, &mut inverted, record);
        }

        let txids = TxIdRegistry::open(pages_dir.join("txids.json"), config.max_remember_tx_ids)?;
        let readers = ReaderRegistry::open(pages_dir.join("readers"), config.reader_timeout)?;
        let hotness = HotnessTracker::open(pages_dir.join("hotness.json"), config.hotness_decay)?;
        let staging = StagingArea::new(config.staging_enabled, config.staging_flush_threshold);

        let epoch = manifest.epoch;
        info!(path = %base_path.display(), epoch, "store: opened");

        Ok(Inner {
            dict,
            triples,
            index,
            properties,
            inverted,
            staging,
            hotness,
            wal,
            manifest,
            txids,
            readers,
            _lock: lock,
            config,
            base_path,
            pages_dir,
            // Replayed writes live only in memory until the next flush, so
            // the paged read path must not be trusted yet if replay applied
            // anything the last flush didn't already cover.
            dirty: replayed_any,
            current_epoch: epoch,
            undo_frames: Vec::new(),
        })
    }

    fn in_batch(&self) -> bool {
        !self.undo_frames.is_empty()
    }

    fn push_undo(&mut self, undo: Undo) {
        if let Some(frame) = self.undo_frames.last_mut() {
            frame.push(undo);
        }
    }

    fn add_fact(&mut self, s: &str, p: &str, o: &str) -> Result<bool> {
        let s_id = self.dict.get_or_create_id(s);
        let p_id = self.dict.get_or_create_id(p);
        let o_id = self.dict.get_or_create_id(o);
        let triple = EncodedTriple::new(s_id, p_id, o_id);

        self.wal.append(&WalRecord::AddTriple {
            s: s.to_string(),
            p: p.to_string(),
            o: o.to_string(),
        })?;
        if !self.in_batch() && self.config.durability == Durability::Durable {
            self.wal.sync()?;
        }

        let added = self.triples.add(triple);
        if added {
            self.index.add(triple);
            self.manifest.tombstones.retain(|&(a, b, c)| (a, b, c) != (s_id, p_id, o_id));
            self.push_undo(Undo::RemoveTriple(triple));
        }
        self.dirty = true;
        Ok(added)
    }

    fn delete_fact(&mut self, s: &str, p: &str, o: &str) -> Result<bool> {
        let Some(s_id) = self.dict.get_id(s) else { return Ok(false) };
        let Some(p_id) = self.dict.get_id(p) else { return Ok(false) };
        let Some(o_id) = self.dict.get_id(o) else { return Ok(false) };
        let triple = EncodedTriple::new(s_id, p_id, o_id);

        self.wal.append(&WalRecord::DeleteTriple {
            s: s.to_string(),
            p: p.to_string(),
            o: o.to_string(),
        })?;
        if !self.in_batch() && self.config.durability == Durability::Durable {
            self.wal.sync()?;
        }

        let removed = self.triples.remove(&triple);
        if removed {
            self.index.remove(&triple);
            self.manifest.add_tombstone(triple);
            self.push_undo(Undo::ReAddTriple(triple));
        }
        self.dirty = true;
        Ok(removed)
    }

    fn set_node_properties(&mut self, node_id: u32, props: PropertyMap) -> Result<()> {
        let json = PropertyStore::encode_map(&props)
            .map_err(|e| Error::Storage(StorageError::Internal(e.to_string())))?;
        self.wal.append(&WalRecord::SetNodeProps { node_id, json })?;
        if !self.in_batch() && self.config.durability == Durability::Durable {
            self.wal.sync()?;
        }

        let previous = self.properties.get_node_properties(node_id).cloned();
        if let Some(old) = &previous {
            self.inverted.unindex_node(node_id, old);
        }
        self.inverted.index_node(node_id, &props);
        self.properties.set_node_properties(node_id, props);
        self.push_undo(Undo::RestoreNodeProps(node_id, previous));
        self.dirty = true;
        Ok(())
    }

    fn set_edge_properties(&mut self, edge: EdgeKey, props: PropertyMap) -> Result<()> {
        self.wal.append(&WalRecord::SetEdgeProps {
            s: edge.s,
            p: edge.p,
            o: edge.o,
            json: PropertyStore::encode_map(&props)
                .map_err(|e| Error::Storage(StorageError::Internal(e.to_string())))?,
        })?;
        if !self.in_batch() && self.config.durability == Durability::Durable {
            self.wal.sync()?;
        }

        let previous = self.properties.get_edge_properties(&edge).cloned();
        if let Some(old) = &previous {
            self.inverted.unindex_edge(&edge, old);
        }
        self.inverted.index_edge(edge, &props);
        self.properties.set_edge_properties(edge, props);
        self.push_undo(Undo::RestoreEdgeProps(edge, previous));
        self.dirty = true;
        Ok(())
    }

    fn undo(&mut self, entries: Vec<Undo>) {
        for entry in entries.into_iter().rev() {
            match entry {
                Undo::RemoveTriple(t) => {
                    self.triples.remove(&t);
                    self.index.remove(&t);
                }
                Undo::ReAddTriple(t) => {
                    self.triples.add(t);
                    self.index.add(t);
                }
                Undo::RestoreNodeProps(id, prev) => match prev {
                    Some(props) => self.properties.set_node_properties(id, props),
                    None => self.properties.set_node_properties(id, PropertyMap::new()),
                },
                Undo::RestoreEdgeProps(edge, prev) => match prev {
                    Some(props) => self.properties.set_edge_properties(edge, props),
                    None => self.properties.set_edge_properties(edge, PropertyMap::new()),
                },
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        for order in Order::ALL {
            let triples: Vec<EncodedTriple> = self.triples.list().copied().collect();
            let mut by_primary: HashMap<u32, Vec<(u32, u32, u32)>> = HashMap::new();
            for t in &triples {
                let primary = match order {
                    Order::Spo | Order::Sop => t.s,
                    Order::Pos | Order::Pso => t.p,
                    Order::Osp | Order::Ops => t.o,
                };
                by_primary.entry(primary).or_default().push(key_for(order, t));
            }
            let page_file = PageFile::open(&self.pages_dir, order)
                .map_err(|e| Error::Storage(StorageError::Internal(e.to_string())))?;
            let mut entries = Vec::with_capacity(by_primary.len());
            for (primary, mut keys) in by_primary {
                keys.sort_unstable();
                let (blob, mut descriptor) = page::build_blob(
                    primary,
                    &keys,
                    self.config.compress_pages,
                    self.config.compression_level,
                )
                .map_err(|e| Error::Storage(StorageError::Internal(e.to_string())))?;
                descriptor.offset = page_file
                    .append(&blob)
                    .map_err(|e| Error::Storage(StorageError::Internal(e.to_string())))?;
                entries.push(descriptor);
            }
            self.manifest.set_pages_for(order, entries.into_iter().map(Into::into).collect());
        }

        let container = container_path(&self.base_path);
        let sections = Sections {
            dictionary: self.dict.serialize()?,
            triples: self.triples.serialize()?,
            index_snapshot: Vec::new(),
            properties: self
                .properties
                .serialize()
                .map_err(|e| Error::Storage(StorageError::Internal(e.to_string())))?,
        };
        header::write_storage_file(&container, &sections)
            .map_err(|e| Error::Storage(StorageError::Internal(e.to_string())))?;

        let manifest_path = manifest::manifest_path(&self.pages_dir);
        self.manifest.publish(&manifest_path)?;
        self.current_epoch = self.manifest.epoch;

        self.wal.reset()?;
        self.hotness.persist().map_err(|e| Error::Storage(StorageError::Internal(e.to_string())))?;
        self.dirty = false;
        debug!(epoch = self.current_epoch, "store: flushed");
        Ok(())
    }
}

fn key_for(order: Order, t: &EncodedTriple) -> (u32, u32, u32) {
    match order {
        Order::Spo => (t.s, t.p, t.o),
        Order::Sop => (t.s, t.o, t.p),
        Order::Pos => (t.p, t.o, t.s),
        Order::Pso => (t.p, t.s, t.o),
        Order::Osp => (t.o, t.s, t.p),
        Order::Ops => (t.o, t.p, t.s),
    }
}

fn apply_wal_record(
    dict: &mut Dictionary,
    triples: &mut TripleStore,
    index: &mut SixOrderIndex,
    properties: &mut PropertyStore,
    inverted: &mut InvertedIndex,
    record: WalRecord,
) {
    match record {
        WalRecord::AddTriple { s, p, o } => {
            let t = EncodedTriple::new(
                dict.get_or_create_id(&s),
                dict.get_or_create_id(&p),
                dict.get_or_create_id(&o),
            );
            triples.add(t);
            index.add(t);
        }
        WalRecord::DeleteTriple { s, p, o } => {
            if let (Some(s), Some(p), Some(o)) = (dict.get_id(&s), dict.get_id(&p), dict.get_id(&o)) {
                let t = EncodedTriple::new(s, p, o);
                triples.remove(&t);
                index.remove(&t);
            }
        }
        WalRecord::SetNodeProps { node_id, json } => {
            if let Ok(props) = PropertyStore::decode_map(&json) {
                inverted.index_node(node_id, &props);
                properties.set_node_properties(node_id, props);
            }
        }
        WalRecord::SetEdgeProps { s, p, o, json } => {
            if let Ok(props) = PropertyStore::decode_map(&json) {
                let edge = EdgeKey::new(s, p, o);
                inverted.index_edge(edge, &props);
                properties.set_edge_properties(edge, props);
            }
        }
        WalRecord::Begin { .. } | WalRecord::Commit | WalRecord::Abort => {
            warn!("store: unexpected control record survived WAL frame resolution");
        }
    }
}

/// Handle to an open triple store. Cheaply clonable; every clone shares
/// the same underlying state.
#[derive(Clone)]
pub struct PersistentStore {
    inner: Arc<RwLock<Inner>>,
}

impl PersistentStore {
    /// Open (creating if missing) the store rooted at `path` (without
    /// extension — `.synapsedb`, `.synapsedb.wal`, `.synapsedb.pages/`,
    /// and `.synapsedb.lock` are all derived from it).
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let inner = Inner::open(path.as_ref().to_path_buf(), config)?;
        Ok(PersistentStore {
            inner: Arc::new(RwLock::new(inner)),
        })
    }

    pub fn open_default(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, StoreConfig::default())
    }

    pub fn get_or_create_id(&self, value: &str) -> Result<u32> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        Ok(inner.dict.get_or_create_id(value))
    }

    pub fn get_node_id(&self, value: &str) -> Result<Option<u32>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.dict.get_id(value))
    }

    pub fn get_node_value(&self, id: u32) -> Result<Option<String>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.dict.get_value(id).map(str::to_string))
    }

    pub fn add_fact(&self, s: &str, p: &str, o: &str) -> Result<bool> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.add_fact(s, p, o)
    }

    pub fn delete_fact(&self, s: &str, p: &str, o: &str) -> Result<bool> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.delete_fact(s, p, o)
    }

    pub fn set_node_properties(&self, node_id: u32, props: PropertyMap) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.set_node_properties(node_id, props)
    }

    pub fn set_edge_properties(&self, edge: EdgeKey, props: PropertyMap) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.set_edge_properties(edge, props)
    }

    pub fn get_node_properties(&self, node_id: u32) -> Result<Option<PropertyMap>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.properties.get_node_properties(node_id).cloned())
    }

    pub fn get_edge_properties(&self, edge: &EdgeKey) -> Result<Option<PropertyMap>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.properties.get_edge_properties(edge).cloned())
    }

    /// Begin a nested batch, returning its depth (1 = outermost).
    pub fn begin_batch(&self, tx_id: Option<String>, session_id: Option<String>) -> Result<usize> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.wal.append(&WalRecord::Begin {
            tx_id,
            session_id,
        })?;
        inner.undo_frames.push(Vec::new());
        Ok(inner.undo_frames.len())
    }

    /// Commit the innermost open batch. On the outermost commit, syncs
    /// the WAL per the configured durability and records the txId (if
    /// any was supplied to the matching `beginBatch`) in the registry.
    pub fn commit_batch(&self, tx_id: Option<String>, session_id: Option<String>) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.wal.append(&WalRecord::Commit)?;
        // Drop the popped frame rather than folding it into the parent: a
        // commit at any depth finalizes its mutations immediately, so an
        // ancestor's later abort can no longer reach back and undo them.
        inner.undo_frames.pop();
        if inner.undo_frames.is_empty() {
            if inner.config.durability == Durability::Durable {
                inner.wal.sync()?;
            }
            if let Some(id) = tx_id {
                inner.txids.record(id, session_id, 0)?;
            }
        }
        Ok(())
    }

    /// Abort the innermost open batch, rolling back every mutation made
    /// since the matching `beginBatch`.
    pub fn abort_batch(&self) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.wal.append(&WalRecord::Abort)?;
        let frame = inner.undo_frames.pop().unwrap_or_default();
        inner.undo(frame);
        Ok(())
    }

    /// Pin the current epoch and hand back a read-only snapshot; writes
    /// made after this call are not visible through the returned
    /// snapshot.
    pub fn with_snapshot(&self) -> Result<QuerySnapshot> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .readers
            .pin(inner.current_epoch)
            .map_err(|e| Error::Storage(StorageError::Internal(e.to_string())))?;
        let disk = DiskContext::new(&inner.manifest, &inner.hotness, &inner.pages_dir, inner.config.compress_pages);
        Ok(QuerySnapshot::capture(&inner.dict, &inner.index, &inner.properties, &inner.inverted, &disk, inner.dirty))
    }

    /// Query against the live (not pinned) state.
    pub fn query(&self) -> Result<QuerySnapshot> {
        let inner = self.inner.read().expect("store lock poisoned");
        let disk = DiskContext::new(&inner.manifest, &inner.hotness, &inner.pages_dir, inner.config.compress_pages);
        Ok(QuerySnapshot::capture(&inner.dict, &inner.index, &inner.properties, &inner.inverted, &disk, inner.dirty))
    }

    /// Convenience lookup used by call sites that want raw triples rather
    /// than a chained [`QueryBuilder`]. Routes through the same
    /// dirty/paged-index distinction [`QuerySnapshot::triples`] does,
    /// rather than a standalone in-memory-only path.
    pub fn lookup(&self, criteria: Criteria) -> Result<Vec<EncodedTriple>> {
        let inner = self.inner.read().expect("store lock poisoned");
        let disk = DiskContext::new(&inner.manifest, &inner.hotness, &inner.pages_dir, inner.config.compress_pages);
        let snapshot =
            QuerySnapshot::capture(&inner.dict, &inner.index, &inner.properties, &inner.inverted, &disk, inner.dirty);
        Ok(snapshot.triples(criteria))
    }

    /// Flush in-memory state to the paged index, publish a fresh
    /// manifest, and truncate the WAL.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.flush()
    }

    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.flush()?;
        inner.readers.unpin().map_err(|e| Error::Storage(StorageError::Internal(e.to_string())))?;
        Ok(())
    }

    pub fn current_epoch(&self) -> u64 {
        self.inner.read().expect("store lock poisoned").current_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, PersistentStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test");
        let store = PersistentStore::open_default(&path).unwrap();
        (dir, store)
    }

    #[test]
    fn add_then_find_basic() {
        let (_dir, store) = open_temp();
        store.add_fact("alice", "knows", "bob").unwrap();
        let s = store.get_node_id("alice").unwrap().unwrap();
        let p = store.get_node_id("knows").unwrap().unwrap();
        let results = store
            .lookup(Criteria {
                s: Some(s),
                p: Some(p),
                o: None,
            })
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn inner_commit_survives_outer_abort() {
        let (_dir, store) = open_temp();
        store.begin_batch(None, None).unwrap();
        store.add_fact("a", "p", "x").unwrap();
        store.begin_batch(None, None).unwrap();
        store.add_fact("b", "p", "y").unwrap();
        store.commit_batch(None, None).unwrap();
        store.abort_batch().unwrap();

        let p = store.get_node_id("p").unwrap().unwrap();

        let b = store.get_node_id("b").unwrap().unwrap();
        let found_b = store
            .lookup(Criteria {
                s: Some(b),
                p: Some(p),
                o: None,
            })
            .unwrap();
        assert_eq!(found_b.len(), 1, "the inner commit finalized before the outer abort ran");

        let a = store.get_node_id("a").unwrap().unwrap();
        let found_a = store
            .lookup(Criteria {
                s: Some(a),
                p: Some(p),
                o: None,
            })
            .unwrap();
        assert!(found_a.is_empty(), "the outer-staged, never-committed fact must roll back");
    }

    #[test]
    fn durable_commit_survives_restart() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test");
        {
            let store = PersistentStore::open_default(&path).unwrap();
            store.add_fact("a", "p", "b").unwrap();
        }
        let store = PersistentStore::open_default(&path).unwrap();
        let s = store.get_node_id("a").unwrap().unwrap();
        let p = store.get_node_id("p").unwrap().unwrap();
        let results = store
            .lookup(Criteria {
                s: Some(s),
                p: Some(p),
                o: None,
            })
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn flush_then_reopen_preserves_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test");
        {
            let store = PersistentStore::open_default(&path).unwrap();
            store.add_fact("a", "p", "b").unwrap();
            store.flush().unwrap();
        }
        let store = PersistentStore::open_default(&path).unwrap();
        let s = store.get_node_id("a").unwrap().unwrap();
        let p = store.get_node_id("p").unwrap().unwrap();
        let results = store
            .lookup(Criteria {
                s: Some(s),
                p: Some(p),
                o: None,
            })
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn delete_then_readd_tombstone_reclaim() {
        let (_dir, store) = open_temp();
        store.add_fact("a", "p", "b").unwrap();
        store.delete_fact("a", "p", "b").unwrap();
        let s = store.get_node_id("a").unwrap().unwrap();
        let p = store.get_node_id("p").unwrap().unwrap();
        let results = store
            .lookup(Criteria {
                s: Some(s),
                p: Some(p),
                o: None,
            })
            .unwrap();
        assert!(results.is_empty());
    }
}
