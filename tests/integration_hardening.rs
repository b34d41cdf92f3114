//! Public API hardening tests.
//!
//! These tests exercise edge-case configuration and error paths not
//! covered by the base lifecycle/fact/batch suite in `integration.rs`:
//! the exclusive lock's interaction with `enable_lock`, buffered vs.
//! durable commit visibility, properties attached to an edge whose
//! triple doesn't exist yet, no-op batches, and `repair::check`
//! detecting a torn WAL tail.

use std::fs::OpenOptions;
use std::io::Write;

use synapsedb::config::Durability;
use synapsedb::property::{PropertyMap, PropertyValue};
use synapsedb::sixindex::Criteria;
use synapsedb::{PersistentStore, StoreConfig};
use tempfile::TempDir;

fn wal_path_for(base: &std::path::Path) -> std::path::PathBuf {
    let mut p = base.as_os_str().to_owned();
    p.push(".synapsedb.wal");
    std::path::PathBuf::from(p)
}

// ================================================================================================
// Writer lock boundary behavior
// ================================================================================================

/// # Scenario
/// `enable_lock: false` with no pre-existing lock file succeeds.
#[test]
fn disabled_lock_with_no_existing_file_succeeds() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        enable_lock: false,
        ..StoreConfig::default()
    };
    let store = PersistentStore::open(dir.path().join("g"), config).unwrap();
    store.add_fact("a", "p", "b").unwrap();
}

/// # Scenario
/// `enable_lock: false` still refuses to open over an existing lock file
/// rather than silently assuming it's stale.
#[test]
fn disabled_lock_rejects_preexisting_lock_file() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("g");
    let mut lock_path = base.as_os_str().to_owned();
    lock_path.push(".synapsedb.lock");
    std::fs::write(std::path::PathBuf::from(lock_path), b"").unwrap();

    let config = StoreConfig {
        enable_lock: false,
        ..StoreConfig::default()
    };
    assert!(PersistentStore::open(&base, config).is_err());
}

// ================================================================================================
// Durability modes
// ================================================================================================

/// # Scenario
/// Buffered durability still appends every record to the WAL; it only
/// skips the per-commit fsync, so in-process reads remain correct.
#[test]
fn buffered_durability_is_still_readable_without_flush() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        durability: Durability::Buffered,
        ..StoreConfig::default()
    };
    let store = PersistentStore::open(dir.path().join("g"), config).unwrap();
    store.add_fact("a", "p", "b").unwrap();

    let s = store.get_node_id("a").unwrap().unwrap();
    let p = store.get_node_id("p").unwrap().unwrap();
    assert_eq!(
        store
            .lookup(Criteria {
                s: Some(s),
                p: Some(p),
                o: None
            })
            .unwrap()
            .len(),
        1
    );
}

// ================================================================================================
// Edge properties on a not-yet-existing edge
// ================================================================================================

/// # Scenario
/// Setting properties on an edge key whose underlying triple doesn't
/// exist yet is legal; the properties become associated with the triple
/// the moment it's added.
#[test]
fn edge_properties_may_precede_the_triple() {
    let dir = TempDir::new().unwrap();
    let store = PersistentStore::open(dir.path().join("g"), StoreConfig::default()).unwrap();
    let s = store.get_or_create_id("a").unwrap();
    let p = store.get_or_create_id("p").unwrap();
    let o = store.get_or_create_id("b").unwrap();
    let edge = synapsedb::triple::EncodedTriple::new(s, p, o);

    let mut props = PropertyMap::new();
    props.insert("weight".to_string(), PropertyValue::Int(7));
    store.set_edge_properties(edge, props.clone()).unwrap();
    assert_eq!(store.get_edge_properties(&edge).unwrap(), Some(props));

    // The triple itself is still absent until explicitly added.
    assert!(store
        .lookup(Criteria {
            s: Some(s),
            p: Some(p),
            o: Some(o)
        })
        .unwrap()
        .is_empty());

    store.add_fact("a", "p", "b").unwrap();
    assert_eq!(
        store
            .lookup(Criteria {
                s: Some(s),
                p: Some(p),
                o: Some(o)
            })
            .unwrap()
            .len(),
        1
    );
}

// ================================================================================================
// No-op batches
// ================================================================================================

/// # Scenario
/// A batch that is opened and committed without any writes inside it is
/// a harmless no-op.
#[test]
fn empty_batch_commit_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let store = PersistentStore::open(dir.path().join("g"), StoreConfig::default()).unwrap();
    store.begin_batch(None, None).unwrap();
    store.commit_batch(None, None).unwrap();
    store.flush().unwrap();
}

/// # Scenario
/// A batch that is opened and aborted without any writes inside it is
/// a harmless no-op.
#[test]
fn empty_batch_abort_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let store = PersistentStore::open(dir.path().join("g"), StoreConfig::default()).unwrap();
    store.begin_batch(None, None).unwrap();
    store.abort_batch().unwrap();
}

// ================================================================================================
// Repair detects a torn WAL tail
// ================================================================================================

/// # Scenario
/// A WAL with one valid record followed by a hand-truncated record (the
/// expected shape of a crash mid-write) is reported unhealthy by
/// `repair::check`, with `wal_safe_offset` short of the file's full
/// length.
#[test]
fn check_detects_torn_wal_tail() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("g");
    let store = PersistentStore::open(&base, StoreConfig::default()).unwrap();
    store.add_fact("a", "p", "b").unwrap();

    let wal_path = wal_path_for(&base);
    {
        let mut f = OpenOptions::new().append(true).open(&wal_path).unwrap();
        // A record header claiming a payload far larger than what
        // follows: structurally a torn trailing write.
        f.write_all(&[0x10, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0]).unwrap();
    }

    let report = synapsedb::repair::check(&base);
    assert!(!report.wal_ok);
    assert!(report.wal_safe_offset < report.wal_file_len);
}
