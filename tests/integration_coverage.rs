//! Extra integration tests targeting query, path, and repair surfaces
//! not exercised by the base lifecycle/fact/batch suite in
//! `integration.rs`.
//!
//! These tests exercise:
//! - `QueryBuilder` chaining off `PersistentStore::query`
//! - `whereProperty` against the inverted index
//! - Path engines (`bfs_shortest_path`, `bidirectional_bfs`, `a_star`)
//!   over a captured snapshot
//! - `withSnapshot` epoch pinning
//! - `repair::check`/`repair::repair_fast` against a store's on-disk
//!   files, invoked independently of an open handle

use synapsedb::path::{self, Direction, Heuristic};
use synapsedb::property::{PropertyMap, PropertyValue};
use synapsedb::query::{Comparison, QueryBuilder, Record, Target, Uniqueness};
use synapsedb::sixindex::Criteria;
use synapsedb::{PersistentStore, StoreConfig};
use tempfile::TempDir;

fn chain_store(dir: &TempDir, n: u32) -> PersistentStore {
    let store = PersistentStore::open(dir.path().join("g"), StoreConfig::default()).unwrap();
    for i in 0..n - 1 {
        store
            .add_fact(&format!("n{i}"), "next", &format!("n{}", i + 1))
            .unwrap();
    }
    store
}

// ================================================================================================
// Query builder
// ================================================================================================

/// # Scenario
/// `find` anchors the frontier, `follow` walks one hop, and the result
/// resolves back to node values.
#[test]
fn query_find_then_follow() {
    let dir = TempDir::new().unwrap();
    let store = chain_store(&dir, 3);
    let snapshot = store.query().unwrap();
    let result = QueryBuilder::new(snapshot)
        .find(Some("n0"), None, None)
        .follow("next")
        .collect();
    assert_eq!(
        result,
        vec![Record {
            subject: "n0".to_string(),
            predicate: "next".to_string(),
            object: "n1".to_string(),
        }]
    );
}

/// # Scenario
/// `followPath` with a narrow `{min: 3, max: 3}` range returns only the
/// edge walked at that depth, not every hop along the way.
#[test]
fn query_follow_path_multi_hop() {
    let dir = TempDir::new().unwrap();
    let store = chain_store(&dir, 4);
    let snapshot = store.query().unwrap();
    let result = QueryBuilder::new(snapshot)
        .find(Some("n0"), None, None)
        .follow_path("next", 3, 3, Uniqueness::Node)
        .collect();
    assert_eq!(
        result,
        vec![Record {
            subject: "n2".to_string(),
            predicate: "next".to_string(),
            object: "n3".to_string(),
        }]
    );
}

/// # Scenario
/// `whereProperty` filters a followed frontier down to the fact whose
/// object carries a matching property.
#[test]
fn query_where_property_filters_frontier() {
    let dir = TempDir::new().unwrap();
    let store = PersistentStore::open(dir.path().join("g"), StoreConfig::default()).unwrap();
    store.add_fact("a", "p", "x").unwrap();
    store.add_fact("a", "p", "y").unwrap();
    let x = store.get_node_id("x").unwrap().unwrap();

    let mut tagged = PropertyMap::new();
    tagged.insert("kind".to_string(), PropertyValue::String("target".into()));
    store.set_node_properties(x, tagged.clone()).unwrap();

    let snapshot = store.query().unwrap();
    let result = QueryBuilder::new(snapshot)
        .find(Some("a"), None, None)
        .follow("p")
        .where_property("kind", Comparison::Eq, &PropertyValue::String("target".into()), Target::Node)
        .all();
    assert_eq!(
        result,
        vec![Record {
            subject: "a".to_string(),
            predicate: "p".to_string(),
            object: "x".to_string(),
        }]
    );
}

/// # Scenario
/// `union` deduplicates while `unionAll` preserves duplicates.
#[test]
fn query_union_vs_union_all() {
    let dir = TempDir::new().unwrap();
    let store = PersistentStore::open(dir.path().join("g"), StoreConfig::default()).unwrap();
    store.add_fact("a", "p", "b").unwrap();
    let snapshot = store.query().unwrap();
    let left = QueryBuilder::new(snapshot).find(Some("a"), None, None).follow("p");
    let right = left.clone();
    assert_eq!(left.union(&right).all().len(), 1);
    assert_eq!(left.union_all(&right).all().len(), 2);
}

// ================================================================================================
// Path engines
// ================================================================================================

/// # Scenario
/// BFS, bidirectional BFS, and A* all agree on the shortest path length
/// over the same chain-shaped graph.
#[test]
fn path_engines_agree_on_chain_length() {
    let dir = TempDir::new().unwrap();
    let store = chain_store(&dir, 6);
    let snapshot = store.query().unwrap();
    let n0 = snapshot.id_of("n0").unwrap();
    let n5 = snapshot.id_of("n5").unwrap();

    let bfs = path::bfs_shortest_path(&snapshot, n0, n5, None, Direction::Forward, 10).unwrap();
    let bidi = path::bidirectional_bfs(&snapshot, n0, n5, None, 10).unwrap();
    let astar = path::a_star(&snapshot, n0, n5, None, Direction::Forward, Heuristic::IdDifference).unwrap();

    assert_eq!(bfs.len(), 6);
    assert_eq!(bidi.len(), 6);
    assert_eq!(astar.len(), 6);
}

/// # Scenario
/// A max-hop budget too small to reach the target yields no path rather
/// than an error.
#[test]
fn path_bfs_respects_max_hops_budget() {
    let dir = TempDir::new().unwrap();
    let store = chain_store(&dir, 6);
    let snapshot = store.query().unwrap();
    let n0 = snapshot.id_of("n0").unwrap();
    let n5 = snapshot.id_of("n5").unwrap();
    assert!(path::bfs_shortest_path(&snapshot, n0, n5, None, Direction::Forward, 2).is_none());
}

// ================================================================================================
// Snapshot pinning
// ================================================================================================

/// # Scenario
/// `withSnapshot` captures the graph as of the call; facts added and
/// flushed afterward are invisible through the already-captured
/// snapshot.
#[test]
fn with_snapshot_is_unaffected_by_later_writes() {
    let dir = TempDir::new().unwrap();
    let store = PersistentStore::open(dir.path().join("g"), StoreConfig::default()).unwrap();
    store.add_fact("a", "p", "b").unwrap();
    let snapshot = store.with_snapshot().unwrap();

    store.add_fact("a", "p", "c").unwrap();
    store.flush().unwrap();

    let a = snapshot.id_of("a").unwrap();
    let p = snapshot.id_of("p").unwrap();
    let results = snapshot.triples(Criteria {
        s: Some(a),
        p: Some(p),
        o: None,
    });
    assert_eq!(results.len(), 1);
}

// ================================================================================================
// Repair against on-disk files
// ================================================================================================

/// # Scenario
/// After closing a store, `repair::check` reports it healthy; flipping a
/// byte in one page file makes `check` flag exactly that corruption, and
/// `repair::repair_fast` restores queryability without touching other
/// orders' pages.
#[test]
fn repair_check_and_fast_repair_round_trip() {
    use synapsedb::repair;

    let dir = TempDir::new().unwrap();
    let base = dir.path().join("g");
    {
        let store = PersistentStore::open(&base, StoreConfig::default()).unwrap();
        store.add_fact("a", "p", "b").unwrap();
        store.add_fact("a", "p", "c").unwrap();
        store.flush().unwrap();
        store.close().unwrap();
    }

    let report = repair::check(&base);
    assert!(report.is_healthy());

    let pages_path = {
        let mut p = base.as_os_str().to_owned();
        p.push(".synapsedb.pages");
        std::path::PathBuf::from(p)
    };
    let spo_path = synapsedb::page::PageFile::path_for(&pages_path, synapsedb::sixindex::Order::Spo);
    let mut bytes = std::fs::read(&spo_path).unwrap();
    assert!(!bytes.is_empty());
    bytes[0] ^= 0xFF;
    std::fs::write(&spo_path, bytes).unwrap();

    let report = repair::check(&base);
    assert!(!report.bad_pages.is_empty());

    repair::repair_fast(&base, &StoreConfig::default(), &report.bad_pages).unwrap();
    assert!(repair::check(&base).is_healthy());

    let store = PersistentStore::open(&base, StoreConfig::default()).unwrap();
    let s = store.get_node_id("a").unwrap().unwrap();
    let p = store.get_node_id("p").unwrap().unwrap();
    let results = store
        .lookup(Criteria {
            s: Some(s),
            p: Some(p),
            o: None,
        })
        .unwrap();
    assert_eq!(results.len(), 2);
}
