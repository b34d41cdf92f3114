//! Micro-benchmarks for SynapseDB core operations.
//!
//! Uses Criterion for statistically rigorous measurement with regression
//! detection and HTML reports.
//!
//! # Running
//!
//! ```bash
//! cargo bench --bench micro              # run all micro-benchmarks
//! cargo bench --bench micro -- lookup    # filter by name
//! ```
//!
//! Reports are generated in `target/criterion/report/index.html`.

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use synapsedb::config::Durability;
use synapsedb::path::{self, Direction, Heuristic};
use synapsedb::property::{PropertyMap, PropertyValue};
use synapsedb::query::QueryBuilder;
use synapsedb::sixindex::Criteria;
use synapsedb::{PersistentStore, StoreConfig};
use tempfile::TempDir;

// ------------------------------------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------------------------------------

/// Subject/object label for node `i`.
fn node(i: u64) -> String {
    format!("node-{i:012}")
}

/// Open a store with a small staging flush threshold so background
/// flushing behavior is exercised during sustained-write benchmarks.
fn open_small_staging(dir: &std::path::Path) -> PersistentStore {
    PersistentStore::open(
        dir.join("g"),
        StoreConfig {
            staging_flush_threshold: 64,
            ..StoreConfig::default()
        },
    )
    .expect("open")
}

/// Open a store with a large staging threshold so inserts accumulate in
/// the in-memory staging area without triggering a flush.
fn open_memtable_only(dir: &std::path::Path) -> PersistentStore {
    PersistentStore::open(
        dir.join("g"),
        StoreConfig {
            staging_flush_threshold: 1_000_000,
            ..StoreConfig::default()
        },
    )
    .expect("open")
}

/// Insert a chain of `n` facts `node-0 --p--> node-1 --p--> ... node-(n-1)`
/// and flush to pages.
fn prepopulate_chain(dir: &std::path::Path, n: u64) {
    let store = open_small_staging(dir);
    for i in 0..n - 1 {
        store.add_fact(&node(i), "next", &node(i + 1)).unwrap();
    }
    store.flush().unwrap();
    store.close().unwrap();
}

/// Insert `n` facts sharing one predicate but with distinct subjects and
/// objects, and flush to pages.
fn prepopulate_flat(dir: &std::path::Path, n: u64) {
    let store = open_small_staging(dir);
    for i in 0..n {
        store.add_fact(&node(i), "tag", "common").unwrap();
    }
    store.flush().unwrap();
    store.close().unwrap();
}

// ================================================================================================
// Write benchmarks
// ================================================================================================

/// Benchmark group for `add_fact`.
///
/// # Sub-benchmarks
///
/// ## `memtable_only`
///
/// **Scenario:** Adds a fact with a fresh subject/object pair into a store
/// configured with a huge staging threshold, so no flush occurs during
/// measurement.
///
/// **What it measures:** The cost of dictionary interning plus a six-order
/// index insert and WAL append, without paged-index I/O.
///
/// ## `durable_vs_buffered`
///
/// **Scenario:** Same as above, comparing `Durability::Durable` (fsync
/// every commit) against `Durability::Buffered` (WAL append without
/// fsync).
///
/// **What it measures:** The fsync overhead isolated from everything else
/// in the write path.
fn bench_add_fact(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_fact");

    group.bench_function("memtable_only", |b| {
        let dir = TempDir::new().unwrap();
        let store = open_memtable_only(dir.path());
        let mut seq = 0u64;

        b.iter(|| {
            let s = node(seq);
            store.add_fact(black_box(&s), "p", "common").unwrap();
            seq += 1;
        });

        store.close().unwrap();
    });

    for &durability in &[Durability::Durable, Durability::Buffered] {
        let label = match durability {
            Durability::Durable => "durable",
            Durability::Buffered => "buffered",
        };
        group.bench_function(BenchmarkId::new("durable_vs_buffered", label), |b| {
            let dir = TempDir::new().unwrap();
            let store = PersistentStore::open(
                dir.path().join("g"),
                StoreConfig {
                    staging_flush_threshold: 1_000_000,
                    durability,
                    ..StoreConfig::default()
                },
            )
            .unwrap();
            let mut seq = 0u64;

            b.iter(|| {
                let s = node(seq);
                store.add_fact(black_box(&s), "p", "common").unwrap();
                seq += 1;
            });

            store.close().unwrap();
        });
    }

    group.bench_function("sequential_with_flush", |b| {
        let dir = TempDir::new().unwrap();
        let store = open_small_staging(dir.path());
        let mut seq = 0u64;

        b.iter(|| {
            let s = node(seq);
            store.add_fact(black_box(&s), "p", "common").unwrap();
            seq += 1;
        });

        store.close().unwrap();
    });

    group.finish();
}

// ================================================================================================
// Lookup benchmarks
// ================================================================================================

/// Benchmark group for six-order lookups via `PersistentStore::lookup`.
///
/// # Sub-benchmarks
///
/// ## `spo_exact`, `sp_prefix`, `o_only`
///
/// **Scenario:** 10,000 flat facts (distinct subjects, one shared
/// predicate/object) are flushed to pages, then queried with criteria of
/// varying selectivity: a fully bound triple (`spo_exact`), a bound
/// subject+predicate (`sp_prefix`), and an object-only criteria that must
/// scan the OSP/OPS order (`o_only`).
///
/// **What it measures:** `Criteria::best_order` dispatch cost plus the
/// underlying page read/resolve path for each selectivity tier.
fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    let n = 10_000u64;

    let dir = TempDir::new().unwrap();
    prepopulate_flat(dir.path(), n);
    let store = PersistentStore::open(dir.path().join("g"), StoreConfig::default()).unwrap();
    let common = store.get_node_id("common").unwrap().unwrap();
    let tag = store.get_node_id("tag").unwrap().unwrap();

    group.bench_function("spo_exact", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let s = store.get_node_id(&node(i % n)).unwrap().unwrap();
            let results = store
                .lookup(black_box(Criteria {
                    s: Some(s),
                    p: Some(tag),
                    o: Some(common),
                }))
                .unwrap();
            black_box(&results);
            i += 1;
        });
    });

    group.bench_function("sp_prefix", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let s = store.get_node_id(&node(i % n)).unwrap().unwrap();
            let results = store
                .lookup(black_box(Criteria { s: Some(s), p: Some(tag), o: None }))
                .unwrap();
            black_box(&results);
            i += 1;
        });
    });

    group.throughput(Throughput::Elements(n));
    group.bench_function("o_only", |b| {
        b.iter(|| {
            let results = store
                .lookup(black_box(Criteria { s: None, p: None, o: Some(common) }))
                .unwrap();
            black_box(&results);
        });
    });

    store.close().unwrap();
    group.finish();
}

// ================================================================================================
// Property benchmarks
// ================================================================================================

/// Benchmark group for node property set/get.
///
/// # Sub-benchmarks
///
/// ## `set` and `get`
///
/// **Scenario:** Sets (or reads back) a five-key property map on a
/// single node per iteration.
///
/// **What it measures:** Property map encoding/decoding cost and the
/// inverted-index maintenance triggered by `set_node_properties`.
fn bench_property(c: &mut Criterion) {
    let mut group = c.benchmark_group("property");

    let mut props = PropertyMap::new();
    props.insert("age".to_string(), PropertyValue::Int(30));
    props.insert("active".to_string(), PropertyValue::Bool(true));
    props.insert("name".to_string(), PropertyValue::String("alice".into()));
    props.insert("score".to_string(), PropertyValue::Float(3.5));
    props.insert(
        "tags".to_string(),
        PropertyValue::List(vec![PropertyValue::String("a".into()), PropertyValue::String("b".into())]),
    );

    group.bench_function("set", |b| {
        let dir = TempDir::new().unwrap();
        let store = open_memtable_only(dir.path());
        let mut seq = 0u64;
        b.iter(|| {
            let id = store.get_or_create_id(&node(seq)).unwrap();
            store.set_node_properties(id, black_box(props.clone())).unwrap();
            seq += 1;
        });
        store.close().unwrap();
    });

    group.bench_function("get", |b| {
        let dir = TempDir::new().unwrap();
        let store = open_memtable_only(dir.path());
        let id = store.get_or_create_id("alice").unwrap();
        store.set_node_properties(id, props.clone()).unwrap();
        b.iter(|| {
            let result = store.get_node_properties(black_box(id)).unwrap();
            black_box(&result);
        });
        store.close().unwrap();
    });

    group.finish();
}

// ================================================================================================
// Path engine benchmarks
// ================================================================================================

/// Benchmark group for path-finding over a chain-shaped graph.
///
/// # Sub-benchmarks
///
/// ## `bfs/{100,1000}`, `bidirectional/{100,1000}`, `a_star/{100,1000}`
///
/// **Scenario:** A linear chain of N nodes connected by one predicate;
/// each benchmark finds the shortest path from the first to the last
/// node.
///
/// **What it measures:** Relative traversal cost of single-direction BFS,
/// bidirectional BFS, and A* with an id-difference heuristic over graphs
/// of increasing diameter.
fn bench_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("path");
    group.sample_size(20);

    for &n in &[100u64, 1_000] {
        let dir = TempDir::new().unwrap();
        prepopulate_chain(dir.path(), n);
        let store = PersistentStore::open(dir.path().join("g"), StoreConfig::default()).unwrap();
        let snapshot = store.query().unwrap();
        let source = snapshot.id_of(&node(0)).unwrap();
        let target = snapshot.id_of(&node(n - 1)).unwrap();

        group.bench_function(BenchmarkId::new("bfs", n), |b| {
            b.iter(|| {
                let result = path::bfs_shortest_path(
                    &snapshot,
                    black_box(source),
                    black_box(target),
                    None,
                    Direction::Forward,
                    n as usize,
                );
                black_box(&result);
            });
        });

        group.bench_function(BenchmarkId::new("bidirectional", n), |b| {
            b.iter(|| {
                let result = path::bidirectional_bfs(&snapshot, black_box(source), black_box(target), None, n as usize);
                black_box(&result);
            });
        });

        group.bench_function(BenchmarkId::new("a_star", n), |b| {
            b.iter(|| {
                let result = path::a_star(
                    &snapshot,
                    black_box(source),
                    black_box(target),
                    None,
                    Direction::Forward,
                    Heuristic::IdDifference,
                );
                black_box(&result);
            });
        });

        store.close().unwrap();
    }

    group.finish();
}

// ================================================================================================
// Query builder benchmarks
// ================================================================================================

/// Benchmark group for `QueryBuilder` chains.
///
/// # Sub-benchmarks
///
/// ## `find_and_collect`
///
/// **Scenario:** Builds a query that anchors on a bound subject/predicate
/// and collects the resolved object values, repeated across a 1,000-fact
/// flat graph.
///
/// **What it measures:** End-to-end cost of the frontier builder pattern:
/// anchoring, resolving the matched facts, and collecting into a
/// `Vec<Record>`.
fn bench_query_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder");
    let n = 1_000u64;

    let dir = TempDir::new().unwrap();
    prepopulate_flat(dir.path(), n);
    let store = PersistentStore::open(dir.path().join("g"), StoreConfig::default()).unwrap();

    group.bench_function("find_and_collect", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let snapshot = store.query().unwrap();
            let subject = node(i % n);
            let result = QueryBuilder::new(snapshot)
                .find(Some(&subject), Some("tag"), None)
                .collect();
            black_box(&result);
            i += 1;
        });
    });

    store.close().unwrap();
    group.finish();
}

// ================================================================================================
// Recovery benchmark
// ================================================================================================

/// Benchmark group for store recovery (open) latency.
///
/// # Sub-benchmarks
///
/// ## `open_existing/{1000,10000}`
///
/// **Scenario:** A store is prepopulated with N facts and closed. Each
/// iteration opens the store from that existing state, which loads the
/// manifest and replays any un-flushed WAL tail.
///
/// **What it measures:** Cold-start recovery time — header/manifest
/// loading and dictionary/property rebuild.
fn bench_recovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("recovery");
    group.sample_size(10);

    for &count in &[1_000u64, 10_000] {
        group.bench_function(BenchmarkId::new("open_existing", count), |b| {
            let dir = TempDir::new().unwrap();
            prepopulate_flat(dir.path(), count);

            b.iter(|| {
                let store = PersistentStore::open(dir.path().join("g"), StoreConfig::default()).unwrap();
                black_box(&store);
                store.close().unwrap();
            });
        });
    }

    group.finish();
}

// ================================================================================================
// Concurrent access benchmarks
// ================================================================================================

/// Benchmark group for concurrent multi-threaded access.
///
/// `PersistentStore` wraps its state in `Arc<RwLock<Inner>>` and is
/// designed for shared access via a cloned handle.
///
/// # Sub-benchmarks
///
/// ## `writers/{1,2,4}`
///
/// **Scenario:** N threads each add 200 facts with disjoint subjects
/// through a shared store clone.
///
/// **What it measures:** Write throughput scaling under lock contention
/// on the shared `RwLock<Inner>`.
fn bench_concurrent(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");
    group.sample_size(10);

    for &num_writers in &[1u32, 2, 4] {
        group.bench_function(BenchmarkId::new("writers", num_writers), |b| {
            b.iter_batched(
                || {
                    let dir = TempDir::new().unwrap();
                    let store = open_memtable_only(dir.path());
                    (dir, store)
                },
                |(_dir, store)| {
                    let mut handles = Vec::new();
                    for t in 0..num_writers {
                        let store = store.clone();
                        handles.push(std::thread::spawn(move || {
                            for i in 0..200u64 {
                                store.add_fact(&format!("w{t}-{i}"), "p", "common").unwrap();
                            }
                        }));
                    }
                    for h in handles {
                        h.join().unwrap();
                    }
                },
                BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

// ================================================================================================
// Group registration
// ================================================================================================

criterion_group!(
    benches,
    bench_add_fact,
    bench_lookup,
    bench_property,
    bench_path,
    bench_query_builder,
    bench_recovery,
    bench_concurrent,
);

criterion_main!(benches);
