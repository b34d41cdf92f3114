//! # SynapseDB
//!
//! An embeddable, persistent triple-store and property-graph database.
//! Facts are (subject, predicate, object) triples, each component
//! interned through a string dictionary; nodes and edges may carry
//! arbitrary JSON-shaped property maps alongside the triples that name
//! them.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     PersistentStore                       │
//! │  ┌────────────┐  ┌───────────────┐  ┌───────────────────┐ │
//! │  │ Dictionary │  │ Six-Order     │  │ Property + Inverted│ │
//! │  │            │  │ Index + WAL   │  │ Index              │ │
//! │  └─────┬──────┘  └──────┬────────┘  └──────────┬─────────┘ │
//! │        │    flush       │    flush             │           │
//! │        └────────►       └────────►              │          │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │      Paged index (.pages/) + Manifest (JSON)        │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │   Compaction / GC / Repair maintenance operations    │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`store`] | `PersistentStore` — the top-level orchestrator: open, facts, batches, snapshots |
//! | [`dict`] | String &lt;-&gt; id interning table |
//! | [`triple`] | In-memory deduplicated live triple set |
//! | [`sixindex`] | Six-order covering index (SPO/SOP/POS/PSO/OSP/OPS) |
//! | [`property`] | Node/edge property maps |
//! | [`inverted`] | Property value inverted index, backs `whereProperty` |
//! | [`wal`] | CRC-protected write-ahead log with nested-batch replay |
//! | [`header`] | Container file header and section framing |
//! | [`manifest`] | JSON-encoded description of the on-disk paged index |
//! | [`page`] | Paged index blob writer/reader |
//! | [`txids`] | Cross-restart idempotency registry for transaction ids |
//! | [`readers`] | Reader epoch pins and the exclusive writer lock |
//! | [`staging`] | LSM-lite write staging ahead of the covering index |
//! | [`hotness`] | Decaying per-primary access counters driving compaction |
//! | [`compaction`] | Rewrite and incremental page compaction |
//! | [`gc`] | Orphaned page and stale reader reclamation |
//! | [`repair`] | Integrity checking and rebuild |
//! | [`query`] | Frontier-based query builder |
//! | [`path`] | BFS, bidirectional BFS, variable-length, and A* path engines |
//! | [`config`] | `StoreConfig` — durability, compaction, and compression tuning |
//! | [`error`] | Unified `Error`/`Result` |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use synapsedb::{PersistentStore, StoreConfig};
//! use synapsedb::sixindex::Criteria;
//!
//! let store = PersistentStore::open("/tmp/my_graph", StoreConfig::default()).unwrap();
//!
//! store.add_fact("alice", "knows", "bob").unwrap();
//! let alice = store.get_node_id("alice").unwrap().unwrap();
//! let knows = store.get_node_id("knows").unwrap().unwrap();
//!
//! let results = store
//!     .lookup(Criteria { s: Some(alice), p: Some(knows), o: None })
//!     .unwrap();
//! assert_eq!(results.len(), 1);
//!
//! store.close().unwrap();
//! ```

#![allow(dead_code)]

pub mod compaction;
pub mod config;
pub mod dict;
pub mod encoding;
pub mod error;
pub mod gc;
pub mod header;
pub mod hotness;
pub mod inverted;
pub mod manifest;
pub mod page;
pub mod path;
pub mod property;
pub mod query;
pub mod readers;
pub mod repair;
pub mod sixindex;
pub mod staging;
pub mod store;
pub mod triple;
pub mod txids;
pub mod wal;

pub use config::{Durability, StoreConfig};
pub use error::{Error, Result};
pub use store::PersistentStore;
