//! Query Frontier & Builder.
//!
//! An immutable, chainable query over a captured point-in-time view of
//! the graph. Every combinator returns a new [`QueryBuilder`] rather than
//! mutating one in place, so a builder can be branched (e.g. to build a
//! `union` of two follow-paths) without the branches interfering with
//! each other. `[Symbol.asyncIterator]`-style streaming is modeled as a
//! plain synchronous [`Iterator`] (see [`QueryBuilder::stream`]) — this
//! crate's concurrency model has no async runtime, and a pull-based
//! `Iterator` gives callers the same early-termination/backpressure
//! behavior a generator would.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::dict::Dictionary;
use crate::hotness::HotnessTracker;
use crate::inverted::InvertedIndex;
use crate::manifest::Manifest;
use crate::page;
use crate::property::{EdgeKey, PropertyMap, PropertyValue, PropertyStore};
use crate::sixindex::{Criteria, Order, SixOrderIndex};
use crate::triple::EncodedTriple;

/// Everything a [`QuerySnapshot`] needs to serve a read through the
/// paged index rather than the in-memory six-order index: the manifest
/// that describes where each order's pages live, the hotness counters
/// `explain()` reports against, and the pages directory/compression
/// setting needed to actually open and decode a page file.
#[derive(Clone)]
pub struct DiskContext {
    manifest: Arc<Manifest>,
    hotness: Arc<HotnessTracker>,
    pages_dir: Arc<PathBuf>,
    compressed: bool,
}

impl DiskContext {
    pub fn new(manifest: &Manifest, hotness: &HotnessTracker, pages_dir: &Path, compressed: bool) -> Self {
        DiskContext {
            manifest: Arc::new(manifest.clone()),
            hotness: Arc::new(hotness.clone()),
            pages_dir: Arc::new(pages_dir.to_path_buf()),
            compressed,
        }
    }
}

/// A read-only, point-in-time view of the graph a [`QueryBuilder`]
/// traverses. Captured by cloning the live structures under a single
/// read-lock acquisition, so every operation chained off one snapshot
/// sees a consistent graph even if writers continue to mutate the live
/// store concurrently.
#[derive(Clone)]
pub struct QuerySnapshot {
    dict: Arc<Dictionary>,
    index: Arc<SixOrderIndex>,
    properties: Arc<PropertyStore>,
    inverted: Arc<InvertedIndex>,
    disk: DiskContext,
    /// Mirrors the orchestrator's `dirty` flag at capture time: `true`
    /// means the in-memory index may hold writes the paged index
    /// doesn't have yet, so reads must go through it rather than disk.
    dirty: bool,
}

impl QuerySnapshot {
    pub fn capture(
        dict: &Dictionary,
        index: &SixOrderIndex,
        properties: &PropertyStore,
        inverted: &InvertedIndex,
        disk: &DiskContext,
        dirty: bool,
    ) -> Self {
        QuerySnapshot {
            dict: Arc::new(dict.clone()),
            index: Arc::new(index.clone()),
            properties: Arc::new(properties.clone()),
            inverted: Arc::new(inverted.clone()),
            disk: disk.clone(),
            dirty,
        }
    }

    pub fn value_of(&self, id: u32) -> Option<&str> {
        self.dict.get_value(id)
    }

    pub fn id_of(&self, value: &str) -> Option<u32> {
        self.dict.get_id(value)
    }

    /// Resolve `criteria` against the graph. When the live state is
    /// dirty (holds writes not yet flushed to the paged index), this
    /// reads the in-memory six-order index directly, matching §4.10's
    /// "queries must consult the in-memory triple set, not disk pages"
    /// rule. Otherwise it reads through the paged index, bounded to the
    /// primary the chosen order pins — the same prefix the in-memory
    /// range scan would use — falling back to the in-memory index (with
    /// a warning) if the paged read itself fails, since a snapshot read
    /// path has no repair flow of its own to hand the error to.
    pub fn triples(&self, criteria: Criteria) -> Vec<EncodedTriple> {
        if self.dirty {
            return self.index.query(criteria).collect();
        }
        let order = criteria.best_order();
        let primary = order.primary_of(&criteria);
        match page::read_order(self.disk.pages_dir.as_path(), &self.disk.manifest, order, primary, self.disk.compressed) {
            Ok(triples) => triples.into_iter().filter(|t| criteria.matches(t)).collect(),
            Err(err) => {
                warn!(error = %err, order = order.name(), "query: paged read failed, falling back to in-memory index");
                self.index.query(criteria).collect()
            }
        }
    }

    pub fn node_properties(&self, id: u32) -> Option<&PropertyMap> {
        self.properties.get_node_properties(id)
    }

    pub fn edge_properties(&self, edge: &EncodedTriple) -> Option<&PropertyMap> {
        self.properties.get_edge_properties(edge)
    }

    pub fn nodes_with_property(&self, name: &str, value: &PropertyValue) -> HashSet<u32> {
        self.inverted.nodes_eq(name, value)
    }

    /// Nodes whose `name` property satisfies `op value`, routing through
    /// the inverted index's equality or range lookup as appropriate.
    pub fn nodes_matching(&self, name: &str, op: Comparison, value: &PropertyValue) -> HashSet<u32> {
        match op {
            Comparison::Eq => self.inverted.nodes_eq(name, value),
            Comparison::Lt => self.inverted.nodes_range(name, None, Some(value), false, false),
            Comparison::Le => self.inverted.nodes_range(name, None, Some(value), false, true),
            Comparison::Gt => self.inverted.nodes_range(name, Some(value), None, false, false),
            Comparison::Ge => self.inverted.nodes_range(name, Some(value), None, true, false),
        }
    }

    /// Edge counterpart of [`Self::nodes_matching`].
    pub fn edges_matching(&self, name: &str, op: Comparison, value: &PropertyValue) -> HashSet<EdgeKey> {
        match op {
            Comparison::Eq => self.inverted.edges_eq(name, value),
            Comparison::Lt => self.inverted.edges_range(name, None, Some(value), false, false),
            Comparison::Le => self.inverted.edges_range(name, None, Some(value), false, true),
            Comparison::Gt => self.inverted.edges_range(name, Some(value), None, false, false),
            Comparison::Ge => self.inverted.edges_range(name, Some(value), None, true, false),
        }
    }

    /// Resolve a triple's dictionary ids back into a [`Record`]; `None`
    /// if any id has since been evicted from the dictionary (never
    /// happens in this crate's current lifecycle, but the API stays
    /// honest about the possibility).
    pub fn resolve(&self, t: &EncodedTriple) -> Option<Record> {
        Some(Record {
            subject: self.value_of(t.s)?.to_string(),
            predicate: self.value_of(t.p)?.to_string(),
            object: self.value_of(t.o)?.to_string(),
        })
    }

    fn pages_for_primary(&self, order: Order, primary: u32) -> usize {
        self.disk
            .manifest
            .pages_for(order)
            .iter()
            .filter(|entry| entry.primary_value == primary)
            .count()
    }

    fn hotness_score(&self, order: Order, primary: u32) -> f64 {
        self.disk.hotness.score(order, primary)
    }
}

/// How repeated visits are handled during multi-hop traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
    /// A node already in the frontier's history is never revisited.
    Node,
    /// An edge already traversed is never retraversed, but a node may be
    /// revisited via a different edge.
    Edge,
    /// No deduplication; the same node/edge may appear arbitrarily often.
    None,
}

/// Which side(s) of a fact feed the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Subject,
    Object,
    Both,
}

/// Comparison operator for [`QueryBuilder::where_property`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Whether [`QueryBuilder::where_property`] tests a node or an edge
/// property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Node,
    Edge,
}

/// One materialized `(subject, predicate, object)` record, resolved back
/// to dictionary values. The terminal shape every `QueryBuilder`
/// terminator yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

/// The read-side plan `explain()` reports: which order a lookup would
/// use, the narrowest limit accumulated along the chain, the current
/// materialized record count, and the page-count/hotness figures for
/// the primary that order pins.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub order: &'static str,
    pub upper_bound: Option<usize>,
    pub estimated_output: usize,
    pub pages_for_primary: usize,
    pub hotness_primary: f64,
}

fn derive_frontier(facts: &[EncodedTriple], orientation: Orientation) -> Vec<u32> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for t in facts {
        match orientation {
            Orientation::Subject => {
                if seen.insert(t.s) {
                    out.push(t.s);
                }
            }
            Orientation::Object => {
                if seen.insert(t.o) {
                    out.push(t.o);
                }
            }
            Orientation::Both => {
                if seen.insert(t.s) {
                    out.push(t.s);
                }
                if seen.insert(t.o) {
                    out.push(t.o);
                }
            }
        }
    }
    out
}

/// An immutable, chainable query frontier.
#[derive(Clone)]
pub struct QueryBuilder {
    snapshot: QuerySnapshot,
    facts: Vec<EncodedTriple>,
    frontier: Vec<u32>,
    orientation: Orientation,
    last_criteria: Option<Criteria>,
    limit_bound: Option<usize>,
    pinned_epoch: Option<u64>,
}

impl QueryBuilder {
    pub fn new(snapshot: QuerySnapshot) -> Self {
        QueryBuilder {
            snapshot,
            facts: Vec::new(),
            frontier: Vec::new(),
            orientation: Orientation::Subject,
            last_criteria: None,
            limit_bound: None,
            pinned_epoch: None,
        }
    }

    /// Build the next builder state from a fresh fact list, recomputing
    /// the frontier from `orientation` and resetting the accumulated
    /// limit (a new traversal step invalidates any prior page-count
    /// estimate tied to the old frontier).
    fn advance(&self, facts: Vec<EncodedTriple>, orientation: Orientation, criteria: Option<Criteria>) -> Self {
        let frontier = derive_frontier(&facts, orientation);
        QueryBuilder {
            snapshot: self.snapshot.clone(),
            facts,
            frontier,
            orientation,
            last_criteria: criteria,
            limit_bound: None,
            pinned_epoch: self.pinned_epoch,
        }
    }

    /// Re-derive the frontier from a filtered fact list without touching
    /// orientation, criteria, or the accumulated limit — used by the
    /// filtering/union combinators, which narrow an existing result
    /// rather than issue a new index lookup.
    fn rebuild(&self, facts: Vec<EncodedTriple>) -> Self {
        let frontier = derive_frontier(&facts, self.orientation);
        QueryBuilder {
            snapshot: self.snapshot.clone(),
            facts,
            frontier,
            orientation: self.orientation,
            last_criteria: self.last_criteria,
            limit_bound: self.limit_bound,
            pinned_epoch: self.pinned_epoch,
        }
    }

    fn side(&self, t: &EncodedTriple, predicate: &impl Fn(u32) -> bool) -> bool {
        match self.orientation {
            Orientation::Subject => predicate(t.s),
            Orientation::Object => predicate(t.o),
            Orientation::Both => predicate(t.s) || predicate(t.o),
        }
    }

    /// Anchor the frontier to the pattern's matching facts. Orientation
    /// defaults by which components are bound: subject-side if subject
    /// given, object-side if only object given, both if both given
    /// (matching neither falls back to subject-side, the same default a
    /// fully wildcard `find({})` used before orientation existed).
    pub fn find(&self, s: Option<&str>, p: Option<&str>, o: Option<&str>) -> Self {
        let criteria = Criteria {
            s: s.and_then(|v| self.snapshot.id_of(v)),
            p: p.and_then(|v| self.snapshot.id_of(v)),
            o: o.and_then(|v| self.snapshot.id_of(v)),
        };
        let orientation = match (s.is_some(), o.is_some()) {
            (true, true) => Orientation::Both,
            (true, false) => Orientation::Subject,
            (false, true) => Orientation::Object,
            (false, false) => Orientation::Subject,
        };
        let facts = self.snapshot.triples(criteria);
        self.advance(facts, orientation, Some(criteria))
    }

    /// Change orientation without re-querying; the frontier is
    /// recomputed from the current facts under the new orientation.
    pub fn anchor(&self, side: Orientation) -> Self {
        let frontier = derive_frontier(&self.facts, side);
        QueryBuilder {
            snapshot: self.snapshot.clone(),
            facts: self.facts.clone(),
            frontier,
            orientation: side,
            last_criteria: self.last_criteria,
            limit_bound: self.limit_bound,
            pinned_epoch: self.pinned_epoch,
        }
    }

    /// Move from every node in the frontier to every object reachable via
    /// `predicate`.
    pub fn follow(&self, predicate: &str) -> Self {
        let Some(p_id) = self.snapshot.id_of(predicate) else {
            return self.advance(Vec::new(), Orientation::Object, None);
        };
        let mut facts = Vec::new();
        for &s in &self.frontier {
            facts.extend(self.snapshot.triples(Criteria {
                s: Some(s),
                p: Some(p_id),
                o: None,
            }));
        }
        let criteria = self.frontier.first().map(|&s| Criteria {
            s: Some(s),
            p: Some(p_id),
            o: None,
        });
        self.advance(facts, Orientation::Object, criteria)
    }

    /// Move from every node in the frontier to every subject that reaches
    /// it via `predicate` (the reverse direction of [`Self::follow`]).
    pub fn follow_reverse(&self, predicate: &str) -> Self {
        let Some(p_id) = self.snapshot.id_of(predicate) else {
            return self.advance(Vec::new(), Orientation::Subject, None);
        };
        let mut facts = Vec::new();
        for &o in &self.frontier {
            facts.extend(self.snapshot.triples(Criteria {
                s: None,
                p: Some(p_id),
                o: Some(o),
            }));
        }
        let criteria = self.frontier.first().map(|&o| Criteria {
            s: None,
            p: Some(p_id),
            o: Some(o),
        });
        self.advance(facts, Orientation::Subject, criteria)
    }

    /// BFS layer-by-layer expansion from the current frontier, collecting
    /// every edge walked at a depth within `[min, max]` (depth 1 is the
    /// first hop). `uniqueness` governs a visited set applied across the
    /// whole walk, not just within the collected range, so a later layer
    /// can't re-enter a node/edge an earlier layer already claimed.
    pub fn follow_path(&self, predicate: &str, min: usize, max: usize, uniqueness: Uniqueness) -> Self {
        let Some(p_id) = self.snapshot.id_of(predicate) else {
            return self.advance(Vec::new(), Orientation::Object, None);
        };
        let mut visited_nodes: HashSet<u32> = self.frontier.iter().copied().collect();
        let mut visited_edges: HashSet<(u32, u32)> = HashSet::new();
        let mut current: HashSet<u32> = self.frontier.iter().copied().collect();
        let mut collected: Vec<EncodedTriple> = Vec::new();

        for depth in 1..=max {
            let mut next_layer = HashSet::new();
            for &s in &current {
                for t in self.snapshot.triples(Criteria {
                    s: Some(s),
                    p: Some(p_id),
                    o: None,
                }) {
                    let edge_key = (t.s, t.o);
                    match uniqueness {
                        Uniqueness::Node => {
                            if visited_nodes.contains(&t.o) {
                                continue;
                            }
                        }
                        Uniqueness::Edge => {
                            if visited_edges.contains(&edge_key) {
                                continue;
                            }
                        }
                        Uniqueness::None => {}
                    }
                    visited_edges.insert(edge_key);
                    visited_nodes.insert(t.o);
                    next_layer.insert(t.o);
                    if depth >= min {
                        collected.push(t);
                    }
                }
            }
            if next_layer.is_empty() {
                break;
            }
            current = next_layer;
        }
        self.advance(collected, Orientation::Object, None)
    }

    /// Keep only facts whose orientation-side node satisfies `predicate`
    /// (both sides, any-match, when orientation is `Both`).
    pub fn where_node<F: Fn(u32) -> bool>(&self, predicate: F) -> Self {
        let facts: Vec<EncodedTriple> =
            self.facts.iter().copied().filter(|t| self.side(t, &predicate)).collect();
        self.rebuild(facts)
    }

    /// Keep only facts whose orientation-side node (or, for an edge
    /// target, the fact itself) satisfies `name op value`. Uses the
    /// inverted index's equality/range lookup when the operator supports
    /// it, never falling back to a per-record scan since every
    /// [`Comparison`] variant has an index-backed counterpart.
    pub fn where_property(&self, name: &str, op: Comparison, value: &PropertyValue, target: Target) -> Self {
        match target {
            Target::Node => {
                let matching = self.snapshot.nodes_matching(name, op, value);
                let facts: Vec<EncodedTriple> = self
                    .facts
                    .iter()
                    .copied()
                    .filter(|t| self.side(t, &|id| matching.contains(&id)))
                    .collect();
                self.rebuild(facts)
            }
            Target::Edge => {
                let matching = self.snapshot.edges_matching(name, op, value);
                let facts: Vec<EncodedTriple> =
                    self.facts.iter().copied().filter(|t| matching.contains(t)).collect();
                self.rebuild(facts)
            }
        }
    }

    /// Keep only facts whose orientation-side node carries `label` in its
    /// conventional `"labels"` property list.
    pub fn where_label(&self, label: &str) -> Self {
        let has_label = |id: u32| {
            self.snapshot
                .node_properties(id)
                .and_then(|props| props.get("labels"))
                .map(|v| match v {
                    PropertyValue::List(items) => {
                        items.iter().any(|item| matches!(item, PropertyValue::String(s) if s == label))
                    }
                    PropertyValue::String(s) => s == label,
                    _ => false,
                })
                .unwrap_or(false)
        };
        let facts: Vec<EncodedTriple> =
            self.facts.iter().copied().filter(|t| self.side(t, &has_label)).collect();
        self.rebuild(facts)
    }

    pub fn limit(&self, n: usize) -> Self {
        let facts: Vec<EncodedTriple> = self.facts.iter().copied().take(n).collect();
        let mut next = self.rebuild(facts);
        next.limit_bound = Some(self.limit_bound.map_or(n, |existing| existing.min(n)));
        next
    }

    pub fn skip(&self, n: usize) -> Self {
        let facts: Vec<EncodedTriple> = self.facts.iter().copied().skip(n).collect();
        self.rebuild(facts)
    }

    pub fn take(&self, n: usize) -> Self {
        self.limit(n)
    }

    /// Deduplicated union with `other`'s facts, keyed by triple value.
    pub fn union(&self, other: &QueryBuilder) -> Self {
        let set: HashSet<EncodedTriple> = self.facts.iter().chain(other.facts.iter()).copied().collect();
        self.rebuild(set.into_iter().collect())
    }

    /// Non-deduplicating union with `other`'s facts.
    pub fn union_all(&self, other: &QueryBuilder) -> Self {
        let mut facts = self.facts.clone();
        facts.extend(other.facts.iter().copied());
        self.rebuild(facts)
    }

    pub fn pin(&self, epoch: u64) -> Self {
        let mut next = self.clone();
        next.pinned_epoch = Some(epoch);
        next
    }

    pub fn unpin(&self) -> Self {
        let mut next = self.clone();
        next.pinned_epoch = None;
        next
    }

    /// Every matched fact, resolved to a [`Record`].
    pub fn all(&self) -> Vec<Record> {
        self.facts.iter().filter_map(|t| self.snapshot.resolve(t)).collect()
    }

    /// Alias for [`Self::all`].
    pub fn collect(&self) -> Vec<Record> {
        self.all()
    }

    /// A pull-based iterator over the matched, resolved facts.
    pub fn stream(&self) -> impl Iterator<Item = Record> + '_ {
        self.facts.iter().filter_map(move |t| self.snapshot.resolve(t))
    }

    /// Every node id currently in the frontier (the traversal leading
    /// edge, as opposed to [`Self::all`]'s full fact records).
    pub fn frontier(&self) -> Vec<u32> {
        self.frontier.clone()
    }

    /// The read plan this builder's last lookup would use: the chosen
    /// order, the narrowest limit accumulated along the chain, the
    /// current fact count, and the page-count/hotness figures the
    /// orchestrator would consult for that order's pinned primary.
    pub fn explain(&self) -> QueryPlan {
        let criteria = self.last_criteria.unwrap_or_default();
        let order = criteria.best_order();
        let primary = order.primary_of(&criteria);
        let pages_for_primary = primary.map(|p| self.snapshot.pages_for_primary(order, p)).unwrap_or(0);
        let hotness_primary = primary.map(|p| self.snapshot.hotness_score(order, p)).unwrap_or(0.0);
        QueryPlan {
            order: order.name(),
            upper_bound: self.limit_bound,
            estimated_output: self.facts.len(),
            pages_for_primary,
            hotness_primary,
        }
    }
}
