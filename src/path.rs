//! Path Engines.
//!
//! Shortest-path and enumeration algorithms over the live triple set,
//! all expressed against a captured [`crate::query::QuerySnapshot`] so a
//! path search sees a consistent graph regardless of concurrent writers.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use crate::query::QuerySnapshot;
use crate::sixindex::Criteria;

/// Which direction(s) an edge may be traversed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
    Both,
}

fn neighbors(snapshot: &QuerySnapshot, node: u32, predicate: Option<u32>, direction: Direction) -> Vec<u32> {
    let mut out = Vec::new();
    if direction == Direction::Forward || direction == Direction::Both {
        for t in snapshot.triples(Criteria {
            s: Some(node),
            p: predicate,
            o: None,
        }) {
            out.push(t.o);
        }
    }
    if direction == Direction::Reverse || direction == Direction::Both {
        for t in snapshot.triples(Criteria {
            s: None,
            p: predicate,
            o: Some(node),
        }) {
            out.push(t.s);
        }
    }
    out
}

/// A found path: the ordered sequence of node ids from source to target
/// inclusive.
pub type NodePath = Vec<u32>;

/// Single-source breadth-first shortest path, expanding at most
/// `max_hops` layers before giving up.
pub fn bfs_shortest_path(
    snapshot: &QuerySnapshot,
    source: u32,
    target: u32,
    predicate: Option<u32>,
    direction: Direction,
    max_hops: usize,
) -> Option<NodePath> {
    if source == target {
        return Some(vec![source]);
    }
    let mut visited = HashSet::from([source]);
    let mut parent: HashMap<u32, u32> = HashMap::new();
    let mut frontier = VecDeque::from([source]);
    let mut hop = 0;

    while !frontier.is_empty() && hop < max_hops {
        hop += 1;
        let mut next_frontier = VecDeque::new();
        while let Some(node) = frontier.pop_front() {
            for next in neighbors(snapshot, node, predicate, direction) {
                if visited.insert(next) {
                    parent.insert(next, node);
                    if next == target {
                        return Some(reconstruct(&parent, source, target));
                    }
                    next_frontier.push_back(next);
                }
            }
        }
        frontier = next_frontier;
    }
    None
}

fn reconstruct(parent: &HashMap<u32, u32>, source: u32, target: u32) -> NodePath {
    let mut path = vec![target];
    let mut current = target;
    while current != source {
        current = parent[&current];
        path.push(current);
    }
    path.reverse();
    path
}

/// Bidirectional BFS: expands alternately from the source and target
/// frontiers, terminating as soon as the two meet. Finds a shortest
/// path in roughly half the layers a single-direction search would need.
pub fn bidirectional_bfs(
    snapshot: &QuerySnapshot,
    source: u32,
    target: u32,
    predicate: Option<u32>,
    max_hops: usize,
) -> Option<NodePath> {
    if source == target {
        return Some(vec![source]);
    }
    let mut forward_parent: HashMap<u32, u32> = HashMap::new();
    let mut backward_parent: HashMap<u32, u32> = HashMap::new();
    let mut forward_visited = HashSet::from([source]);
    let mut backward_visited = HashSet::from([target]);
    let mut forward_frontier = VecDeque::from([source]);
    let mut backward_frontier = VecDeque::from([target]);
    let mut hop = 0;

    while !forward_frontier.is_empty() && !backward_frontier.is_empty() && hop < max_hops {
        hop += 1;
        let mut next_forward = VecDeque::new();
        while let Some(node) = forward_frontier.pop_front() {
            for next in neighbors(snapshot, node, predicate, Direction::Forward) {
                if forward_visited.insert(next) {
                    forward_parent.insert(next, node);
                    if backward_visited.contains(&next) {
                        return Some(stitch(&forward_parent, &backward_parent, source, target, next));
                    }
                    next_forward.push_back(next);
                }
            }
        }
        forward_frontier = next_forward;

        let mut next_backward = VecDeque::new();
        while let Some(node) = backward_frontier.pop_front() {
            for next in neighbors(snapshot, node, predicate, Direction::Reverse) {
                if backward_visited.insert(next) {
                    backward_parent.insert(next, node);
                    if forward_visited.contains(&next) {
                        return Some(stitch(&forward_parent, &backward_parent, source, target, next));
                    }
                    next_backward.push_back(next);
                }
            }
        }
        backward_frontier = next_backward;
    }
    None
}

fn stitch(
    forward_parent: &HashMap<u32, u32>,
    backward_parent: &HashMap<u32, u32>,
    source: u32,
    target: u32,
    meeting: u32,
) -> NodePath {
    let mut forward_half = vec![meeting];
    let mut current = meeting;
    while current != source {
        current = forward_parent[&current];
        forward_half.push(current);
    }
    forward_half.reverse();

    let mut current = meeting;
    while current != target {
        current = backward_parent[&current];
        forward_half.push(current);
    }
    forward_half
}

/// Enumerate every simple path from `source` whose length (in hops)
/// falls within `[min_hops, max_hops]`, optionally restricted to paths
/// ending at `target`.
pub fn enumerate_variable_length(
    snapshot: &QuerySnapshot,
    source: u32,
    target: Option<u32>,
    predicate: Option<u32>,
    direction: Direction,
    min_hops: usize,
    max_hops: usize,
) -> Vec<NodePath> {
    let mut results = Vec::new();
    let mut current_path = vec![source];
    let mut on_path: HashSet<u32> = HashSet::from([source]);
    enumerate_rec(
        snapshot,
        target,
        predicate,
        direction,
        min_hops,
        max_hops,
        &mut current_path,
        &mut on_path,
        &mut results,
    );
    results
}

#[allow(clippy::too_many_arguments)]
fn enumerate_rec(
    snapshot: &QuerySnapshot,
    target: Option<u32>,
    predicate: Option<u32>,
    direction: Direction,
    min_hops: usize,
    max_hops: usize,
    current_path: &mut NodePath,
    on_path: &mut HashSet<u32>,
    results: &mut Vec<NodePath>,
) {
    let hops = current_path.len() - 1;
    let last = *current_path.last().expect("path always non-empty");
    if hops >= min_hops {
        if target.is_none_or(|t| t == last) {
            results.push(current_path.clone());
        }
    }
    if hops >= max_hops {
        return;
    }
    for next in neighbors(snapshot, last, predicate, direction) {
        if on_path.contains(&next) {
            continue; // keep paths simple (no repeated nodes)
        }
        current_path.push(next);
        on_path.insert(next);
        enumerate_rec(
            snapshot, target, predicate, direction, min_hops, max_hops, current_path, on_path, results,
        );
        current_path.pop();
        on_path.remove(&next);
    }
}

/// Heuristic function for [`a_star`].
#[derive(Debug, Clone, Copy)]
pub enum Heuristic {
    /// Admissible zero heuristic; degrades A* to Dijkstra/BFS.
    None,
    /// `|target - node|` treating ids as a proxy distance. Not
    /// necessarily admissible for arbitrary graphs, but cheap and
    /// effective when ids were assigned in roughly locality-preserving
    /// order.
    IdDifference,
    /// `sqrt(|target - node|)`.
    SqrtIdDifference,
}

impl Heuristic {
    fn estimate(&self, node: u32, target: u32) -> f64 {
        match self {
            Heuristic::None => 0.0,
            Heuristic::IdDifference => (node as i64 - target as i64).unsigned_abs() as f64,
            Heuristic::SqrtIdDifference => {
                ((node as i64 - target as i64).unsigned_abs() as f64).sqrt()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenEntry {
    f_score: f64,
    g_score: f64,
    node: u32,
}

impl Eq for OpenEntry {}
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f_score; tie-break on smaller g_score (prefer the
        // entry that's made more real progress for the same estimate).
        other
            .f_score
            .partial_cmp(&self.f_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.g_score.partial_cmp(&other.g_score).unwrap_or(Ordering::Equal))
    }
}
impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* search with unit edge weights and a configurable heuristic.
pub fn a_star(
    snapshot: &QuerySnapshot,
    source: u32,
    target: u32,
    predicate: Option<u32>,
    direction: Direction,
    heuristic: Heuristic,
) -> Option<NodePath> {
    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<u32, f64> = HashMap::from([(source, 0.0)]);
    let mut parent: HashMap<u32, u32> = HashMap::new();
    let mut closed: HashSet<u32> = HashSet::new();

    open.push(OpenEntry {
        f_score: heuristic.estimate(source, target),
        g_score: 0.0,
        node: source,
    });

    while let Some(OpenEntry { node, g_score: g, .. }) = open.pop() {
        if node == target {
            return Some(reconstruct(&parent, source, target));
        }
        if closed.contains(&node) {
            continue;
        }
        closed.insert(node);

        for next in neighbors(snapshot, node, predicate, direction) {
            let tentative_g = g + 1.0;
            let better = g_score.get(&next).is_none_or(|&existing| tentative_g < existing);
            if better {
                g_score.insert(next, tentative_g);
                parent.insert(next, node);
                open.push(OpenEntry {
                    f_score: tentative_g + heuristic.estimate(next, target),
                    g_score: tentative_g,
                    node: next,
                });
            }
        }
    }
    None
}
