//! LSM-lite Staging.
//!
//! An optional write-buffering layer sitting in front of the paged index.
//! New triples land here first; once a primary key accumulates enough
//! buffered entries (or the store is flushed explicitly) the buffer for
//! that primary is frozen and merged into the relevant order's page file.
//! This is a separate, memtable-like layer from the six-order in-memory
//! index, which always holds the full live triple set regardless of
//! staging state.

use std::collections::BTreeMap;

use crate::sixindex::Order;
use crate::triple::EncodedTriple;

/// One buffered mutation: an add or a tombstoning delete, distinguished
/// so a delete staged after an add (and not yet flushed) still hides the
/// triple from readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedOp {
    Add(EncodedTriple),
    Delete(EncodedTriple),
}

/// Metrics snapshot for diagnostics/maintenance tooling.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StagingMetrics {
    pub buffered_entries: usize,
    pub buffered_primaries: usize,
    pub flush_threshold: usize,
}

/// Per-order staging buffer, keyed by that order's primary value.
#[derive(Debug)]
pub struct StagingArea {
    enabled: bool,
    flush_threshold: usize,
    buffers: [BTreeMap<u32, Vec<StagedOp>>; 6],
}

fn order_index(order: Order) -> usize {
    match order {
        Order::Spo => 0,
        Order::Sop => 1,
        Order::Pos => 2,
        Order::Pso => 3,
        Order::Osp => 4,
        Order::Ops => 5,
    }
}

fn primary_for(order: Order, t: &EncodedTriple) -> u32 {
    match order {
        Order::Spo | Order::Sop => t.s,
        Order::Pos | Order::Pso => t.p,
        Order::Osp | Order::Ops => t.o,
    }
}

impl StagingArea {
    pub fn new(enabled: bool, flush_threshold: usize) -> Self {
        StagingArea {
            enabled,
            flush_threshold,
            buffers: [
                BTreeMap::new(),
                BTreeMap::new(),
                BTreeMap::new(),
                BTreeMap::new(),
                BTreeMap::new(),
                BTreeMap::new(),
            ],
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stage `op` under every order's primary key. Returns the list of
    /// `(order, primary)` pairs that just crossed `flush_threshold` and
    /// should be frozen.
    pub fn stage(&mut self, op: StagedOp) -> Vec<(Order, u32)> {
        if !self.enabled {
            return Vec::new();
        }
        let triple = match op {
            StagedOp::Add(t) | StagedOp::Delete(t) => t,
        };
        let mut ready = Vec::new();
        for order in Order::ALL {
            let primary = primary_for(order, &triple);
            let entries = self.buffers[order_index(order)].entry(primary).or_default();
            entries.push(op);
            if entries.len() == self.flush_threshold {
                ready.push((order, primary));
            }
        }
        ready
    }

    /// Remove and return every buffered op for `(order, primary)`, for
    /// the flush path to merge into the page file.
    pub fn drain_primary(&mut self, order: Order, primary: u32) -> Vec<StagedOp> {
        self.buffers[order_index(order)]
            .remove(&primary)
            .unwrap_or_default()
    }

    /// Drain every buffered op across every order's primary, for a full
    /// `flush()`. Returns `(order, primary, ops)` triples.
    pub fn drain_all(&mut self) -> Vec<(Order, u32, Vec<StagedOp>)> {
        let mut out = Vec::new();
        for order in Order::ALL {
            let map = std::mem::take(&mut self.buffers[order_index(order)]);
            for (primary, ops) in map {
                out.push((order, primary, ops));
            }
        }
        out
    }

    /// Current buffered ops for `(order, primary)`, without removing
    /// them — used by the read path to overlay unflushed writes on top
    /// of what's already on disk.
    pub fn peek_primary(&self, order: Order, primary: u32) -> &[StagedOp] {
        self.buffers[order_index(order)]
            .get(&primary)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn metrics(&self) -> StagingMetrics {
        let mut entries = 0;
        let mut primaries = 0;
        // SPO alone is representative: every order buffers the same
        // logical set of ops, just keyed by a different primary.
        for ops in self.buffers[order_index(Order::Spo)].values() {
            entries += ops.len();
            primaries += 1;
        }
        StagingMetrics {
            buffered_entries: entries,
            buffered_primaries: primaries,
            flush_threshold: self.flush_threshold,
        }
    }
}
