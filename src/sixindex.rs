//! Six-Order Covering Index.
//!
//! Maintains the live triple set ordered six different ways — SPO, SOP,
//! POS, PSO, OSP, OPS — so that any combination of bound/unbound
//! subject/predicate/object can be answered by a single ordered scan with
//! no secondary filtering pass. Each order is a `BTreeSet` over a tuple
//! permuted to match that order's name; the permutation itself is what
//! makes a prefix scan on the tuple equivalent to "all triples matching
//! these bound components".

use std::collections::BTreeSet;

use crate::triple::EncodedTriple;

/// The six fixed orderings, named for the component sequence each one
/// sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    Spo,
    Sop,
    Pos,
    Pso,
    Osp,
    Ops,
}

impl Order {
    pub const ALL: [Order; 6] = [
        Order::Spo,
        Order::Sop,
        Order::Pos,
        Order::Pso,
        Order::Osp,
        Order::Ops,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Order::Spo => "SPO",
            Order::Sop => "SOP",
            Order::Pos => "POS",
            Order::Pso => "PSO",
            Order::Osp => "OSP",
            Order::Ops => "OPS",
        }
    }

    /// Permute `(s, p, o)` into this order's tuple layout.
    fn key(self, t: &EncodedTriple) -> (u32, u32, u32) {
        match self {
            Order::Spo => (t.s, t.p, t.o),
            Order::Sop => (t.s, t.o, t.p),
            Order::Pos => (t.p, t.o, t.s),
            Order::Pso => (t.p, t.s, t.o),
            Order::Osp => (t.o, t.s, t.p),
            Order::Ops => (t.o, t.p, t.s),
        }
    }

    /// Undo [`Self::key`], recovering the original triple.
    pub(crate) fn unkey(self, k: (u32, u32, u32)) -> EncodedTriple {
        match self {
            Order::Spo => EncodedTriple::new(k.0, k.1, k.2),
            Order::Sop => EncodedTriple::new(k.0, k.2, k.1),
            Order::Pos => EncodedTriple::new(k.2, k.0, k.1),
            Order::Pso => EncodedTriple::new(k.1, k.0, k.2),
            Order::Osp => EncodedTriple::new(k.1, k.2, k.0),
            Order::Ops => EncodedTriple::new(k.2, k.1, k.0),
        }
    }

    /// Permute a criteria's bound components the same way [`Self::key`]
    /// permutes a triple, so the leading bound fields line up with this
    /// order's key layout.
    pub(crate) fn key_opt(self, c: &Criteria) -> (Option<u32>, Option<u32>, Option<u32>) {
        match self {
            Order::Spo => (c.s, c.p, c.o),
            Order::Sop => (c.s, c.o, c.p),
            Order::Pos => (c.p, c.o, c.s),
            Order::Pso => (c.p, c.s, c.o),
            Order::Osp => (c.o, c.s, c.p),
            Order::Ops => (c.o, c.p, c.s),
        }
    }

    /// The primary value (leading key component) `criteria` pins for this
    /// order, if it pins one at all.
    pub fn primary_of(self, c: &Criteria) -> Option<u32> {
        self.key_opt(c).0
    }
}

/// Which of subject/predicate/object are bound in a lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct Criteria {
    pub s: Option<u32>,
    pub p: Option<u32>,
    pub o: Option<u32>,
}

impl Criteria {
    /// Choose the order whose sort key puts the bound components as a
    /// contiguous leading prefix, preferring the combination that narrows
    /// the scan the most:
    ///
    /// - subject + predicate bound -> SPO (object ranges over a single
    ///   `(s, p)` prefix)
    /// - object + predicate bound  -> POS
    /// - subject only              -> SPO
    /// - predicate only            -> PSO
    /// - object only               -> OSP
    /// - nothing bound             -> SPO (full scan, order doesn't matter)
    pub fn best_order(&self) -> Order {
        match (self.s.is_some(), self.p.is_some(), self.o.is_some()) {
            (true, true, _) => Order::Spo,
            (_, true, true) => Order::Pos,
            (true, false, false) => Order::Spo,
            (false, true, false) => Order::Pso,
            (false, false, true) => Order::Osp,
            (false, false, false) => Order::Spo,
            (true, false, true) => Order::Sop,
        }
    }

    pub(crate) fn matches(&self, t: &EncodedTriple) -> bool {
        self.s.is_none_or(|s| s == t.s)
            && self.p.is_none_or(|p| p == t.p)
            && self.o.is_none_or(|o| o == t.o)
    }
}

/// The six ordered sets, kept mutually consistent: a triple is present in
/// one iff it is present in all.
#[derive(Debug, Default, Clone)]
pub struct SixOrderIndex {
    spo: BTreeSet<(u32, u32, u32)>,
    sop: BTreeSet<(u32, u32, u32)>,
    pos: BTreeSet<(u32, u32, u32)>,
    pso: BTreeSet<(u32, u32, u32)>,
    osp: BTreeSet<(u32, u32, u32)>,
    ops: BTreeSet<(u32, u32, u32)>,
}

impl SixOrderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_mut(&mut self, order: Order) -> &mut BTreeSet<(u32, u32, u32)> {
        match order {
            Order::Spo => &mut self.spo,
            Order::Sop => &mut self.sop,
            Order::Pos => &mut self.pos,
            Order::Pso => &mut self.pso,
            Order::Osp => &mut self.osp,
            Order::Ops => &mut self.ops,
        }
    }

    fn set(&self, order: Order) -> &BTreeSet<(u32, u32, u32)> {
        match order {
            Order::Spo => &self.spo,
            Order::Sop => &self.sop,
            Order::Pos => &self.pos,
            Order::Pso => &self.pso,
            Order::Osp => &self.osp,
            Order::Ops => &self.ops,
        }
    }

    /// Insert `t` into all six orders. Idempotent.
    pub fn add(&mut self, t: EncodedTriple) {
        for order in Order::ALL {
            let key = order.key(&t);
            self.set_mut(order).insert(key);
        }
    }

    /// Remove `t` from all six orders.
    pub fn remove(&mut self, t: &EncodedTriple) {
        for order in Order::ALL {
            let key = order.key(t);
            self.set_mut(order).remove(&key);
        }
    }

    /// Scan the best order for `criteria`, yielding every live triple
    /// matching the bound components.
    ///
    /// `best_order` always picks an order whose bound components form a
    /// contiguous leading prefix of that order's key tuple, so the scan
    /// can be a `BTreeSet::range` over that prefix rather than a full
    /// walk of the order — unbound trailing components simply widen to
    /// `0..=u32::MAX` for their slot. The trailing `matches` filter stays
    /// as a cheap correctness net, not the thing doing the narrowing.
    pub fn query(&self, criteria: Criteria) -> impl Iterator<Item = EncodedTriple> + '_ {
        let order = criteria.best_order();
        let (a, b, c) = order.key_opt(&criteria);
        let lo = (a.unwrap_or(0), b.unwrap_or(0), c.unwrap_or(0));
        let hi = (
            a.unwrap_or(u32::MAX),
            b.unwrap_or(u32::MAX),
            c.unwrap_or(u32::MAX),
        );
        self.set(order)
            .range(lo..=hi)
            .map(move |&k| order.unkey(k))
            .filter(move |t| criteria.matches(t))
    }

    pub fn len(&self) -> usize {
        self.spo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spo.is_empty()
    }
}
