//! Property Inverted Index.
//!
//! In-memory only: `propertyName -> value -> {nodeIds}` and
//! `propertyName -> value -> {edgeKeys}`, rebuilt from the property store
//! on open rather than persisted independently. Backs
//! `whereProperty`'s equality and range lookups in the query builder.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

use crate::property::{EdgeKey, PropertyMap, PropertyValue};

/// A property value normalized into a total order so it can key a
/// `BTreeMap` and support range queries. Values that compare equal under
/// [`canonicalize`] are treated as the same index entry even if their
/// original `PropertyValue` representation differed (e.g. `Int(3)` vs a
/// `Float(3.0)` arriving through JSON are NOT merged — only exact
/// same-variant, same-value pairs are).
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum CanonicalValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Eq for CanonicalValue {}
impl Ord for CanonicalValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// Values containing `List`/`Object` are not indexable for equality or
/// range lookups (no total order); `None` signals the caller to skip
/// indexing that property for that entity.
pub fn canonicalize(value: &PropertyValue) -> Option<CanonicalValue> {
    match value {
        PropertyValue::Null => Some(CanonicalValue::Null),
        PropertyValue::Bool(b) => Some(CanonicalValue::Bool(*b)),
        PropertyValue::Int(i) => Some(CanonicalValue::Int(*i)),
        PropertyValue::Float(f) => Some(CanonicalValue::Float(*f)),
        PropertyValue::String(s) => Some(CanonicalValue::String(s.clone())),
        PropertyValue::List(_) | PropertyValue::Object(_) => None,
    }
}

#[derive(Debug, Default, Clone)]
struct PropertyIndex {
    nodes: BTreeMap<CanonicalValue, HashSet<u32>>,
    edges: BTreeMap<CanonicalValue, HashSet<EdgeKey>>,
}

/// Per-property-name inverted indexes over node and edge properties.
#[derive(Debug, Default, Clone)]
pub struct InvertedIndex {
    by_property: BTreeMap<String, PropertyIndex>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        InvertedIndex::default()
    }

    pub fn index_node(&mut self, node: u32, props: &PropertyMap) {
        for (key, value) in props {
            if let Some(canon) = canonicalize(value) {
                self.by_property
                    .entry(key.clone())
                    .or_default()
                    .nodes
                    .entry(canon)
                    .or_default()
                    .insert(node);
            }
        }
    }

    pub fn unindex_node(&mut self, node: u32, props: &PropertyMap) {
        for (key, value) in props {
            if let Some(canon) = canonicalize(value) {
                if let Some(index) = self.by_property.get_mut(key) {
                    if let Some(set) = index.nodes.get_mut(&canon) {
                        set.remove(&node);
                    }
                }
            }
        }
    }

    pub fn index_edge(&mut self, edge: EdgeKey, props: &PropertyMap) {
        for (key, value) in props {
            if let Some(canon) = canonicalize(value) {
                self.by_property
                    .entry(key.clone())
                    .or_default()
                    .edges
                    .entry(canon)
                    .or_default()
                    .insert(edge);
            }
        }
    }

    pub fn unindex_edge(&mut self, edge: &EdgeKey, props: &PropertyMap) {
        for (key, value) in props {
            if let Some(canon) = canonicalize(value) {
                if let Some(index) = self.by_property.get_mut(key) {
                    if let Some(set) = index.edges.get_mut(&canon) {
                        set.remove(edge);
                    }
                }
            }
        }
    }

    /// Nodes whose `property` is exactly `value`.
    pub fn nodes_eq(&self, property: &str, value: &PropertyValue) -> HashSet<u32> {
        let Some(canon) = canonicalize(value) else {
            return HashSet::new();
        };
        self.by_property
            .get(property)
            .and_then(|idx| idx.nodes.get(&canon))
            .cloned()
            .unwrap_or_default()
    }

    /// Nodes whose `property` falls within `(min, max)`, with either
    /// bound optional (open-ended) and independently inclusive or
    /// exclusive. Properties carrying a non-orderable value (`List`,
    /// `Object`) never match, since they have no `CanonicalValue`.
    pub fn nodes_range(
        &self,
        property: &str,
        min: Option<&PropertyValue>,
        max: Option<&PropertyValue>,
        include_min: bool,
        include_max: bool,
    ) -> HashSet<u32> {
        let (Some(lo), Some(hi)) = (bound(min, include_min), bound(max, include_max)) else {
            return HashSet::new();
        };
        let Some(index) = self.by_property.get(property) else {
            return HashSet::new();
        };
        index
            .nodes
            .range((lo, hi))
            .flat_map(|(_, set)| set.iter().copied())
            .collect()
    }

    /// Edge counterpart of [`Self::nodes_range`].
    pub fn edges_range(
        &self,
        property: &str,
        min: Option<&PropertyValue>,
        max: Option<&PropertyValue>,
        include_min: bool,
        include_max: bool,
    ) -> HashSet<EdgeKey> {
        let (Some(lo), Some(hi)) = (bound(min, include_min), bound(max, include_max)) else {
            return HashSet::new();
        };
        let Some(index) = self.by_property.get(property) else {
            return HashSet::new();
        };
        index
            .edges
            .range((lo, hi))
            .flat_map(|(_, set)| set.iter().copied())
            .collect()
    }

    pub fn edges_eq(&self, property: &str, value: &PropertyValue) -> HashSet<EdgeKey> {
        let Some(canon) = canonicalize(value) else {
            return HashSet::new();
        };
        self.by_property
            .get(property)
            .and_then(|idx| idx.edges.get(&canon))
            .cloned()
            .unwrap_or_default()
    }
}

/// Build a `Bound` for a range query: `None` is an open (unbounded) end;
/// `Some(value)` that fails to canonicalize makes the whole range
/// unmatchable, signaled by returning `None` here.
fn bound(value: Option<&PropertyValue>, include: bool) -> Option<Bound<CanonicalValue>> {
    match value {
        None => Some(Bound::Unbounded),
        Some(v) => canonicalize(v).map(|c| if include { Bound::Included(c) } else { Bound::Excluded(c) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn equality_lookup_finds_indexed_node() {
        let mut idx = InvertedIndex::new();
        idx.index_node(1, &map(&[("age", PropertyValue::Int(30))]));
        idx.index_node(2, &map(&[("age", PropertyValue::Int(40))]));
        let found = idx.nodes_eq("age", &PropertyValue::Int(30));
        assert_eq!(found, HashSet::from([1]));
    }

    #[test]
    fn range_lookup_is_inclusive_by_default() {
        let mut idx = InvertedIndex::new();
        idx.index_node(1, &map(&[("age", PropertyValue::Int(20))]));
        idx.index_node(2, &map(&[("age", PropertyValue::Int(30))]));
        idx.index_node(3, &map(&[("age", PropertyValue::Int(40))]));
        let found = idx.nodes_range(
            "age",
            Some(&PropertyValue::Int(20)),
            Some(&PropertyValue::Int(30)),
            true,
            true,
        );
        assert_eq!(found, HashSet::from([1, 2]));
    }

    #[test]
    fn range_lookup_can_exclude_either_bound() {
        let mut idx = InvertedIndex::new();
        idx.index_node(1, &map(&[("age", PropertyValue::Int(20))]));
        idx.index_node(2, &map(&[("age", PropertyValue::Int(30))]));
        idx.index_node(3, &map(&[("age", PropertyValue::Int(40))]));
        let found = idx.nodes_range(
            "age",
            Some(&PropertyValue::Int(20)),
            Some(&PropertyValue::Int(30)),
            false,
            true,
        );
        assert_eq!(found, HashSet::from([2]));
    }

    #[test]
    fn range_lookup_open_bound_is_unbounded() {
        let mut idx = InvertedIndex::new();
        idx.index_node(1, &map(&[("age", PropertyValue::Int(20))]));
        idx.index_node(2, &map(&[("age", PropertyValue::Int(30))]));
        idx.index_node(3, &map(&[("age", PropertyValue::Int(40))]));
        let found = idx.nodes_range("age", None, Some(&PropertyValue::Int(30)), true, true);
        assert_eq!(found, HashSet::from([1, 2]));
        let found = idx.nodes_range("age", Some(&PropertyValue::Int(30)), None, true, true);
        assert_eq!(found, HashSet::from([2, 3]));
    }

    #[test]
    fn edges_range_mirrors_nodes_range() {
        let mut idx = InvertedIndex::new();
        let e1 = crate::triple::EncodedTriple::new(1, 2, 3);
        let e2 = crate::triple::EncodedTriple::new(4, 5, 6);
        idx.index_edge(e1, &map(&[("weight", PropertyValue::Int(1))]));
        idx.index_edge(e2, &map(&[("weight", PropertyValue::Int(9))]));
        let found = idx.edges_range("weight", None, Some(&PropertyValue::Int(5)), true, true);
        assert_eq!(found, HashSet::from([e1]));
    }

    #[test]
    fn unindex_removes_membership() {
        let mut idx = InvertedIndex::new();
        let props = map(&[("age", PropertyValue::Int(30))]);
        idx.index_node(1, &props);
        idx.unindex_node(1, &props);
        assert!(idx.nodes_eq("age", &PropertyValue::Int(30)).is_empty());
    }

    #[test]
    fn list_and_object_values_are_not_indexed() {
        let mut idx = InvertedIndex::new();
        idx.index_node(1, &map(&[("tags", PropertyValue::List(vec![]))]));
        assert!(idx.nodes_eq("tags", &PropertyValue::List(vec![])).is_empty());
    }
}
