//! Property Store.
//!
//! Holds the property maps attached to nodes and edges. Values use the
//! exact tagged-variant model the wire format describes: `Null`, `Bool`,
//! `Int`, `Float`, `String`, `List`, `Object`. Property maps travel over
//! the wire as JSON (the WAL's `SetNodeProps`/`SetEdgeProps` records carry
//! a length-prefixed JSON blob), so this module leans on `serde_json`
//! rather than the hand-written binary encoding used for triples and
//! index structures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json;

use crate::triple::EncodedTriple;

/// A property value. Exactly the seven variants the wire format names;
/// no `DateTime`/`Blob` extensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Object(BTreeMap<String, PropertyValue>),
}

/// A property map: property name to value.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A (subject, predicate, object) edge key, used to attach properties to
/// an edge. Edges aren't deduplicated independently of their underlying
/// triple; setting properties on an edge whose triple doesn't exist is
/// legal and simply stores properties that become visible once the
/// triple is added.
pub type EdgeKey = EncodedTriple;

#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    #[error("invalid property JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Node and edge property tables.
#[derive(Debug, Default, Clone)]
pub struct PropertyStore {
    nodes: BTreeMap<u32, PropertyMap>,
    edges: BTreeMap<EdgeKey, PropertyMap>,
}

impl PropertyStore {
    pub fn new() -> Self {
        PropertyStore {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    /// Replace the entire property map for `node`. An empty map removes
    /// the entry rather than storing an empty map, keeping `len()` a
    /// meaningful measure of nodes carrying properties.
    pub fn set_node_properties(&mut self, node: u32, props: PropertyMap) {
        if props.is_empty() {
            self.nodes.remove(&node);
        } else {
            self.nodes.insert(node, props);
        }
    }

    pub fn get_node_properties(&self, node: u32) -> Option<&PropertyMap> {
        self.nodes.get(&node)
    }

    pub fn set_edge_properties(&mut self, edge: EdgeKey, props: PropertyMap) {
        if props.is_empty() {
            self.edges.remove(&edge);
        } else {
            self.edges.insert(edge, props);
        }
    }

    pub fn get_edge_properties(&self, edge: &EdgeKey) -> Option<&PropertyMap> {
        self.edges.get(edge)
    }

    /// Drop all properties recorded against `node`. Called when a node's
    /// last referencing triple is removed, per the lifecycle rule that a
    /// node with no incident triples and no explicit keep-alive is
    /// considered gone.
    pub fn remove_node(&mut self, node: u32) {
        self.nodes.remove(&node);
    }

    pub fn remove_edge(&mut self, edge: &EdgeKey) {
        self.edges.remove(edge);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterate every node carrying properties. Used to rebuild the
    /// in-memory inverted index on open.
    pub fn iter_nodes(&self) -> impl Iterator<Item = (u32, &PropertyMap)> {
        self.nodes.iter().map(|(&id, props)| (id, props))
    }

    /// Iterate every edge carrying properties. Used to rebuild the
    /// in-memory inverted index on open.
    pub fn iter_edges(&self) -> impl Iterator<Item = (&EdgeKey, &PropertyMap)> {
        self.edges.iter()
    }

    /// Serialize a single property map to the JSON payload used by the
    /// WAL's `SetNodeProps`/`SetEdgeProps` records.
    pub fn encode_map(props: &PropertyMap) -> Result<Vec<u8>, PropertyError> {
        Ok(serde_json::to_vec(props)?)
    }

    pub fn decode_map(bytes: &[u8]) -> Result<PropertyMap, PropertyError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize the whole store (section persistence for the `.synapsedb`
    /// container file's properties section).
    pub fn serialize(&self) -> Result<Vec<u8>, PropertyError> {
        // EdgeKey isn't directly usable as a serde_json map key (not a
        // string), so edges travel as a flat list of (s, p, o, props).
        #[derive(Serialize)]
        struct WireOut<'a> {
            nodes: &'a BTreeMap<u32, PropertyMap>,
            edges: Vec<(u32, u32, u32, &'a PropertyMap)>,
        }
        let edge_list: Vec<(u32, u32, u32, &PropertyMap)> = self
            .edges
            .iter()
            .map(|(k, v)| (k.s, k.p, k.o, v))
            .collect();
        let out = WireOut {
            nodes: &self.nodes,
            edges: edge_list,
        };
        Ok(serde_json::to_vec(&out)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, PropertyError> {
        #[derive(Deserialize)]
        struct WireIn {
            nodes: BTreeMap<u32, PropertyMap>,
            edges: Vec<(u32, u32, u32, PropertyMap)>,
        }
        let wire: WireIn = serde_json::from_slice(bytes)?;
        let edges = wire
            .edges
            .into_iter()
            .map(|(s, p, o, props)| (EdgeKey::new(s, p, o), props))
            .collect();
        Ok(PropertyStore {
            nodes: wire.nodes,
            edges,
        })
    }
}
