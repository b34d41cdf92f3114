//! Triple Store.
//!
//! The logical set of live (subject, predicate, object) triples, each
//! component already resolved to a dictionary id. This module owns only
//! the in-memory deduplicated set used to answer membership/listing
//! queries and to seed the six-order index on load; persistence of the
//! set itself rides on the paged index (C6) plus WAL replay (C8), not on
//! a standalone serialization of this struct beyond the snapshot section
//! used for fast restart.

use std::collections::HashSet;

use crate::encoding::{self, Decode, Encode, EncodingError};

/// A single (subject, predicate, object) triple with each component
/// already resolved to a dictionary id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodedTriple {
    pub s: u32,
    pub p: u32,
    pub o: u32,
}

impl EncodedTriple {
    pub fn new(s: u32, p: u32, o: u32) -> Self {
        EncodedTriple { s, p, o }
    }
}

impl Encode for EncodedTriple {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.s.encode_to(buf)?;
        self.p.encode_to(buf)?;
        self.o.encode_to(buf)
    }
}

impl Decode for EncodedTriple {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let (s, n1) = u32::decode_from(buf)?;
        let (p, n2) = u32::decode_from(&buf[n1..])?;
        let (o, n3) = u32::decode_from(&buf[n1 + n2..])?;
        Ok((EncodedTriple { s, p, o }, n1 + n2 + n3))
    }
}

/// In-memory deduplicated set of live triples.
#[derive(Debug, Default)]
pub struct TripleStore {
    live: HashSet<EncodedTriple>,
}

impl TripleStore {
    pub fn new() -> Self {
        TripleStore {
            live: HashSet::new(),
        }
    }

    /// Add a triple. Returns `true` if it was not already present.
    /// Idempotent: re-adding an existing triple is a no-op returning
    /// `false`.
    pub fn add(&mut self, t: EncodedTriple) -> bool {
        self.live.insert(t)
    }

    /// Remove a triple. Returns `true` if it was present.
    pub fn remove(&mut self, t: &EncodedTriple) -> bool {
        self.live.remove(t)
    }

    pub fn has(&self, t: &EncodedTriple) -> bool {
        self.live.contains(t)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// All live triples, in unspecified order.
    pub fn list(&self) -> impl Iterator<Item = &EncodedTriple> {
        self.live.iter()
    }

    pub fn serialize(&self) -> Result<Vec<u8>, EncodingError> {
        let items: Vec<EncodedTriple> = self.live.iter().copied().collect();
        let mut buf = Vec::new();
        encoding::encode_vec(&items, &mut buf)?;
        Ok(buf)
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, EncodingError> {
        let (items, _consumed): (Vec<EncodedTriple>, usize) = encoding::decode_vec(buf)?;
        Ok(TripleStore {
            live: items.into_iter().collect(),
        })
    }
}
