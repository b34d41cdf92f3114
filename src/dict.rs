//! String Dictionary.
//!
//! Bidirectional interning table between arbitrary UTF-8 strings and the
//! `u32` ids used everywhere else in the store (encoded triples, property
//! keys, index entries). Id `0` is reserved and never assigned; ids are
//! never reused or renumbered once handed out, even if the string they
//! name is later unreferenced by every triple.

use std::collections::HashMap;

use tracing::trace;

use crate::encoding::{self, Decode, Encode, EncodingError};

/// The reserved id meaning "no value" / "unset". Never returned by
/// [`Dictionary::get_or_create_id`].
pub const RESERVED_ID: u32 = 0;

/// Bidirectional string &lt;-&gt; id table.
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
    by_id: Vec<String>,
    by_value: HashMap<String, u32>,
}

impl Dictionary {
    /// Create an empty dictionary. Id 0 is reserved up front so the first
    /// real string is assigned id 1.
    pub fn new() -> Self {
        Dictionary {
            by_id: vec![String::new()],
            by_value: HashMap::new(),
        }
    }

    /// Look up `value`'s id, assigning a fresh one if it has never been
    /// seen before. Never returns [`RESERVED_ID`].
    pub fn get_or_create_id(&mut self, value: &str) -> u32 {
        if let Some(&id) = self.by_value.get(value) {
            return id;
        }
        let id = self.by_id.len() as u32;
        self.by_id.push(value.to_string());
        self.by_value.insert(value.to_string(), id);
        trace!(id, value, "dictionary: assigned new id");
        id
    }

    /// Look up `value`'s id without creating one.
    pub fn get_id(&self, value: &str) -> Option<u32> {
        self.by_value.get(value).copied()
    }

    /// Look up the string for `id`. Returns `None` for id 0 or any id
    /// never assigned.
    pub fn get_value(&self, id: u32) -> Option<&str> {
        if id == RESERVED_ID {
            return None;
        }
        self.by_id.get(id as usize).map(String::as_str)
    }

    /// Number of real (non-reserved) entries.
    pub fn len(&self) -> usize {
        self.by_id.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize every entry in id order (the reserved entry at id 0 is
    /// included as an empty string so `by_id.len()` round-trips exactly).
    pub fn serialize(&self) -> Result<Vec<u8>, EncodingError> {
        let mut buf = Vec::new();
        encoding::encode_vec(&self.by_id, &mut buf)?;
        Ok(buf)
    }

    /// Rebuild a dictionary from bytes produced by [`Self::serialize`].
    pub fn deserialize(buf: &[u8]) -> Result<Self, EncodingError> {
        let (by_id, _consumed): (Vec<String>, usize) = encoding::decode_vec(buf)?;
        let mut by_value = HashMap::with_capacity(by_id.len());
        for (id, value) in by_id.iter().enumerate().skip(1) {
            by_value.insert(value.clone(), id as u32);
        }
        Ok(Dictionary { by_id, by_value })
    }
}

impl Encode for Dictionary {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        encoding::encode_vec(&self.by_id, buf)
    }
}

impl Decode for Dictionary {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let (by_id, consumed): (Vec<String>, usize) = encoding::decode_vec(buf)?;
        let mut by_value = HashMap::with_capacity(by_id.len());
        for (id, value) in by_id.iter().enumerate().skip(1) {
            by_value.insert(value.clone(), id as u32);
        }
        Ok((Dictionary { by_id, by_value }, consumed))
    }
}
