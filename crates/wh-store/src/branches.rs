//! Branch payloads with their generation and creator records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wh_types::{BranchId, Generation, Payload, ID_FIELD};

/// Global branch storage, independent of feeds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchStore {
    #[serde(default)]
    payloads: BTreeMap<BranchId, Payload>,
    #[serde(default)]
    generations: BTreeMap<BranchId, Generation>,
    #[serde(default)]
    creators: BTreeMap<BranchId, String>,
}

/// Returns `true` for payloads that carry no data: `null` or `{}`.
pub fn is_empty_payload(payload: &Payload) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

impl BranchStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a payload is stored for `id`.
    pub fn contains(&self, id: &BranchId) -> bool {
        self.payloads.contains_key(id)
    }

    /// The payload of a branch.
    pub fn get(&self, id: &BranchId) -> Option<&Payload> {
        self.payloads.get(id)
    }

    /// Every stored branch with its payload, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = (&BranchId, &Payload)> {
        self.payloads.iter()
    }

    /// Every stored branch id, ordered.
    pub fn ids(&self) -> impl Iterator<Item = &BranchId> {
        self.payloads.keys()
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Write a payload for an upsert.
    ///
    /// An empty payload on an existing branch only touches ownership and
    /// leaves the stored data alone. Otherwise the payload replaces the
    /// stored one and its `id` field defaults to the branch id. Returns
    /// `true` if the payload was written.
    pub fn upsert(&mut self, id: &BranchId, payload: Payload) -> bool {
        if self.contains(id) && is_empty_payload(&payload) {
            return false;
        }
        self.insert(id, payload);
        true
    }

    /// Unconditionally store a payload, defaulting its `id` field.
    pub fn insert(&mut self, id: &BranchId, payload: Payload) {
        let payload = match payload {
            Value::Null => serde_json::json!({ ID_FIELD: id.as_str() }),
            Value::Object(mut fields) => {
                fields
                    .entry(ID_FIELD)
                    .or_insert_with(|| Value::String(id.to_string()));
                Value::Object(fields)
            }
            other => other,
        };
        self.payloads.insert(id.clone(), payload);
    }

    /// Store `{id}` unless the branch already exists. Returns `true` if it
    /// was created.
    pub fn vivify(&mut self, id: &BranchId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.insert(id, Value::Null);
        true
    }

    /// Drop the payload and generation of a branch. Returns `true` if a
    /// payload existed.
    pub fn remove(&mut self, id: &BranchId) -> bool {
        self.generations.remove(id);
        self.payloads.remove(id).is_some()
    }

    /// The generation of a branch.
    pub fn generation(&self, id: &BranchId) -> Option<Generation> {
        self.generations.get(id).copied()
    }

    /// Record a generation the first time one is known. Returns `true` if
    /// it was recorded.
    pub fn stamp_generation(&mut self, id: &BranchId, generation: Generation) -> bool {
        match self.generations.entry(id.clone()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(generation);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Record a generation, replacing any previous one.
    pub fn refresh_generation(&mut self, id: &BranchId, generation: Generation) {
        self.generations.insert(id.clone(), generation);
    }

    /// Every generation record.
    pub fn generations(&self) -> &BTreeMap<BranchId, Generation> {
        &self.generations
    }

    /// Record who is creating a branch.
    pub fn set_creator(&mut self, id: &BranchId, creator: &str) {
        self.creators.insert(id.clone(), creator.to_string());
    }

    /// Forget the creator of a branch.
    pub fn clear_creator(&mut self, id: &BranchId) {
        self.creators.remove(id);
    }

    /// The creator of a branch still being created.
    pub fn creator(&self, id: &BranchId) -> Option<&str> {
        self.creators.get(id).map(String::as_str)
    }

    /// Every creator record.
    pub fn creators(&self) -> &BTreeMap<BranchId, String> {
        &self.creators
    }
}
