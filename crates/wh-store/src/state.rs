//! The complete warehouse state and its virtual path tree.
//!
//! Paths resolve against a tree shaped like
//!
//! ```text
//! <branch>.<field>...            branch payloads
//! _subscriptions.<feed>...       ownership tables and views
//! _generations.<branch>          generation numbers
//! _creators.<branch>             in-flight creators
//! ```
//!
//! The tree is never materialized in full for a lookup; only the addressed
//! subtree is rendered.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wh_ownership::Subscriptions;
use wh_types::path::walk;
use wh_types::{BranchId, FeedId, StatePath, CREATORS_ROOT, GENERATIONS_ROOT, SUBSCRIPTIONS_ROOT};

use crate::branches::BranchStore;

/// Branch storage plus every feed's ownership graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WarehouseState {
    #[serde(default)]
    pub store: BranchStore,
    #[serde(default)]
    pub subscriptions: Subscriptions,
}

impl WarehouseState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a path, returning a copy of the addressed value.
    pub fn lookup(&self, path: &StatePath) -> Option<Value> {
        let tail = path.tail();
        match path.head() {
            SUBSCRIPTIONS_ROOT => match tail.split_first() {
                None => Some(self.subscriptions.to_value()),
                Some((feed, rest)) => {
                    let feed = self.subscriptions.feed(&FeedId::new(feed.as_str()))?;
                    walk(&feed.to_value(), rest).cloned()
                }
            },
            GENERATIONS_ROOT => {
                let all = || -> Value {
                    Value::Object(
                        self.store
                            .generations()
                            .iter()
                            .map(|(id, g)| (id.to_string(), Value::from(*g)))
                            .collect(),
                    )
                };
                resolve_record(tail, all, |id| self.store.generation(id).map(Value::from))
            }
            CREATORS_ROOT => {
                let all = || -> Value {
                    Value::Object(
                        self.store
                            .creators()
                            .iter()
                            .map(|(id, c)| (id.to_string(), Value::from(c.as_str())))
                            .collect(),
                    )
                };
                resolve_record(tail, all, |id| self.store.creator(id).map(Value::from))
            }
            branch => {
                let payload = self.store.get(&BranchId::new(branch))?;
                walk(payload, tail).cloned()
            }
        }
    }

    /// Returns `true` if the path resolves.
    pub fn has(&self, path: &StatePath) -> bool {
        self.lookup(path).is_some()
    }

    /// Render the whole tree.
    pub fn to_value(&self) -> Value {
        let mut root: Map<String, Value> = self
            .store
            .iter()
            .map(|(id, payload)| (id.to_string(), payload.clone()))
            .collect();
        root.insert(SUBSCRIPTIONS_ROOT.into(), self.subscriptions.to_value());
        let generations = self
            .store
            .generations()
            .iter()
            .map(|(id, g)| (id.to_string(), Value::from(*g)))
            .collect();
        root.insert(GENERATIONS_ROOT.into(), Value::Object(generations));
        let creators = self
            .store
            .creators()
            .iter()
            .map(|(id, c)| (id.to_string(), Value::from(c.as_str())))
            .collect();
        root.insert(CREATORS_ROOT.into(), Value::Object(creators));
        Value::Object(root)
    }

    /// Branches with a payload that no feed holds.
    pub fn orphans(&self) -> Vec<BranchId> {
        let referenced = self.subscriptions.referenced();
        self.store
            .ids()
            .filter(|id| !referenced.contains(id))
            .cloned()
            .collect()
    }
}

fn resolve_record(
    tail: &[String],
    all: impl FnOnce() -> Value,
    one: impl FnOnce(&BranchId) -> Option<Value>,
) -> Option<Value> {
    match tail.split_first() {
        None => Some(all()),
        Some((id, rest)) => {
            let value = one(&BranchId::new(id.as_str()))?;
            walk(&value, rest).cloned()
        }
    }
}
