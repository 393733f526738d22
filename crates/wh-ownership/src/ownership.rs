//! Ownership records and per-feed tables.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wh_types::{BranchId, View};

/// Parent and child edges of one branch inside one feed.
///
/// A branch listing itself in both sets is self-owned: it is a root that
/// stays alive until explicitly collected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    #[serde(default)]
    pub parents: BTreeSet<BranchId>,
    #[serde(default)]
    pub children: BTreeSet<BranchId>,
}

impl Ownership {
    /// A record owning itself.
    pub fn self_owned(id: &BranchId) -> Self {
        let mut ownership = Self::default();
        ownership.parents.insert(id.clone());
        ownership.children.insert(id.clone());
        ownership
    }

    /// Returns `true` if `id` lists itself as parent.
    pub fn is_self_owned(&self, id: &BranchId) -> bool {
        self.parents.contains(id)
    }

    /// Render as `{parents: {id: true}, children: {id: true}}`.
    pub fn to_value(&self) -> Value {
        let mut record = Map::new();
        record.insert("parents".into(), id_set(&self.parents));
        record.insert("children".into(), id_set(&self.children));
        Value::Object(record)
    }
}

fn id_set(ids: &BTreeSet<BranchId>) -> Value {
    Value::Object(
        ids.iter()
            .map(|id| (id.to_string(), Value::Bool(true)))
            .collect(),
    )
}

/// One feed: the ownership table plus the per-branch views.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub branches: BTreeMap<BranchId, Ownership>,
    #[serde(default)]
    pub views: BTreeMap<BranchId, View>,
}

impl Feed {
    /// Returns `true` if the feed holds the branch.
    pub fn contains(&self, id: &BranchId) -> bool {
        self.branches.contains_key(id)
    }

    /// Number of branches held.
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Returns `true` if the feed holds no branch.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// The projection registered for a branch.
    pub fn view(&self, id: &BranchId) -> Option<&View> {
        self.views.get(id)
    }

    /// Branches listing themselves as parent.
    pub fn roots(&self) -> impl Iterator<Item = &BranchId> {
        self.branches
            .iter()
            .filter(|(id, ownership)| ownership.is_self_owned(id))
            .map(|(id, _)| id)
    }

    /// Render as `{branches: {...}, views: {...}}`.
    pub fn to_value(&self) -> Value {
        let branches: Map<String, Value> = self
            .branches
            .iter()
            .map(|(id, ownership)| (id.to_string(), ownership.to_value()))
            .collect();
        let views: Map<String, Value> = self
            .views
            .iter()
            .filter_map(|(id, view)| {
                serde_json::to_value(view)
                    .ok()
                    .map(|value| (id.to_string(), value))
            })
            .collect();
        let mut feed = Map::new();
        feed.insert("branches".into(), Value::Object(branches));
        feed.insert("views".into(), Value::Object(views));
        Value::Object(feed)
    }
}
