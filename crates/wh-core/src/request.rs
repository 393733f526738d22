//! Arguments of the mutating operations that take more than a branch id.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use wh_types::{BranchId, FeedId, Generation, View};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Accept a single value, a list, or nothing.
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

/// Arguments of [`crate::Warehouse::upsert`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRequest {
    pub branch: BranchId,
    /// New payload. `null` and `{}` only touch ownership of an existing
    /// branch.
    #[serde(default)]
    pub data: Value,
    #[serde(default, deserialize_with = "one_or_many")]
    pub parents: Vec<BranchId>,
    /// Feeds to attach in. Empty means the system feed.
    #[serde(default, deserialize_with = "one_or_many")]
    pub feeds: Vec<FeedId>,
    #[serde(default)]
    pub is_creating: Option<bool>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub generation: Option<Generation>,
}

impl UpsertRequest {
    pub fn new(branch: impl Into<BranchId>) -> Self {
        Self {
            branch: branch.into(),
            data: Value::Null,
            parents: Vec::new(),
            feeds: Vec::new(),
            is_creating: None,
            creator: None,
            generation: None,
        }
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn parent(mut self, parent: impl Into<BranchId>) -> Self {
        self.parents.push(parent.into());
        self
    }

    pub fn feed(mut self, feed: impl Into<FeedId>) -> Self {
        self.feeds.push(feed.into());
        self
    }

    /// Start a creation on behalf of `creator`.
    pub fn creating(mut self, creator: impl Into<String>) -> Self {
        self.is_creating = Some(true);
        self.creator = Some(creator.into());
        self
    }

    /// Complete a creation.
    pub fn created(mut self) -> Self {
        self.is_creating = Some(false);
        self
    }

    pub fn generation(mut self, generation: Generation) -> Self {
        self.generation = Some(generation);
        self
    }

    pub(crate) fn target_feeds(&self) -> Vec<FeedId> {
        if self.feeds.is_empty() {
            vec![FeedId::system()]
        } else {
            self.feeds.clone()
        }
    }
}

/// What an upsert did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpsertOutcome {
    /// The payload was written.
    Stored,
    /// Unknown branch without parents: nothing happened.
    Ignored,
    /// No requested parent was reachable and the payload was discarded.
    Collected,
}

impl UpsertOutcome {
    pub fn is_collected(&self) -> bool {
        matches!(self, Self::Collected)
    }
}

/// Arguments of [`crate::Warehouse::attach`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRequest {
    pub branch: BranchId,
    #[serde(default, deserialize_with = "one_or_many")]
    pub parents: Vec<BranchId>,
    /// Feeds to attach in. Empty means every feed holding the branch, or
    /// the system feed when none does.
    #[serde(default, deserialize_with = "one_or_many")]
    pub feeds: Vec<FeedId>,
    #[serde(default)]
    pub generation: Option<Generation>,
    #[serde(default)]
    pub view: Option<View>,
}

impl AttachRequest {
    pub fn new(branch: impl Into<BranchId>) -> Self {
        Self {
            branch: branch.into(),
            parents: Vec::new(),
            feeds: Vec::new(),
            generation: None,
            view: None,
        }
    }

    pub fn parent(mut self, parent: impl Into<BranchId>) -> Self {
        self.parents.push(parent.into());
        self
    }

    pub fn feed(mut self, feed: impl Into<FeedId>) -> Self {
        self.feeds.push(feed.into());
        self
    }

    pub fn generation(mut self, generation: Generation) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = Some(view);
        self
    }
}
