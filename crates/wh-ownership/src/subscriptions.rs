//! The subscription table: one ownership graph per feed.
//!
//! [`Subscriptions`] owns every feed's [`Feed`] table and implements the
//! edge-level operations (ownership updates on upsert, attach, detach).
//! The cascading collector lives in [`crate::collect`] and grafting in
//! [`crate::graft`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use wh_types::pattern::any_match;
use wh_types::{BranchId, FeedId, IdPattern, View};

use crate::error::{OwnershipError, Result};
use crate::ownership::{Feed, Ownership};

/// Every feed's ownership table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subscriptions {
    feeds: BTreeMap<FeedId, Feed>,
}

/// Arguments of an ownership update performed on upsert.
#[derive(Clone, Copy, Debug)]
pub struct OwnershipUpdate<'a> {
    pub branch: &'a BranchId,
    pub parents: &'a [BranchId],
    pub feeds: &'a [FeedId],
    /// `Some(true)` starts a creation, `Some(false)` completes one.
    pub creating: Option<bool>,
    pub creator: Option<&'a str>,
}

/// Result of [`Subscriptions::update_ownership`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The branch is attached in every requested feed that accepted it.
    Attached,
    /// The update was reverted and the branch discarded.
    Collected(CollectReason),
}

/// Why an ownership update discarded the branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectReason {
    /// A new parent edge named a parent absent from the feed.
    MissingParent,
    /// Every requested (feed, parent) pair named an unknown parent.
    UnknownParents,
}

/// Result of [`Subscriptions::detach`] for one feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Detached {
    pub feed: FeedId,
    /// Parents whose edge was removed.
    pub removed: Vec<BranchId>,
    /// The branch has no parent left in the feed and must be collected.
    pub orphaned: bool,
}

/// Saved copies of feed tables, restored when an operation aborts.
pub(crate) struct Checkpoint(Vec<(FeedId, Option<Feed>)>);

impl Subscriptions {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A feed's table.
    pub fn feed(&self, id: &FeedId) -> Option<&Feed> {
        self.feeds.get(id)
    }

    /// Every feed with its table, ordered by id.
    pub fn feeds(&self) -> impl Iterator<Item = (&FeedId, &Feed)> {
        self.feeds.iter()
    }

    /// Every feed id, ordered.
    pub fn feed_ids(&self) -> impl Iterator<Item = &FeedId> {
        self.feeds.keys()
    }

    /// Returns `true` if the feed exists.
    pub fn has_feed(&self, id: &FeedId) -> bool {
        self.feeds.contains_key(id)
    }

    /// Number of feeds.
    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    /// Returns `true` if no feed exists.
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Returns `true` if `feed` holds `branch`.
    pub fn contains(&self, feed: &FeedId, branch: &BranchId) -> bool {
        self.feeds.get(feed).is_some_and(|f| f.contains(branch))
    }

    /// The ownership record of `branch` in `feed`.
    pub fn ownership(&self, feed: &FeedId, branch: &BranchId) -> Option<&Ownership> {
        self.feeds.get(feed).and_then(|f| f.branches.get(branch))
    }

    /// Every feed holding `branch`.
    pub fn feeds_of(&self, branch: &BranchId) -> Vec<FeedId> {
        self.feeds
            .iter()
            .filter(|(_, feed)| feed.contains(branch))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Returns `true` if any feed still holds `branch`.
    pub fn is_referenced(&self, branch: &BranchId) -> bool {
        self.feeds.values().any(|feed| feed.contains(branch))
    }

    /// Every branch held by at least one feed.
    pub fn referenced(&self) -> BTreeSet<&BranchId> {
        self.feeds
            .values()
            .flat_map(|feed| feed.branches.keys())
            .collect()
    }

    pub(crate) fn feed_mut(&mut self, id: &FeedId) -> &mut Feed {
        self.feeds.entry(id.clone()).or_default()
    }

    pub(crate) fn existing_feed_mut(&mut self, id: &FeedId) -> Option<&mut Feed> {
        self.feeds.get_mut(id)
    }

    pub(crate) fn remove_feed(&mut self, id: &FeedId) -> Option<Feed> {
        self.feeds.remove(id)
    }

    /// Make every branch a self-owned root of `feed`.
    ///
    /// Returns the branches that were not yet self-owned there.
    pub fn subscribe(&mut self, feed: &FeedId, branches: &[BranchId]) -> Vec<BranchId> {
        if branches.is_empty() {
            return Vec::new();
        }
        let table = self.feed_mut(feed);
        let mut rooted = Vec::new();
        for branch in branches {
            let ownership = table.branches.entry(branch.clone()).or_default();
            if ownership.parents.insert(branch.clone()) {
                rooted.push(branch.clone());
            }
            ownership.children.insert(branch.clone());
        }
        debug!(%feed, rooted = rooted.len(), "subscribed branches");
        rooted
    }

    /// Register or clear the projection of a branch in a feed.
    pub fn set_view(&mut self, feed: &FeedId, branch: &BranchId, view: Option<View>) {
        let Some(table) = self.feeds.get_mut(feed) else {
            return;
        };
        match view {
            Some(view) => {
                table.views.insert(branch.clone(), view);
            }
            None => {
                table.views.remove(branch);
            }
        }
    }

    /// Add the edge `parent -> child` in `feed`, creating records as needed.
    pub fn link(&mut self, feed: &FeedId, parent: &BranchId, child: &BranchId) {
        let table = self.feed_mut(feed);
        table
            .branches
            .entry(parent.clone())
            .or_default()
            .children
            .insert(child.clone());
        table
            .branches
            .entry(child.clone())
            .or_default()
            .parents
            .insert(parent.clone());
    }

    /// Remove the edge `parent -> child` in `feed`. Records are kept even
    /// when their sets become empty.
    pub fn unlink(&mut self, feed: &FeedId, parent: &BranchId, child: &BranchId) {
        let Some(table) = self.feeds.get_mut(feed) else {
            return;
        };
        if let Some(ownership) = table.branches.get_mut(child) {
            ownership.parents.remove(parent);
        }
        if let Some(ownership) = table.branches.get_mut(parent) {
            ownership.children.remove(child);
        }
    }

    /// Record the parent edges requested by an upsert.
    ///
    /// Each (feed, parent) pair is processed in order. A pair is skipped
    /// when the branch has no parent yet in that feed and the parent is
    /// unknown there. When every pair is skipped, or a new edge names a
    /// parent missing from its feed, all touched feeds are restored and the
    /// branch is reported as collected.
    pub fn update_ownership(&mut self, update: &OwnershipUpdate<'_>) -> Result<UpdateOutcome> {
        let branch = update.branch;
        if update.creating == Some(true) && update.creator.map_or(true, str::is_empty) {
            return Err(OwnershipError::MissingCreator {
                branch: branch.clone(),
            });
        }
        if update.parents.is_empty() || update.parents.iter().any(|p| p.as_str().is_empty()) {
            return Err(OwnershipError::OrphanBranch {
                branch: branch.clone(),
            });
        }

        let checkpoint = self.checkpoint(update.feeds);
        let pending = BranchId::pending();
        let mut skipped = 0usize;

        for feed in update.feeds {
            for parent in update.parents {
                let mut ownership = self.ownership(feed, branch).cloned().unwrap_or_default();
                match update.creating {
                    Some(true) => {
                        ownership.parents.insert(pending.clone());
                    }
                    Some(false) => {
                        ownership.parents.remove(&pending);
                    }
                    None => {}
                }

                let parent_known = self.contains(feed, parent);
                if parent != branch && ownership.parents.is_empty() && !parent_known {
                    skipped += 1;
                    continue;
                }

                if parent == branch {
                    ownership.children.insert(branch.clone());
                } else if !ownership.parents.contains(parent) {
                    if !parent_known {
                        warn!(%parent, %branch, %feed, "missing parent, branch collected");
                        self.restore(checkpoint);
                        return Ok(UpdateOutcome::Collected(CollectReason::MissingParent));
                    }
                    self.feed_mut(feed)
                        .branches
                        .entry(parent.clone())
                        .or_default()
                        .children
                        .insert(branch.clone());
                }
                ownership.parents.insert(parent.clone());
                self.feed_mut(feed).branches.insert(branch.clone(), ownership);
            }
        }

        if skipped > 0 && skipped == update.parents.len() * update.feeds.len() {
            warn!(%branch, "collected immediately, every requested parent is unknown");
            self.restore(checkpoint);
            return Ok(UpdateOutcome::Collected(CollectReason::UnknownParents));
        }

        let orphaned = update
            .feeds
            .iter()
            .any(|feed| self.ownership(feed, branch).is_some_and(|o| o.parents.is_empty()));
        if orphaned {
            self.restore(checkpoint);
            return Err(OwnershipError::OrphanBranch {
                branch: branch.clone(),
            });
        }

        Ok(UpdateOutcome::Attached)
    }

    /// Add parent edges to `branch` in one feed.
    ///
    /// A parent that is neither the branch itself nor an anchor (as decided
    /// by `is_anchor`) must already have a parent of its own in the feed;
    /// otherwise the whole attach is reverted for that feed and `false` is
    /// returned. Anchors absent from the feed are added as self-owned roots.
    pub fn attach(
        &mut self,
        branch: &BranchId,
        parents: &[BranchId],
        feed: &FeedId,
        view: Option<&View>,
        is_anchor: &dyn Fn(&BranchId) -> bool,
    ) -> bool {
        let checkpoint = self.checkpoint(std::slice::from_ref(feed));
        for parent in parents {
            if parent != branch {
                if is_anchor(parent) {
                    if !self.contains(feed, parent) {
                        self.subscribe(feed, std::slice::from_ref(parent));
                    }
                } else {
                    let reachable = self
                        .ownership(feed, parent)
                        .is_some_and(|o| !o.parents.is_empty());
                    if !reachable {
                        warn!(%parent, %branch, %feed, "attach aborted, parent is not reachable");
                        self.restore(checkpoint);
                        return false;
                    }
                }
            }
            self.link(feed, parent, branch);
        }
        if let Some(view) = view {
            self.set_view(feed, branch, Some(view.clone()));
        }
        true
    }

    /// Remove the parent edges of `branch` matching any pattern in `feed`.
    pub fn detach(&mut self, branch: &BranchId, patterns: &[IdPattern], feed: &FeedId) -> Detached {
        let matched: Vec<BranchId> = self
            .ownership(feed, branch)
            .map(|ownership| {
                ownership
                    .parents
                    .iter()
                    .filter(|parent| any_match(patterns, parent.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for parent in &matched {
            self.unlink(feed, parent, branch);
        }
        let orphaned = self
            .ownership(feed, branch)
            .is_some_and(|ownership| ownership.parents.is_empty());
        Detached {
            feed: feed.clone(),
            removed: matched,
            orphaned,
        }
    }

    /// Render as `{feed: {branches, views}}`.
    pub fn to_value(&self) -> Value {
        let feeds: Map<String, Value> = self
            .feeds
            .iter()
            .map(|(id, feed)| (id.to_string(), feed.to_value()))
            .collect();
        Value::Object(feeds)
    }

    pub(crate) fn checkpoint(&self, feeds: &[FeedId]) -> Checkpoint {
        let mut saved: Vec<(FeedId, Option<Feed>)> = Vec::with_capacity(feeds.len());
        for feed in feeds {
            if saved.iter().all(|(id, _)| id != feed) {
                saved.push((feed.clone(), self.feeds.get(feed).cloned()));
            }
        }
        Checkpoint(saved)
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        for (id, feed) in checkpoint.0 {
            match feed {
                Some(feed) => {
                    self.feeds.insert(id, feed);
                }
                None => {
                    self.feeds.remove(&id);
                }
            }
        }
    }
}
