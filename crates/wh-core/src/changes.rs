//! Per-feed change detection.
//!
//! Every subscribed feed has a tracker remembering the projection it
//! last published, the branches touched since, and the next generation
//! number. A pass projects only the dirty branches and diffs them against
//! the published projection, so a burst of mutations costs one comparison
//! per touched branch rather than a re-diff of the whole feed.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use wh_diff::{diff_dirty, Projection};
use wh_fabric::ChangeMessage;
use wh_ownership::Subscriptions;
use wh_store::WarehouseState;
use wh_types::{project, BranchId, FeedId, Generation};

/// Project one branch as `feed` sees it. `None` if the branch is not in
/// the feed or has no payload yet.
pub fn project_branch(
    state: &WarehouseState,
    feed: &FeedId,
    branch: &BranchId,
) -> Option<serde_json::Value> {
    let table = state.subscriptions.feed(feed)?;
    if !table.contains(branch) {
        return None;
    }
    let payload = state.store.get(branch)?;
    Some(project(payload, table.view(branch)))
}

/// Project every branch of `feed`.
pub fn project_feed(state: &WarehouseState, feed: &FeedId) -> Projection {
    let Some(table) = state.subscriptions.feed(feed) else {
        return Projection::new();
    };
    table
        .branches
        .keys()
        .filter_map(|id| {
            let payload = state.store.get(id)?;
            Some((id.clone(), project(payload, table.view(id))))
        })
        .collect()
}

#[derive(Debug, Default)]
struct FeedTracker {
    next_generation: Generation,
    published: Projection,
    dirty: BTreeSet<BranchId>,
    needs_snapshot: bool,
}

impl FeedTracker {
    fn fresh() -> Self {
        Self {
            needs_snapshot: true,
            ..Self::default()
        }
    }

    fn next(&mut self) -> Generation {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }
}

/// Change-detection registrations of every subscribed feed.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    feeds: BTreeMap<FeedId, FeedTracker>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install change detection for a feed, replacing any previous
    /// registration. The next pass publishes a snapshot at generation 0.
    pub fn register(&mut self, feed: &FeedId) {
        if self.feeds.insert(feed.clone(), FeedTracker::fresh()).is_some() {
            debug!(%feed, "change detection replaced");
        }
    }

    /// Drop a registration. Returns `false` if there was none.
    pub fn unregister(&mut self, feed: &FeedId) -> bool {
        self.feeds.remove(feed).is_some()
    }

    pub fn is_registered(&self, feed: &FeedId) -> bool {
        self.feeds.contains_key(feed)
    }

    /// Registered feeds, ordered.
    pub fn feeds(&self) -> Vec<FeedId> {
        self.feeds.keys().cloned().collect()
    }

    /// Mark `branch` dirty in every registered feed that holds it now or
    /// published it before. Returns the feeds marked.
    pub fn mark(&mut self, branch: &BranchId, subscriptions: &Subscriptions) -> Vec<FeedId> {
        let mut marked = Vec::new();
        for (feed, tracker) in &mut self.feeds {
            if subscriptions.contains(feed, branch) || tracker.published.contains_key(branch) {
                tracker.dirty.insert(branch.clone());
                marked.push(feed.clone());
            }
        }
        marked
    }

    /// Mark `branch` dirty in one feed. Returns `false` if the feed is not
    /// registered.
    pub fn mark_in(&mut self, feed: &FeedId, branch: &BranchId) -> bool {
        match self.feeds.get_mut(feed) {
            Some(tracker) => {
                tracker.dirty.insert(branch.clone());
                true
            }
            None => false,
        }
    }

    /// Force the next pass of `feed` to publish a snapshot.
    pub fn request_snapshot(&mut self, feed: &FeedId) -> bool {
        match self.feeds.get_mut(feed) {
            Some(tracker) => {
                tracker.needs_snapshot = true;
                true
            }
            None => false,
        }
    }

    /// Force a snapshot on every registered feed.
    pub fn request_all_snapshots(&mut self) {
        for tracker in self.feeds.values_mut() {
            tracker.needs_snapshot = true;
        }
    }

    /// Returns `true` if the next pass of `feed` may emit.
    pub fn is_pending(&self, feed: &FeedId) -> bool {
        self.feeds
            .get(feed)
            .is_some_and(|t| t.needs_snapshot || !t.dirty.is_empty())
    }

    /// Run one pass for `feed`.
    ///
    /// A requested snapshot is always emitted. Otherwise the dirty branches
    /// are diffed against the published projection and nothing is emitted
    /// when they are unchanged.
    pub fn compute(&mut self, feed: &FeedId, state: &WarehouseState) -> Option<ChangeMessage> {
        let tracker = self.feeds.get_mut(feed)?;

        if tracker.needs_snapshot {
            let projection = project_feed(state, feed);
            tracker.published = projection.clone();
            tracker.dirty.clear();
            tracker.needs_snapshot = false;
            let generation = tracker.next();
            debug!(%feed, generation, branches = projection.len(), "snapshot");
            return Some(ChangeMessage::snapshot(generation, projection));
        }

        if tracker.dirty.is_empty() {
            return None;
        }
        let dirty = std::mem::take(&mut tracker.dirty);
        let current: Projection = dirty
            .iter()
            .filter_map(|id| project_branch(state, feed, id).map(|v| (id.clone(), v)))
            .collect();
        let patch = diff_dirty(&tracker.published, &current, &dirty);
        if patch.is_empty() {
            return None;
        }
        for id in &dirty {
            match current.get(id) {
                Some(value) => {
                    tracker.published.insert(id.clone(), value.clone());
                }
                None => {
                    tracker.published.remove(id);
                }
            }
        }
        let generation = tracker.next();
        debug!(
            %feed,
            generation,
            added = patch.additions(),
            removed = patch.removals(),
            modified = patch.modifications(),
            "patch"
        );
        Some(ChangeMessage::patch(generation, patch))
    }
}
