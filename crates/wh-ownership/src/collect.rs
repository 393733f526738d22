//! Cascading collection of unreachable branches.
//!
//! Removing a branch from a feed removes it from its parents' `children`
//! and from its children's `parents`. Any child left with no parent is
//! queued and collected in turn, until the work queue drains. Self-loops do
//! not cascade.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use wh_types::{BranchId, FeedId};

use crate::subscriptions::Subscriptions;

/// Everything a collection pass removed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collection {
    /// (feed, branch) records removed, in removal order.
    pub removed: Vec<(FeedId, BranchId)>,
    /// Feeds whose table became empty and was dropped.
    pub disposed: Vec<FeedId>,
    /// Non-singleton branches no longer held by any feed.
    pub unreferenced: Vec<BranchId>,
}

impl Collection {
    /// Returns `true` if nothing was removed.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }

    /// Fold another pass into this one.
    pub fn merge(&mut self, other: Collection) {
        self.removed.extend(other.removed);
        self.disposed.extend(other.disposed);
        for branch in other.unreferenced {
            if !self.unreferenced.contains(&branch) {
                self.unreferenced.push(branch);
            }
        }
    }
}

impl Subscriptions {
    /// Collect `branch` from `feed`, or from every feed holding it when
    /// `feed` is `None`, cascading to orphaned children.
    pub fn collect(&mut self, branch: &BranchId, feed: Option<&FeedId>) -> Collection {
        let mut queue: BTreeMap<FeedId, BTreeSet<BranchId>> = BTreeMap::new();
        match feed {
            Some(feed) => {
                if self.contains(feed, branch) {
                    queue.entry(feed.clone()).or_default().insert(branch.clone());
                }
            }
            None => {
                for feed in self.feeds_of(branch) {
                    queue.entry(feed).or_default().insert(branch.clone());
                }
            }
        }

        let mut collection = Collection::default();
        loop {
            let next = queue
                .iter_mut()
                .find_map(|(feed, pending)| pending.pop_first().map(|b| (feed.clone(), b)));
            let Some((feed, branch)) = next else {
                break;
            };
            self.collect_one(&feed, &branch, &mut queue, &mut collection);
        }
        collection
    }

    /// Collect every branch of a feed. The feed is gone afterwards.
    pub fn collect_feed(&mut self, feed: &FeedId) -> Collection {
        let branches: Vec<BranchId> = self
            .feed(feed)
            .map(|table| table.branches.keys().cloned().collect())
            .unwrap_or_default();
        let mut collection = Collection::default();
        for branch in &branches {
            collection.merge(self.collect(branch, Some(feed)));
        }
        collection
    }

    fn collect_one(
        &mut self,
        feed: &FeedId,
        branch: &BranchId,
        queue: &mut BTreeMap<FeedId, BTreeSet<BranchId>>,
        collection: &mut Collection,
    ) {
        let Some(table) = self.existing_feed_mut(feed) else {
            return;
        };
        let Some(ownership) = table.branches.remove(branch) else {
            return;
        };
        table.views.remove(branch);

        for parent in &ownership.parents {
            if let Some(record) = table.branches.get_mut(parent) {
                record.children.remove(branch);
            }
        }
        for child in &ownership.children {
            if child == branch {
                continue;
            }
            if let Some(record) = table.branches.get_mut(child) {
                record.parents.remove(branch);
                if record.parents.is_empty() {
                    queue.entry(feed.clone()).or_default().insert(child.clone());
                }
            }
        }
        let emptied = table.is_empty();
        collection.removed.push((feed.clone(), branch.clone()));
        debug!(%feed, %branch, "collected from feed");

        if emptied {
            self.remove_feed(feed);
            queue.remove(feed);
            collection.disposed.push(feed.clone());
            debug!(%feed, "feed disposed");
        }

        if branch.is_singleton() {
            return;
        }
        if !self.is_referenced(branch) && !collection.unreferenced.contains(branch) {
            collection.unreferenced.push(branch.clone());
        }
    }
}
