//! Consistency checks over the ownership graphs.

use serde::{Deserialize, Serialize};
use wh_types::{BranchId, FeedId};

use crate::subscriptions::Subscriptions;

/// A parent named by a branch but absent from the feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingParent {
    pub feed: FeedId,
    pub branch: BranchId,
    pub parent: BranchId,
}

/// An edge recorded on one side only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenEdge {
    pub feed: FeedId,
    pub parent: BranchId,
    pub child: BranchId,
    /// `true` when the parent lists the child but the child lacks the
    /// parent; `false` for the reverse.
    pub missing_on_child: bool,
}

impl Subscriptions {
    /// Parents referenced by a branch that the feed does not hold.
    /// The pending-creation marker is not a real parent and is ignored.
    pub fn dangling_parents(&self) -> Vec<DanglingParent> {
        let mut dangling = Vec::new();
        for (feed_id, feed) in self.feeds() {
            for (branch, ownership) in &feed.branches {
                for parent in &ownership.parents {
                    if parent.is_pending() || feed.contains(parent) {
                        continue;
                    }
                    dangling.push(DanglingParent {
                        feed: feed_id.clone(),
                        branch: branch.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
        dangling
    }

    /// Edges missing their mirror on the other record.
    pub fn broken_edges(&self) -> Vec<BrokenEdge> {
        let mut broken = Vec::new();
        for (feed_id, feed) in self.feeds() {
            for (id, ownership) in &feed.branches {
                for child in &ownership.children {
                    let mirrored = feed
                        .branches
                        .get(child)
                        .is_some_and(|c| c.parents.contains(id));
                    if !mirrored {
                        broken.push(BrokenEdge {
                            feed: feed_id.clone(),
                            parent: id.clone(),
                            child: child.clone(),
                            missing_on_child: true,
                        });
                    }
                }
                for parent in &ownership.parents {
                    let Some(record) = feed.branches.get(parent) else {
                        continue;
                    };
                    if !record.children.contains(id) {
                        broken.push(BrokenEdge {
                            feed: feed_id.clone(),
                            parent: parent.clone(),
                            child: id.clone(),
                            missing_on_child: false,
                        });
                    }
                }
            }
        }
        broken
    }

    /// Records left with an empty parent set.
    pub fn unreachable(&self) -> Vec<(FeedId, BranchId)> {
        self.feeds()
            .flat_map(|(feed_id, feed)| {
                feed.branches
                    .iter()
                    .filter(|(_, ownership)| ownership.parents.is_empty())
                    .map(move |(id, _)| (feed_id.clone(), id.clone()))
            })
            .collect()
    }
}
