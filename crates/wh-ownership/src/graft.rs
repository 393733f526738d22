//! Copying a branch with its ancestry, or with its descendants, from one
//! feed into another.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use wh_types::{BranchId, FeedId};

use crate::error::{OwnershipError, Result};
use crate::ownership::{Feed, Ownership};
use crate::subscriptions::Subscriptions;

impl Subscriptions {
    /// Graft `branch` from `from` into `to`.
    ///
    /// The branch and every ancestor reachable through its parents are
    /// copied with their parent sets. Children are not carried over: each
    /// copied record only gains the child edges along the grafted chain,
    /// plus its self edge when it is a root. Records already present in
    /// `to` are merged.
    ///
    /// Returns the grafted branch ids.
    pub fn graft(&mut self, branch: &BranchId, from: &FeedId, to: &FeedId) -> Result<Vec<BranchId>> {
        let source = self.graft_source(branch, from)?;

        let mut copies: BTreeMap<BranchId, Ownership> = BTreeMap::new();
        let mut visited: BTreeSet<BranchId> = BTreeSet::new();
        let mut stack: Vec<(BranchId, Option<BranchId>)> = vec![(branch.clone(), None)];

        while let Some((node, child)) = stack.pop() {
            let Some(original) = source.branches.get(&node) else {
                continue;
            };
            let copy = copies.entry(node.clone()).or_default();
            if let Some(child) = child {
                copy.children.insert(child);
            }
            if !visited.insert(node.clone()) {
                continue;
            }
            for parent in &original.parents {
                if parent == &node {
                    copy.parents.insert(parent.clone());
                    copy.children.insert(node.clone());
                } else if parent.is_pending() {
                    copy.parents.insert(parent.clone());
                } else if source.contains(parent) {
                    copy.parents.insert(parent.clone());
                    stack.push((parent.clone(), Some(node.clone())));
                }
            }
        }

        let grafted = self.merge_into(to, copies);
        debug!(%branch, %from, %to, count = grafted.len(), "grafted branch");
        Ok(grafted)
    }

    /// Graft `branch` and its subtree from `from` into `to`.
    ///
    /// Every descendant reachable through the children sets is copied with
    /// all of its children. Parent edges are kept only when the parent is
    /// itself part of the subtree, so the grafted branch loses its own
    /// parents unless it is a root. Records already present in `to` are
    /// merged.
    ///
    /// Returns the grafted branch ids.
    pub fn graft_subtree(
        &mut self,
        branch: &BranchId,
        from: &FeedId,
        to: &FeedId,
    ) -> Result<Vec<BranchId>> {
        let source = self.graft_source(branch, from)?;

        let mut subtree: BTreeSet<BranchId> = BTreeSet::new();
        let mut stack = vec![branch.clone()];
        while let Some(node) = stack.pop() {
            let Some(original) = source.branches.get(&node) else {
                continue;
            };
            if !subtree.insert(node.clone()) {
                continue;
            }
            stack.extend(
                original
                    .children
                    .iter()
                    .filter(|child| !subtree.contains(*child))
                    .cloned(),
            );
        }

        let copies: BTreeMap<BranchId, Ownership> = subtree
            .iter()
            .filter_map(|id| source.branches.get(id).map(|original| (id, original)))
            .map(|(id, original)| {
                let copy = Ownership {
                    parents: original.parents.intersection(&subtree).cloned().collect(),
                    children: original
                        .children
                        .iter()
                        .filter(|child| source.contains(child))
                        .cloned()
                        .collect(),
                };
                (id.clone(), copy)
            })
            .collect();

        let grafted = self.merge_into(to, copies);
        debug!(%branch, %from, %to, count = grafted.len(), "grafted subtree");
        Ok(grafted)
    }

    fn graft_source(&self, branch: &BranchId, from: &FeedId) -> Result<&Feed> {
        let source = self
            .feed(from)
            .ok_or_else(|| OwnershipError::FeedNotFound(from.clone()))?;
        if !source.contains(branch) {
            return Err(OwnershipError::BranchNotInFeed {
                branch: branch.clone(),
                feed: from.clone(),
            });
        }
        Ok(source)
    }

    fn merge_into(&mut self, to: &FeedId, copies: BTreeMap<BranchId, Ownership>) -> Vec<BranchId> {
        let target = self.feed_mut(to);
        let grafted: Vec<BranchId> = copies.keys().cloned().collect();
        for (id, copy) in copies {
            let record = target.branches.entry(id).or_default();
            record.parents.extend(copy.parents);
            record.children.extend(copy.children);
        }
        grafted
    }
}
