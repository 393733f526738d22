use serde::Serialize;
use wh_ownership::{BrokenEdge, DanglingParent};
use wh_store::WarehouseState;
use wh_types::{BranchId, FeedId};

/// A record left in a feed with no parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Unreachable {
    pub feed: FeedId,
    pub branch: BranchId,
}

/// Everything `check` found. Diagnostics never modify the state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticReport {
    pub dangling: Vec<DanglingParent>,
    pub broken_edges: Vec<BrokenEdge>,
    pub unreachable: Vec<Unreachable>,
    pub orphans: Vec<BranchId>,
}

impl DiagnosticReport {
    pub fn collect(state: &WarehouseState) -> Self {
        Self {
            dangling: state.subscriptions.dangling_parents(),
            broken_edges: state.subscriptions.broken_edges(),
            unreachable: state
                .subscriptions
                .unreachable()
                .into_iter()
                .map(|(feed, branch)| Unreachable { feed, branch })
                .collect(),
            orphans: state.orphans(),
        }
    }

    /// Returns `true` if nothing was found.
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty()
            && self.broken_edges.is_empty()
            && self.unreachable.is_empty()
            && self.orphans.is_empty()
    }

    /// Total number of findings.
    pub fn len(&self) -> usize {
        self.dangling.len() + self.broken_edges.len() + self.unreachable.len() + self.orphans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_clean()
    }
}
