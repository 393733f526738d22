//! Branch-keyed patches between two feed projections.
//!
//! A feed projection maps every branch the feed holds to its projected
//! payload. A [`FeedPatch`] carries one entry per changed branch: a `false`
//! tombstone for a removal, the full value for an addition, or a list of
//! [`PatchOp`]s for a modification.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wh_types::BranchId;

use crate::error::{DiffError, DiffResult};
use crate::value_diff::{apply_ops, diff_values, PatchOp};

/// Projected payloads of one feed.
pub type Projection = BTreeMap<BranchId, Value>;

/// Change to one branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BranchPatchRepr", into = "BranchPatchRepr")]
pub enum BranchPatch {
    /// The branch left the feed.
    Removed,
    /// The branch entered the feed.
    Added(Value),
    /// The branch changed in place.
    Changed(Vec<PatchOp>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BranchPatchRepr {
    Tombstone(bool),
    Added { added: Value },
    Changed { patch: Vec<PatchOp> },
}

impl TryFrom<BranchPatchRepr> for BranchPatch {
    type Error = DiffError;

    fn try_from(repr: BranchPatchRepr) -> DiffResult<Self> {
        match repr {
            BranchPatchRepr::Tombstone(false) => Ok(BranchPatch::Removed),
            BranchPatchRepr::Tombstone(true) => Err(DiffError::InvalidTombstone),
            BranchPatchRepr::Added { added } => Ok(BranchPatch::Added(added)),
            BranchPatchRepr::Changed { patch } => Ok(BranchPatch::Changed(patch)),
        }
    }
}

impl From<BranchPatch> for BranchPatchRepr {
    fn from(patch: BranchPatch) -> Self {
        match patch {
            BranchPatch::Removed => BranchPatchRepr::Tombstone(false),
            BranchPatch::Added(added) => BranchPatchRepr::Added { added },
            BranchPatch::Changed(patch) => BranchPatchRepr::Changed { patch },
        }
    }
}

/// Per-branch changes of one feed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedPatch {
    pub branches: BTreeMap<BranchId, BranchPatch>,
}

impl FeedPatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no branch changed.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Number of changed branches.
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Number of added branches.
    pub fn additions(&self) -> usize {
        self.count(|p| matches!(p, BranchPatch::Added(_)))
    }

    /// Number of removed branches.
    pub fn removals(&self) -> usize {
        self.count(|p| matches!(p, BranchPatch::Removed))
    }

    /// Number of modified branches.
    pub fn modifications(&self) -> usize {
        self.count(|p| matches!(p, BranchPatch::Changed(_)))
    }

    fn count(&self, pred: impl Fn(&BranchPatch) -> bool) -> usize {
        self.branches.values().filter(|p| pred(p)).count()
    }
}

/// Diff one branch between two projections. `None` means unchanged.
pub fn diff_branch(old: Option<&Value>, new: Option<&Value>) -> Option<BranchPatch> {
    match (old, new) {
        (None, None) => None,
        (Some(_), None) => Some(BranchPatch::Removed),
        (None, Some(value)) => Some(BranchPatch::Added(value.clone())),
        (Some(before), Some(after)) => {
            let ops = diff_values(before, after);
            (!ops.is_empty()).then_some(BranchPatch::Changed(ops))
        }
    }
}

/// Diff two projections over the branches in `dirty` only.
pub fn diff_dirty(old: &Projection, new: &Projection, dirty: &BTreeSet<BranchId>) -> FeedPatch {
    let branches = dirty
        .iter()
        .filter_map(|id| diff_branch(old.get(id), new.get(id)).map(|p| (id.clone(), p)))
        .collect();
    FeedPatch { branches }
}

/// Diff two complete projections.
pub fn diff_projections(old: &Projection, new: &Projection) -> FeedPatch {
    let keys: BTreeSet<BranchId> = old.keys().chain(new.keys()).cloned().collect();
    diff_dirty(old, new, &keys)
}

/// Apply a patch to a projection.
pub fn apply_patch(projection: &mut Projection, patch: &FeedPatch) -> DiffResult<()> {
    for (id, change) in &patch.branches {
        match change {
            BranchPatch::Removed => {
                projection.remove(id);
            }
            BranchPatch::Added(value) => {
                projection.insert(id.clone(), value.clone());
            }
            BranchPatch::Changed(ops) => {
                let target = projection
                    .get_mut(id)
                    .ok_or_else(|| DiffError::MissingBranch(id.to_string()))?;
                apply_ops(target, ops)?;
            }
        }
    }
    Ok(())
}
