//! Diff engine for the warehouse.
//!
//! Computes what changed in a feed between two publications, so that
//! subscribers receive incremental patches instead of full snapshots.
//!
//! # Key Types
//!
//! - [`PatchOp`] / [`OpKind`] -- JSON-Patch style operation on one value
//! - [`FeedPatch`] / [`BranchPatch`] -- Branch-keyed patch of a feed projection
//! - [`Projection`] -- Projected payloads of one feed

pub mod error;
pub mod feed_patch;
pub mod value_diff;

pub use error::{DiffError, DiffResult};
pub use feed_patch::{
    apply_patch, diff_branch, diff_dirty, diff_projections, BranchPatch, FeedPatch, Projection,
};
pub use value_diff::{apply_ops, diff_values, OpKind, PatchOp};
