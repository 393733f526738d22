//! Ownership graphs for the warehouse.
//!
//! Every feed keeps its own directed graph of branches. A branch lives in a
//! feed as long as it has at least one parent there; roots are branches
//! listing themselves as parent. When the last parent edge of a branch
//! goes, the branch is collected from the feed and the removal cascades to
//! any child left without a parent.
//!
//! # Key Types
//!
//! - [`Subscriptions`]: every feed's table with the edge operations
//! - [`Ownership`]: the parent/child sets of one branch in one feed
//! - [`Collection`]: what a collection pass removed
//! - [`OwnershipUpdate`] / [`UpdateOutcome`]: parent edges requested by an upsert

pub mod collect;
pub mod diagnostics;
pub mod error;
pub mod graft;
pub mod ownership;
pub mod subscriptions;

pub use collect::Collection;
pub use diagnostics::{BrokenEdge, DanglingParent};
pub use error::{OwnershipError, Result};
pub use ownership::{Feed, Ownership};
pub use subscriptions::{CollectReason, Detached, OwnershipUpdate, Subscriptions, UpdateOutcome};
