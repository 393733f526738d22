//! Error types for ownership graph operations.

use thiserror::Error;
use wh_types::{BranchId, FeedId, TypeError};

/// Errors raised by the ownership engine.
///
/// `MissingCreator` and `OrphanBranch` signal caller bugs: the request is
/// rejected before anything is mutated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OwnershipError {
    /// A creation was started without naming its creator.
    #[error("missing creator for {branch}")]
    MissingCreator { branch: BranchId },

    /// An ownership update would leave the branch with no parent.
    #[error("orphan branch: {branch} has no parent")]
    OrphanBranch { branch: BranchId },

    /// The feed does not exist.
    #[error("feed not found: {0}")]
    FeedNotFound(FeedId),

    /// The branch is not held by the feed.
    #[error("branch {branch} is not in feed {feed}")]
    BranchNotInFeed { branch: BranchId, feed: FeedId },

    /// A malformed id or pattern.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Convenience alias for ownership results.
pub type Result<T> = std::result::Result<T, OwnershipError>;
