//! Error types for the diff crate.

/// Errors raised while applying patches.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// A patch path addressed nothing in the target.
    #[error("patch target not found: {0}")]
    MissingTarget(String),

    /// A patch path is not a valid JSON pointer.
    #[error("invalid patch path: {0}")]
    InvalidPath(String),

    /// A branch tombstone was `true` instead of `false`.
    #[error("invalid tombstone: removals are encoded as false")]
    InvalidTombstone,

    /// A change was addressed to a branch absent from the snapshot.
    #[error("cannot patch missing branch {0}")]
    MissingBranch(String),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
