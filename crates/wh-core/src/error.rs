//! Error types for warehouse operations.

use thiserror::Error;
use wh_diff::DiffError;
use wh_ownership::OwnershipError;
use wh_store::StoreError;
use wh_types::TypeError;

/// Errors returned by the warehouse.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// A mutating call arrived while another caller holds maintenance.
    #[error("{description}")]
    MaintenanceLockout { description: String },

    /// Maintenance can only be lifted by the caller that enabled it.
    #[error("maintenance is held by {holder}")]
    NotMaintainer { holder: String },

    /// The operation needs a persistence backend and none is configured.
    #[error("no persistence backend configured")]
    NoPersistence,

    /// A command could not be decoded or carried invalid arguments.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The warehouse lock was poisoned by a panicking writer.
    #[error("warehouse lock poisoned")]
    LockPoisoned,

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O failure while writing an export.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ownership(#[from] OwnershipError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Convenience alias for warehouse results.
pub type Result<T> = std::result::Result<T, WarehouseError>;
