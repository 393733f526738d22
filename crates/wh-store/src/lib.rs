//! State storage for the warehouse.
//!
//! - [`BranchStore`] holds payloads, generations and creators
//! - [`WarehouseState`] pairs the store with the ownership graphs and
//!   resolves dotted state paths
//! - [`StatePersistence`] saves and restores snapshots

pub mod branches;
pub mod error;
pub mod persistence;
pub mod state;

pub use branches::{is_empty_payload, BranchStore};
pub use error::{StoreError, StoreResult};
pub use persistence::{InMemoryPersistence, JsonFilePersistence, StatePersistence};
pub use state::WarehouseState;
