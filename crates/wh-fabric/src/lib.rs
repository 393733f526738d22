//! Event fabric for the warehouse.
//!
//! Every observable effect of the warehouse is published as a
//! [`WarehouseEvent`]: feed changes (full snapshots or patches), released
//! branches, and feed lifecycle notices. The [`EventBus`] fans events out to
//! subscribers, each with its own [`EventFilter`] and bounded channel.

pub mod bus;
pub mod error;
pub mod event;

pub use bus::{EventBus, EventFilter, EventStream};
pub use error::{FabricError, Result};
pub use event::{ChangeBody, ChangeMessage, EventId, EventKind, EventPayload, WarehouseEvent};
