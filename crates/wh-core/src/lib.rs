//! The warehouse.
//!
//! An in-memory object store where every branch lives as long as some feed
//! owns it. Feeds are per-subscriber ownership graphs; collecting a branch
//! cascades to the children it leaves without parents, and a branch no feed
//! holds any more is announced as released and eventually purged. Each
//! subscribed feed publishes its projected state as a full snapshot first
//! and as patches afterwards.
//!
//! # Key Types
//!
//! - [`Warehouse`]: the facade: every mutation, read and diagnostic
//! - [`Command`] / [`Reply`]: the wire-level command surface, routed by
//!   [`Warehouse::dispatch`]
//! - [`WarehouseConfig`]: windows, batch sizes and reserved namespaces
//! - [`Query`]: filtered, projected reads
//! - [`DiagnosticReport`]: what `check` found
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use wh_core::{UpsertRequest, Warehouse};
//! use wh_types::{BranchId, FeedId};
//!
//! let wh = Warehouse::default();
//! wh.subscribe(&FeedId::new("desktop"), &[BranchId::new("workshop@main")]).unwrap();
//! wh.upsert(
//!     UpsertRequest::new("contact@1")
//!         .data(json!({"name": "Ada"}))
//!         .parent("workshop@main")
//!         .feed("desktop"),
//! )
//! .unwrap();
//! assert!(wh.has("contact@1").unwrap());
//!
//! wh.delete_branch(&BranchId::new("workshop@main")).unwrap();
//! wh.flush_released().unwrap();
//! assert!(!wh.has("contact@1").unwrap());
//! ```

pub mod changes;
pub mod command;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod maintenance;
pub mod query;
pub mod release;
pub mod request;
pub mod timers;
pub mod warehouse;

pub use changes::{project_branch, project_feed, ChangeTracker};
pub use command::{Command, Reply};
pub use config::WarehouseConfig;
pub use diagnostics::{DiagnosticReport, Unreachable};
pub use error::{Result, WarehouseError};
pub use graph::{render_dot, GraphStyle};
pub use maintenance::{Maintenance, MaintenanceGate};
pub use query::Query;
pub use release::ReleaseQueue;
pub use request::{AttachRequest, UpsertOutcome, UpsertRequest};
pub use timers::TimerKey;
pub use warehouse::{Stats, Warehouse};

pub use wh_fabric::{ChangeBody, ChangeMessage, EventFilter, EventKind, EventPayload, EventStream, WarehouseEvent};
