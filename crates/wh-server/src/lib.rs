//! HTTP server for the warehouse.
//!
//! Exposes the command surface as `POST /v1/commands` (one JSON command per
//! request, the caller taken from the `x-warehouse-caller` header) next to
//! `GET /v1/health` and `GET /v1/info`.

pub mod caller;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use caller::{Caller, CALLER_HEADER};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::HealthResponse;
pub use router::build_router;
pub use server::WarehouseServer;
