use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wh_core::{Command, Reply, Stats, Warehouse};

use crate::caller::Caller;
use crate::error::ServerResult;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Info handler: build metadata plus the warehouse counters.
pub async fn info_handler(State(warehouse): State<Warehouse>) -> ServerResult<Json<Value>> {
    let stats: Stats = warehouse.stats()?;
    Ok(Json(json!({
        "name": "wh-server",
        "version": env!("CARGO_PKG_VERSION"),
        "stats": stats,
    })))
}

/// Decode a command and run it on behalf of the caller.
pub async fn command_handler(
    State(warehouse): State<Warehouse>,
    caller: Caller,
    Json(body): Json<Value>,
) -> ServerResult<Json<Reply>> {
    let command = Command::from_value(body)?;
    tracing::debug!(command = command.name(), %caller, "command received");
    let reply = warehouse.dispatch(caller.as_deref(), command).await?;
    Ok(Json(reply))
}
