use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use wh_core::Warehouse;

use crate::handler;

/// Body limit used by [`build_router`].
pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Build the axum router with every warehouse endpoint.
pub fn build_router(warehouse: Warehouse) -> Router {
    build_router_with_limit(warehouse, DEFAULT_BODY_LIMIT)
}

pub fn build_router_with_limit(warehouse: Warehouse, body_limit: usize) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/commands", post(handler::command_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(warehouse)
}
