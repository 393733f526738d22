use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use wh_core::Warehouse;
use wh_store::JsonFilePersistence;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router_with_limit;

/// Warehouse HTTP server.
pub struct WarehouseServer {
    config: ServerConfig,
    warehouse: Warehouse,
}

impl WarehouseServer {
    /// Build the warehouse described by `config`, backed by a JSON snapshot
    /// file when `state_path` is set.
    pub fn new(config: ServerConfig) -> Self {
        let warehouse = match &config.state_path {
            Some(path) => Warehouse::with_persistence(
                config.warehouse.clone(),
                Arc::new(JsonFilePersistence::new(path)),
            ),
            None => Warehouse::new(config.warehouse.clone()),
        };
        Self { config, warehouse }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router_with_limit(self.warehouse.clone(), self.config.max_body_size)
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for ctrl-c");
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves. The saved state is restored before
    /// the first request and written back after the last one.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let persistent = self.config.state_path.is_some();
        if persistent && self.warehouse.load().await? {
            info!("warehouse state restored");
        }

        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("warehouse server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        self.warehouse.shutdown();
        if persistent {
            self.warehouse.save().await?;
        }
        info!("warehouse server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use wh_core::UpsertRequest;

    #[test]
    fn server_construction() {
        let server = WarehouseServer::new(ServerConfig::default());
        assert_eq!(server.config().bind_addr, "127.0.0.1:9420".parse::<SocketAddr>().unwrap());
        let _router = server.router();
    }

    #[tokio::test]
    async fn state_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            state_path: Some(dir.path().join("state.json")),
            ..ServerConfig::default()
        };

        let server = WarehouseServer::new(config.clone());
        server
            .warehouse()
            .upsert(UpsertRequest::new("a@1").parent("a@1").feed("f"))
            .unwrap();
        server.serve_with_shutdown(async {}).await.unwrap();

        let restarted = WarehouseServer::new(config);
        let warehouse = restarted.warehouse().clone();
        assert!(!warehouse.has("a@1").unwrap());
        restarted.serve_with_shutdown(async {}).await.unwrap();
        assert!(warehouse.has("a@1").unwrap());
    }
}
