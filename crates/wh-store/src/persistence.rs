//! Snapshot persistence for the warehouse state.
//!
//! The warehouse itself is in-memory; a [`StatePersistence`] backend lets a
//! host save the state on shutdown and restore it on start.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::state::WarehouseState;

/// Storage backend for state snapshots.
#[async_trait]
pub trait StatePersistence: Send + Sync {
    /// Load the last saved snapshot, if any.
    async fn load(&self) -> StoreResult<Option<WarehouseState>>;

    /// Save a snapshot, replacing the previous one.
    async fn save(&self, state: &WarehouseState) -> StoreResult<()>;
}

/// Keeps the last snapshot in memory. Used by tests and embedders.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    snapshot: RwLock<Option<WarehouseState>>,
}

impl InMemoryPersistence {
    /// Create a backend with no snapshot.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatePersistence for InMemoryPersistence {
    async fn load(&self) -> StoreResult<Option<WarehouseState>> {
        let snapshot = self
            .snapshot
            .read()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        Ok(snapshot.clone())
    }

    async fn save(&self, state: &WarehouseState) -> StoreResult<()> {
        let mut snapshot = self
            .snapshot
            .write()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        *snapshot = Some(state.clone());
        Ok(())
    }
}

/// Writes snapshots as pretty-printed JSON to a single file.
///
/// Saves go through a sibling temporary file renamed over the target, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Clone, Debug)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    /// Persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

#[async_trait]
impl StatePersistence for JsonFilePersistence {
    async fn load(&self) -> StoreResult<Option<WarehouseState>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot to load");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let state: WarehouseState = serde_json::from_slice(&bytes)?;
        info!(
            path = %self.path.display(),
            branches = state.store.len(),
            feeds = state.subscriptions.len(),
            "loaded snapshot"
        );
        Ok(Some(state))
    }

    async fn save(&self, state: &WarehouseState) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(state)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let staging = self.staging_path();
        tokio::fs::write(&staging, &json).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        debug!(path = %self.path.display(), bytes = json.len(), "saved snapshot");
        Ok(())
    }
}
