use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wh_types::BranchId;

use crate::error::{Result, WarehouseError};

/// Tunables of a [`crate::Warehouse`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Coalescing window of the per-feed change pass.
    pub change_window_ms: u64,
    /// Coalescing window of the release announcement.
    pub release_window_ms: u64,
    /// Maximum number of branches per release event.
    pub release_batch_size: usize,
    /// Delete released branches from storage when the announcement is
    /// flushed, if they are still unreferenced and their generation still
    /// matches. When `false`, storage is only freed by `acknowledge`.
    pub auto_acknowledge: bool,
    /// Id prefixes purged from storage as soon as they are collected.
    pub auto_release_prefixes: Vec<String>,
    /// Namespace accepted as an attach parent without being in the feed.
    pub cache_namespace: String,
    /// Capacity of each event subscriber's channel.
    pub event_capacity: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            change_window_ms: 150,
            release_window_ms: 50,
            release_batch_size: 50,
            auto_acknowledge: true,
            auto_release_prefixes: vec!["goblin-orc@".to_string()],
            cache_namespace: "goblin-cache".to_string(),
            event_capacity: 1024,
        }
    }
}

impl WarehouseConfig {
    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| WarehouseError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| WarehouseError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Change window as a [`Duration`].
    pub fn change_window(&self) -> Duration {
        Duration::from_millis(self.change_window_ms)
    }

    /// Release window as a [`Duration`].
    pub fn release_window(&self) -> Duration {
        Duration::from_millis(self.release_window_ms)
    }

    /// Returns `true` if the branch is purged as soon as it is collected.
    pub fn is_auto_release(&self, branch: &BranchId) -> bool {
        self.auto_release_prefixes
            .iter()
            .any(|prefix| branch.has_prefix(prefix))
    }

    /// Returns `true` if the branch may anchor an attach without being in
    /// the feed: singletons and the cache namespace.
    pub fn is_anchor(&self, branch: &BranchId) -> bool {
        branch.is_singleton() || branch.is_of_type(&self.cache_namespace)
    }
}
