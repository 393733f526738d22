//! Maintenance gate.
//!
//! While a caller holds maintenance, mutating commands from anyone else are
//! rejected with the description the holder supplied.

use serde::Serialize;
use tracing::info;

use crate::error::{Result, WarehouseError};

/// Description used when the holder gives none.
pub const DEFAULT_DESCRIPTION: &str = "warehouse is under maintenance";

/// The active maintenance lease.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Maintenance {
    pub holder: String,
    pub description: String,
}

#[derive(Debug, Default)]
pub struct MaintenanceGate {
    active: Option<Maintenance>,
}

impl MaintenanceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active lease, if any.
    pub fn active(&self) -> Option<&Maintenance> {
        self.active.as_ref()
    }

    /// Take maintenance. Re-enabling by the same holder updates the
    /// description; another holder is refused.
    pub fn enable(&mut self, holder: &str, description: Option<&str>) -> Result<()> {
        if let Some(active) = &self.active {
            if active.holder != holder {
                return Err(WarehouseError::NotMaintainer {
                    holder: active.holder.clone(),
                });
            }
        }
        let description = description.unwrap_or(DEFAULT_DESCRIPTION).to_string();
        info!(holder, %description, "maintenance enabled");
        self.active = Some(Maintenance {
            holder: holder.to_string(),
            description,
        });
        Ok(())
    }

    /// Lift maintenance. Only the holder may lift it; lifting an inactive
    /// gate is a no-op.
    pub fn disable(&mut self, holder: &str) -> Result<()> {
        match &self.active {
            None => Ok(()),
            Some(active) if active.holder == holder => {
                info!(holder, "maintenance disabled");
                self.active = None;
                Ok(())
            }
            Some(active) => Err(WarehouseError::NotMaintainer {
                holder: active.holder.clone(),
            }),
        }
    }

    /// Admit or reject a mutating call from `caller`.
    pub fn admit(&self, caller: Option<&str>) -> Result<()> {
        match &self.active {
            Some(active) if caller != Some(active.holder.as_str()) => {
                Err(WarehouseError::MaintenanceLockout {
                    description: active.description.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}
