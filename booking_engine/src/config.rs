// booking_engine/src/config.rs
//! Engine configuration loaded from YAML, with defaults that match the
//! demo deployment.

use std::path::Path;
use std::time::Duration;

use log::{error, warn};
use serde::{Deserialize, Serialize};
use serde_yaml2 as serde_yaml;

use models::errors::{BookingError, BookingResult};

/// Pacing and patience of the settlement pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Simulated duration of one settlement stage, in milliseconds.
    pub stage_delay_ms: u64,
    /// How long a stage may run before the pipeline reports it stalled.
    pub stage_timeout_ms: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        SettlementConfig {
            stage_delay_ms: 900,
            stage_timeout_ms: 5_000,
        }
    }
}

impl SettlementConfig {
    pub fn stage_delay(&self) -> Duration {
        Duration::from_millis(self.stage_delay_ms)
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed the three demo providers when the checkpoint store is empty.
    pub seed_demo_providers: bool,
    /// Prefix for every checkpoint key this engine writes.
    pub checkpoint_namespace: String,
    pub settlement: SettlementConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            seed_demo_providers: true,
            checkpoint_namespace: "medic_connect".to_string(),
            settlement: SettlementConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(content: &str) -> BookingResult<Self> {
        serde_yaml::from_str(content).map_err(|e| {
            error!("Failed to deserialize engine YAML config: {}", e);
            BookingError::ConfigurationError(format!("invalid engine YAML config: {}", e))
        })
    }

    /// Loads the config file, falling back to defaults when it is absent.
    pub fn load(path: &Path) -> BookingResult<Self> {
        if !path.exists() {
            warn!("Engine config file not found at {:?}. Using defaults.", path);
            return Ok(EngineConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| BookingError::Io(format!("IO error: {}", e)))?;
        Self::from_yaml_str(&content)
    }
}
