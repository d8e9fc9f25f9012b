//! Node configuration sources
//!
//! Reads the two files a cardano-node is started with: the Shelley genesis,
//! which fixes the chain's timekeeping, and the node configuration, which
//! says where the Prometheus endpoint listens.

use crate::error::{HealthError, Result};
use crate::time::TimeSettings;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Fields of a Shelley genesis file that define chain time
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisFile {
    /// Instant of slot 0 of epoch 0
    pub system_start: DateTime<Utc>,
    /// Slots per epoch
    pub epoch_length: u64,
    /// Slot duration in seconds, possibly fractional
    pub slot_length: f64,
}

impl GenesisFile {
    /// Read and parse a genesis file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| config_error(path, e))?;
        serde_json::from_str(&content).map_err(|e| config_error(path, e))
    }

    /// Validated time settings described by this genesis
    pub fn time_settings(&self) -> std::result::Result<TimeSettings, String> {
        let slot_duration =
            Duration::try_from_secs_f64(self.slot_length).map_err(|e| {
                format!("invalid slotLength {}: {}", self.slot_length, e)
            })?;
        TimeSettings::new(self.system_start, self.epoch_length, slot_duration)
            .map_err(|e| e.to_string())
    }
}

/// Fields of a node configuration file used by the healthcheck
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfigFile {
    /// `[host, port]` of the Prometheus endpoint
    #[serde(rename = "hasPrometheus")]
    pub has_prometheus: Option<(String, u16)>,
}

impl NodeConfigFile {
    /// Read and parse a node configuration file, as YAML for `.yaml`/`.yml`
    /// paths and as JSON otherwise
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| config_error(path, e))?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| config_error(path, e))
        } else {
            serde_json::from_str(&content).map_err(|e| config_error(path, e))
        }
    }

    /// URL of the metrics page, if Prometheus is enabled
    pub fn prometheus_url(&self) -> Option<String> {
        self.has_prometheus
            .as_ref()
            .map(|(host, port)| format!("http://{}:{}/metrics", host, port))
    }
}

/// Load the chain time settings from a genesis file
pub fn load_time_settings(genesis_path: impl AsRef<Path>) -> Result<TimeSettings> {
    let path = genesis_path.as_ref();
    let settings = GenesisFile::load(path)?
        .time_settings()
        .map_err(|reason| config_error(path, reason))?;

    tracing::debug!(
        genesis = %settings.genesis(),
        slots_per_epoch = %settings.slots_per_epoch(),
        slot_duration_ms = settings.slot_duration().as_millis() as u64,
        "Loaded time settings"
    );
    Ok(settings)
}

/// Assemble the Prometheus endpoint URL from a node configuration file
pub fn load_prometheus_url(config_path: impl AsRef<Path>) -> Result<String> {
    let path = config_path.as_ref();
    NodeConfigFile::load(path)?
        .prometheus_url()
        .ok_or_else(|| config_error(path, "hasPrometheus is not configured"))
}

fn config_error(path: &Path, reason: impl ToString) -> HealthError {
    HealthError::config(path.display().to_string(), reason)
}
