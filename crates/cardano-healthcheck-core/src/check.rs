//! Health check orchestration
//!
//! One check is one sequential pass: fetch the endpoint, parse the body,
//! evaluate the slot. Nothing is cached between checks.

use crate::client::{HttpMetricsFetcher, MetricsFetcher, DEFAULT_TIMEOUT};
use crate::config;
use crate::engine::{self, Assessment};
use crate::error::Result;
use crate::time::TimeSettings;
use std::path::Path;
use std::time::Duration;

/// Default staleness threshold for the most recent block
pub const DEFAULT_MAX_TIME_SINCE_LAST_BLOCK: Duration = Duration::from_secs(10 * 60);

/// Everything needed to check one cardano-node instance
#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub prometheus_url: String,
    pub time_settings: TimeSettings,
    pub max_time_since_last_block: Duration,
    pub timeout: Duration,
    /// Accepted but not evaluated yet.
    pub min_peer_connections: Option<u32>,
}

impl HealthConfig {
    pub fn new(prometheus_url: impl Into<String>, time_settings: TimeSettings) -> Self {
        Self {
            prometheus_url: prometheus_url.into(),
            time_settings,
            max_time_since_last_block: DEFAULT_MAX_TIME_SINCE_LAST_BLOCK,
            timeout: DEFAULT_TIMEOUT,
            min_peer_connections: None,
        }
    }

    /// Build a config from the node configuration and genesis files
    pub fn from_files(
        config_file: impl AsRef<Path>,
        genesis_file: impl AsRef<Path>,
    ) -> Result<Self> {
        let time_settings = config::load_time_settings(genesis_file)?;
        let prometheus_url = config::load_prometheus_url(config_file)?;
        Ok(Self::new(prometheus_url, time_settings))
    }

    pub fn with_max_time_since_last_block(mut self, max: Duration) -> Self {
        self.max_time_since_last_block = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_min_peer_connections(mut self, min: u32) -> Self {
        self.min_peer_connections = Some(min);
        self
    }
}

/// Check the node over HTTP
pub async fn check(config: &HealthConfig) -> Result<Assessment> {
    let fetcher = HttpMetricsFetcher::new().with_timeout(config.timeout);
    check_with(&fetcher, config).await
}

/// Check the node using the given fetcher
pub async fn check_with(fetcher: &dyn MetricsFetcher, config: &HealthConfig) -> Result<Assessment> {
    if let Some(min) = config.min_peer_connections {
        tracing::warn!(
            min_peer_connections = min,
            "Minimum peer connections is not evaluated; ignoring"
        );
    }

    let metrics = fetcher.fetch(&config.prometheus_url).await?;
    let assessment = engine::evaluate(
        config.max_time_since_last_block,
        &metrics,
        &config.time_settings,
    )?;

    tracing::info!(
        url = %config.prometheus_url,
        slot_number = %assessment.slot_number,
        position = %assessment.slot_date.position(),
        slot_end = %assessment.slot_date.end(),
        verdict = %assessment.verdict,
        "Health check completed"
    );
    Ok(assessment)
}
