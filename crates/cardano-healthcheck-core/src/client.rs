//! Metrics endpoint client
//!
//! Fetches the Prometheus exposition of a cardano-node. A single attempt is
//! made per call; retrying is left to whoever schedules the check.

use crate::error::{HealthError, Result};
use crate::metrics::MetricTable;
use std::time::Duration;

/// Default timeout for a metrics request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of metric tables
#[async_trait::async_trait]
pub trait MetricsFetcher: Send + Sync {
    /// Fetch and parse the metrics exposed at `url`
    async fn fetch(&self, url: &str) -> Result<MetricTable>;
}

/// Fetches metrics over HTTP
#[derive(Debug, Clone)]
pub struct HttpMetricsFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpMetricsFetcher {
    /// Create new fetcher with the default timeout
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpMetricsFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MetricsFetcher for HttpMetricsFetcher {
    async fn fetch(&self, url: &str) -> Result<MetricTable> {
        tracing::debug!(url, timeout_ms = self.timeout.as_millis() as u64, "Fetching metrics");

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| HealthError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HealthError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Body timeouts surface here as well; they are still fetch failures.
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                HealthError::fetch(url, e)
            } else {
                HealthError::parse(e.to_string())
            }
        })?;

        MetricTable::from_reader(body.as_ref())
    }
}
