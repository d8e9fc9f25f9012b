//! Error types for the healthcheck core
//!
//! Every failure that prevents a verdict from being reached is a
//! `HealthError`. Callers decide how to report it; nothing here is retried.

use thiserror::Error;

/// Main error type for health check operations
#[derive(Error, Debug)]
pub enum HealthError {
    /// The metrics endpoint could not be reached or timed out
    #[error("Not able to reach Prometheus endpoint at '{url}': {reason}")]
    Fetch { url: String, reason: String },

    /// The metrics endpoint answered with a non-success status
    #[error("Prometheus endpoint at '{url}' reported status code '{status}'")]
    Status { url: String, status: u16 },

    /// The response body could not be read
    #[error("Error reading response from Prometheus: {0}")]
    Parse(String),

    /// A required metric is absent from the endpoint output
    #[error("Could not find metric '{key}' in the Prometheus endpoint output")]
    MetricNotFound { key: String },

    /// A metric is present but its value is not usable
    #[error("Metric '{key}' has malformed value '{value}'")]
    MalformedMetric { key: String, value: String },

    /// The chain time settings contradict the computed slot position
    #[error("Epoch/slot date does not match blockchain details: {0}")]
    InvariantViolation(String),

    /// A genesis or node configuration file could not be used
    #[error("Configuration at '{path}' cannot be parsed: {reason}")]
    Config { path: String, reason: String },
}

impl HealthError {
    /// Create a fetch error
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        HealthError::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        HealthError::Parse(msg.into())
    }

    /// Create a metric-not-found error
    pub fn metric_not_found(key: impl Into<String>) -> Self {
        HealthError::MetricNotFound { key: key.into() }
    }

    /// Create a malformed metric error
    pub fn malformed(key: impl Into<String>, value: impl Into<String>) -> Self {
        HealthError::MalformedMetric {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a configuration error
    pub fn config(path: impl Into<String>, reason: impl ToString) -> Self {
        HealthError::Config {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error signals inconsistent chain parameters rather than
    /// a problem with the node being checked
    pub fn is_fatal(&self) -> bool {
        matches!(self, HealthError::InvariantViolation(_))
    }

    /// Whether the endpoint could not be fetched at all
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, HealthError::Fetch { .. } | HealthError::Status { .. })
    }
}

/// Result type alias for health check operations
pub type Result<T> = std::result::Result<T, HealthError>;
