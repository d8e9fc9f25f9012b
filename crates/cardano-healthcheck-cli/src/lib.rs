//! Command-line front end for the cardano-node healthcheck
//!
//! Loads the node's configuration and genesis files, runs a single check and
//! maps the outcome to a process exit code.
//!
//! # Exit Codes
//!
//! - 0: Node is healthy
//! - 1: Node is not healthy
//! - 2: No verdict (endpoint unreachable, unreadable or missing metrics)
//! - 3: Node configuration or genesis file unusable
//! - 10: Chain time settings are internally inconsistent

use cardano_healthcheck_core::{check, Assessment, HealthConfig, HealthError};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Cardano node healthcheck
///
/// Checks whether the most recent block seen by a cardano-node is recent
/// enough, using the node's Prometheus endpoint.
#[derive(Parser, Debug)]
#[command(name = "cardano-healthcheck")]
#[command(about = "Healthcheck for cardano-node based on the slot of the most recent block", long_about = None)]
#[command(version)]
pub struct HealthcheckCli {
    /// Path to the configuration file of cardano-node
    #[arg(long, env = "CARDANO_HEALTHCHECK_CONFIG_FILE")]
    pub config_file: PathBuf,

    /// Path to the genesis file of cardano-node
    #[arg(long, env = "CARDANO_HEALTHCHECK_GENESIS_FILE")]
    pub genesis_file: PathBuf,

    /// Threshold for the duration between now and the end of the slot of the
    /// most recently received block (e.g. "10m", "90s")
    #[arg(
        long,
        default_value = "10m",
        value_parser = humantime::parse_duration,
        env = "CARDANO_HEALTHCHECK_MAX_TIME_SINCE_LAST_BLOCK"
    )]
    pub max_time_since_last_block: Duration,

    /// Timeout for the request to the Prometheus endpoint
    #[arg(
        long,
        default_value = "5s",
        value_parser = humantime::parse_duration,
        env = "CARDANO_HEALTHCHECK_TIMEOUT"
    )]
    pub timeout: Duration,

    /// Minimum number of peer connections (accepted, not evaluated)
    #[arg(long, env = "CARDANO_HEALTHCHECK_MIN_PEER_CONNECTIONS")]
    pub min_peer_connections: Option<u32>,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value_t = LogFormat::Text,
        env = "CARDANO_HEALTHCHECK_LOG_FORMAT"
    )]
    pub log_format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Exit codes for the healthcheck process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Healthy = 0,
    Unhealthy = 1,
    /// The check could not reach a verdict
    Indeterminate = 2,
    InvalidConfig = 3,
    /// Chain time settings contradict themselves
    InvariantViolation = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    pub fn from_assessment(assessment: &Assessment) -> Self {
        if assessment.is_healthy() {
            ExitCode::Healthy
        } else {
            ExitCode::Unhealthy
        }
    }

    pub fn from_error(err: &HealthError) -> Self {
        match err {
            HealthError::InvariantViolation(_) => ExitCode::InvariantViolation,
            HealthError::Config { .. } => ExitCode::InvalidConfig,
            _ => ExitCode::Indeterminate,
        }
    }
}

/// Install the global tracing subscriber
///
/// The filter is taken from `RUST_LOG` and defaults to `info`.
pub fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }
    Ok(())
}

/// Build the health check configuration from the command line
pub fn build_config(cli: &HealthcheckCli) -> Result<HealthConfig, HealthError> {
    let config = HealthConfig::from_files(&cli.config_file, &cli.genesis_file)?
        .with_max_time_since_last_block(cli.max_time_since_last_block)
        .with_timeout(cli.timeout);

    Ok(match cli.min_peer_connections {
        Some(min) => config.with_min_peer_connections(min),
        None => config,
    })
}

/// Run one health check and return the exit code
pub async fn run(cli: HealthcheckCli) -> ExitCode {
    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid healthcheck configuration");
            return ExitCode::from_error(&e);
        }
    };

    match check(&config).await {
        Ok(assessment) => {
            if assessment.is_healthy() {
                tracing::info!("Node is healthy");
            } else {
                tracing::info!(
                    lag_secs = assessment.lag.num_seconds(),
                    max_secs = assessment.max_staleness.as_secs(),
                    "Node isn't healthy"
                );
            }
            ExitCode::from_assessment(&assessment)
        }
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "Chain time settings are inconsistent");
            ExitCode::from_error(&e)
        }
        Err(e) if e.is_fetch_error() => {
            tracing::error!(error = %e, "Prometheus endpoint unavailable");
            ExitCode::from_error(&e)
        }
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            ExitCode::from_error(&e)
        }
    }
}
