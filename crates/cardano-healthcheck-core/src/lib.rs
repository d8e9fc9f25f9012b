//! Cardano Node Healthcheck
//!
//! Decides whether a cardano-node is healthy by reading the slot number of
//! the most recently received block from its Prometheus endpoint and checking
//! that the slot closed recently enough.
//!
//! # Flow
//! - `client`: one HTTP GET with a bounded timeout
//! - `metrics`: exposition text to a metric table
//! - `engine`: slot number to slot end time to verdict
//!
//! Chain time settings and the endpoint URL come from the node's genesis and
//! configuration files (`config`).

pub mod check;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod time;

pub use check::{check, check_with, HealthConfig, DEFAULT_MAX_TIME_SINCE_LAST_BLOCK};
pub use client::{HttpMetricsFetcher, MetricsFetcher};
pub use engine::{evaluate, evaluate_at, Assessment, Verdict};
pub use error::{HealthError, Result};
pub use metrics::{MetricTable, SLOT_NUMBER_METRIC};
pub use time::{SlotDate, SlotPosition, TimeError, TimeSettings};
