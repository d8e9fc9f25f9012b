//! Prometheus exposition parsing
//!
//! The cardano-node endpoint emits one `name value` pair per line. Only those
//! pairs are kept; annotation lines, comments, blank lines and samples that
//! carry a timestamp are skipped.

use crate::error::{HealthError, Result};
use std::collections::HashMap;
use std::io::BufRead;
use std::str::FromStr;

/// Metric carrying the slot number of the most recently received block
pub const SLOT_NUMBER_METRIC: &str = "cardano_node_metrics_slotNum_int";

/// Metric name to raw value, as scraped from the endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricTable {
    entries: HashMap<String, String>,
}

impl MetricTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a line-oriented exposition stream
    ///
    /// Read failures on the stream are returned as [`HealthError::Parse`].
    /// Lines that are not valid UTF-8 or not exactly two whitespace-separated
    /// tokens are ignored, and a later duplicate key replaces an earlier one.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = Self::new();
        let mut skipped = 0usize;

        for line in reader.split(b'\n') {
            let line = line.map_err(|e| HealthError::parse(e.to_string()))?;
            match std::str::from_utf8(&line).ok().and_then(parse_line) {
                Some((name, value)) => table.insert(name, value),
                None => skipped += 1,
            }
        }

        tracing::debug!(
            metrics = table.len(),
            skipped,
            "Parsed Prometheus exposition"
        );
        Ok(table)
    }

    /// Insert a metric, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Raw value of a metric
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Number of metrics in the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no metrics
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromStr for MetricTable {
    type Err = HealthError;

    fn from_str(body: &str) -> Result<Self> {
        Self::from_reader(body.as_bytes())
    }
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start();
    if line.starts_with('#') {
        return None;
    }

    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(name), Some(value), None) => Some((name, value)),
        _ => None,
    }
}
