//! Health evaluation
//!
//! Turns the scraped slot number into the end time of that slot and compares
//! it against the present moment. The node is healthy while the most recent
//! block's slot closed no longer than the staleness threshold ago.

use crate::error::{HealthError, Result};
use crate::metrics::{MetricTable, SLOT_NUMBER_METRIC};
use crate::time::{SlotDate, SlotPosition, TimeError, TimeSettings};
use chrono::{DateTime, TimeDelta, Utc};
use num_bigint::BigUint;
use std::fmt;
use std::time::Duration;

/// Outcome of a completed health evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Healthy,
    Unhealthy,
}

impl Verdict {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Verdict::Healthy)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Healthy => write!(f, "healthy"),
            Verdict::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// A verdict together with the evidence it was reached on
#[derive(Debug, Clone)]
pub struct Assessment {
    pub verdict: Verdict,
    pub slot_number: BigUint,
    pub slot_date: SlotDate,
    /// Time between the end of the slot and the moment of comparison.
    /// Negative when the local clock is behind the chain.
    pub lag: TimeDelta,
    pub max_staleness: Duration,
}

impl Assessment {
    pub fn is_healthy(&self) -> bool {
        self.verdict.is_healthy()
    }
}

/// Evaluate the metrics against the wall clock at the moment of comparison
pub fn evaluate(
    max_staleness: Duration,
    metrics: &MetricTable,
    settings: &TimeSettings,
) -> Result<Assessment> {
    evaluate_at(max_staleness, metrics, settings, Utc::now())
}

/// Evaluate the metrics against an explicit `now`
pub fn evaluate_at(
    max_staleness: Duration,
    metrics: &MetricTable,
    settings: &TimeSettings,
    now: DateTime<Utc>,
) -> Result<Assessment> {
    let slot_number = slot_number(metrics)?;
    let slot_date = slot_date(&slot_number, settings)?;
    Ok(assess(max_staleness, slot_number, slot_date, now))
}

/// Extract the slot number of the most recently received block
pub fn slot_number(metrics: &MetricTable) -> Result<BigUint> {
    let raw = metrics
        .get(SLOT_NUMBER_METRIC)
        .ok_or_else(|| HealthError::metric_not_found(SLOT_NUMBER_METRIC))?;

    // BigUint's parser tolerates '+' and '_'; only plain digits are accepted here.
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HealthError::malformed(SLOT_NUMBER_METRIC, raw));
    }

    BigUint::parse_bytes(raw.as_bytes(), 10)
        .ok_or_else(|| HealthError::malformed(SLOT_NUMBER_METRIC, raw))
}

fn slot_date(slot_number: &BigUint, settings: &TimeSettings) -> Result<SlotDate> {
    date_of(&settings.position_of(slot_number), slot_number, settings)
}

fn date_of(
    position: &SlotPosition,
    slot_number: &BigUint,
    settings: &TimeSettings,
) -> Result<SlotDate> {
    if position.absolute_slot(settings.slots_per_epoch()) != *slot_number {
        return Err(HealthError::InvariantViolation(format!(
            "{} does not recombine to slot {}",
            position, slot_number
        )));
    }

    match settings.slot_date(position) {
        Ok(date) => Ok(date),
        Err(e @ TimeError::Unrepresentable { .. }) => {
            tracing::debug!(error = %e, "Slot number outside the chain's time range");
            Err(HealthError::malformed(
                SLOT_NUMBER_METRIC,
                slot_number.to_string(),
            ))
        }
        Err(e) => Err(HealthError::InvariantViolation(e.to_string())),
    }
}

fn assess(
    max_staleness: Duration,
    slot_number: BigUint,
    slot_date: SlotDate,
    now: DateTime<Utc>,
) -> Assessment {
    let lag = now.signed_duration_since(slot_date.end());
    // A threshold beyond TimeDelta's range tolerates any lag.
    let healthy = match TimeDelta::from_std(max_staleness) {
        Ok(threshold) => lag <= threshold,
        Err(_) => true,
    };

    let verdict = if healthy {
        Verdict::Healthy
    } else {
        Verdict::Unhealthy
    };

    tracing::debug!(
        slot_number = %slot_number,
        position = %slot_date.position(),
        slot_end = %slot_date.end(),
        lag_ms = lag.num_milliseconds(),
        verdict = %verdict,
        "Evaluated slot staleness"
    );

    Assessment {
        verdict,
        slot_number,
        slot_date,
        lag,
        max_staleness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 7, 29, 21, 44, 51).unwrap()
    }

    fn settings() -> TimeSettings {
        TimeSettings::new(t0(), 100u64, Duration::from_secs(1)).unwrap()
    }

    fn table(body: &str) -> MetricTable {
        body.parse().unwrap()
    }

    #[test]
    fn test_healthy_within_threshold() {
        let metrics = table("cardano_node_metrics_slotNum_int 250\n");
        let now = t0() + TimeDelta::seconds(251 + 60);

        let assessment =
            evaluate_at(Duration::from_secs(60), &metrics, &settings(), now).unwrap();

        assert_eq!(assessment.verdict, Verdict::Healthy);
        assert_eq!(assessment.slot_number, BigUint::from(250u32));
        assert_eq!(
            *assessment.slot_date.position(),
            SlotPosition::new(2u32, 50u32)
        );
        assert_eq!(assessment.slot_date.end(), t0() + TimeDelta::seconds(251));
        assert_eq!(assessment.lag, TimeDelta::seconds(60));
    }

    #[test]
    fn test_unhealthy_beyond_threshold() {
        let metrics = table("cardano_node_metrics_slotNum_int 250\n");
        let now = t0() + TimeDelta::seconds(251 + 61);

        let assessment =
            evaluate_at(Duration::from_secs(60), &metrics, &settings(), now).unwrap();

        assert_eq!(assessment.verdict, Verdict::Unhealthy);
        assert!(!assessment.is_healthy());
    }

    #[test]
    fn test_comparison_uses_slot_end() {
        let metrics = table("cardano_node_metrics_slotNum_int 250\n");
        // The slot has started but not yet closed.
        let now = t0() + TimeDelta::seconds(250);

        let assessment = evaluate_at(Duration::ZERO, &metrics, &settings(), now).unwrap();

        assert_eq!(assessment.verdict, Verdict::Healthy);
        assert_eq!(assessment.lag, TimeDelta::seconds(-1));
    }

    #[test]
    fn test_future_slot_is_healthy() {
        let metrics = table("cardano_node_metrics_slotNum_int 1000000\n");
        let assessment = evaluate_at(Duration::ZERO, &metrics, &settings(), t0()).unwrap();
        assert!(assessment.is_healthy());
        assert!(assessment.lag < TimeDelta::zero());
    }

    #[test]
    fn test_wall_clock_evaluation() {
        let metrics = table("cardano_node_metrics_slotNum_int 12345\n");
        let assessment =
            evaluate(Duration::from_secs(u32::MAX as u64), &metrics, &settings()).unwrap();
        assert_eq!(assessment.verdict, Verdict::Healthy);

        let assessment = evaluate(Duration::from_secs(1), &metrics, &settings()).unwrap();
        assert_eq!(assessment.verdict, Verdict::Unhealthy);
    }

    #[test]
    fn test_huge_threshold_tolerates_any_lag() {
        let metrics = table("cardano_node_metrics_slotNum_int 0\n");
        let assessment = evaluate(Duration::MAX, &metrics, &settings()).unwrap();
        assert!(assessment.is_healthy());
    }

    #[test]
    fn test_missing_slot_metric() {
        let metrics = table("cardano_node_metrics_blockNum_int 10\n");
        let err = evaluate(Duration::from_secs(600), &metrics, &settings()).unwrap_err();
        assert!(matches!(
            err,
            HealthError::MetricNotFound { ref key } if key == SLOT_NUMBER_METRIC
        ));
    }

    #[test]
    fn test_malformed_slot_metric() {
        for raw in ["abc", "-1", "+5", "1_000", "12.5", "1e6", "0x10"] {
            let metrics = table(&format!("cardano_node_metrics_slotNum_int {}\n", raw));
            let err = evaluate(Duration::from_secs(600), &metrics, &settings()).unwrap_err();
            match err {
                HealthError::MalformedMetric { key, value } => {
                    assert_eq!(key, SLOT_NUMBER_METRIC);
                    assert_eq!(value, raw);
                }
                other => panic!("expected malformed metric for {raw}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_big_slot_number_parses() {
        let raw = "340282366920938463463374607431768211456123";
        let mut metrics = MetricTable::new();
        metrics.insert(SLOT_NUMBER_METRIC, raw);

        let n = slot_number(&metrics).unwrap();
        assert_eq!(n.to_string(), raw);
    }

    #[test]
    fn test_unrepresentable_slot_is_malformed() {
        let mut metrics = MetricTable::new();
        metrics.insert(
            SLOT_NUMBER_METRIC,
            "340282366920938463463374607431768211456123",
        );
        let err = evaluate(Duration::from_secs(600), &metrics, &settings()).unwrap_err();
        assert!(matches!(err, HealthError::MalformedMetric { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_inconsistent_position_is_invariant_violation() {
        let slot_number = BigUint::from(250u32);

        // Recombines to 250 but places the slot outside its epoch.
        let err = date_of(&SlotPosition::new(1u32, 150u32), &slot_number, &settings())
            .unwrap_err();
        assert!(matches!(err, HealthError::InvariantViolation(_)));
        assert!(err.is_fatal());

        let err = date_of(&SlotPosition::new(3u32, 0u32), &slot_number, &settings())
            .unwrap_err();
        assert!(matches!(err, HealthError::InvariantViolation(_)));
        assert!(err.to_string().contains("epoch 3 slot 0"));
    }
}
