//! Epoch/slot timekeeping
//!
//! A chain counts time in slots of fixed duration, grouped into epochs of a
//! fixed number of slots, starting at the genesis instant. Slot numbers are
//! cumulative over the chain's lifetime, so all slot arithmetic is done on
//! arbitrary-precision integers.

use chrono::{DateTime, TimeDelta, Utc};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Errors raised by slot/time conversion
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// The settings themselves are unusable
    #[error("Invalid time settings: {0}")]
    InvalidSettings(String),

    /// The in-epoch slot index is not below the epoch length
    #[error("Slot {slot} is out of range for epochs of {slots_per_epoch} slots")]
    SlotOutOfEpoch {
        slot: BigUint,
        slots_per_epoch: BigUint,
    },

    /// The slot lies outside the representable datetime range
    #[error("Slot {slot_number} cannot be represented as a date")]
    Unrepresentable { slot_number: BigUint },
}

/// Timekeeping parameters of a chain, taken from its genesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSettings {
    genesis: DateTime<Utc>,
    slots_per_epoch: BigUint,
    slot_duration: Duration,
}

impl TimeSettings {
    /// Create validated settings
    ///
    /// Both the epoch length and the slot duration must be non-zero.
    pub fn new(
        genesis: DateTime<Utc>,
        slots_per_epoch: impl Into<BigUint>,
        slot_duration: Duration,
    ) -> Result<Self, TimeError> {
        let slots_per_epoch = slots_per_epoch.into();
        if slots_per_epoch.is_zero() {
            return Err(TimeError::InvalidSettings(
                "slots per epoch must be greater than zero".to_string(),
            ));
        }
        if slot_duration.is_zero() {
            return Err(TimeError::InvalidSettings(
                "slot duration must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            genesis,
            slots_per_epoch,
            slot_duration,
        })
    }

    /// Instant at which slot 0 of epoch 0 begins
    pub fn genesis(&self) -> DateTime<Utc> {
        self.genesis
    }

    pub fn slots_per_epoch(&self) -> &BigUint {
        &self.slots_per_epoch
    }

    pub fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    /// Split an absolute slot number into epoch and in-epoch slot
    pub fn position_of(&self, slot_number: &BigUint) -> SlotPosition {
        SlotPosition {
            epoch: slot_number / &self.slots_per_epoch,
            slot: slot_number % &self.slots_per_epoch,
        }
    }

    /// Absolute interval covered by the given slot position
    pub fn slot_date(&self, position: &SlotPosition) -> Result<SlotDate, TimeError> {
        if position.slot >= self.slots_per_epoch {
            return Err(TimeError::SlotOutOfEpoch {
                slot: position.slot.clone(),
                slots_per_epoch: self.slots_per_epoch.clone(),
            });
        }

        let slot_number = position.absolute_slot(&self.slots_per_epoch);
        let unrepresentable = || TimeError::Unrepresentable {
            slot_number: slot_number.clone(),
        };

        let offset = self.offset_of(&slot_number).ok_or_else(unrepresentable)?;
        let length = TimeDelta::from_std(self.slot_duration).map_err(|_| unrepresentable())?;
        let start = self
            .genesis
            .checked_add_signed(offset)
            .ok_or_else(unrepresentable)?;
        let end = start.checked_add_signed(length).ok_or_else(unrepresentable)?;

        Ok(SlotDate {
            position: position.clone(),
            start,
            end,
        })
    }

    /// Time elapsed between genesis and the start of `slot_number`
    fn offset_of(&self, slot_number: &BigUint) -> Option<TimeDelta> {
        let nanos_per_sec = BigUint::from(NANOS_PER_SEC);
        let nanos = slot_number * BigUint::from(self.slot_duration.as_nanos());

        let secs = (&nanos / &nanos_per_sec).to_i64()?;
        let subsec = (&nanos % &nanos_per_sec).to_i64()?;
        TimeDelta::try_seconds(secs)?.checked_add(&TimeDelta::nanoseconds(subsec))
    }
}

/// Epoch and in-epoch slot index
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlotPosition {
    epoch: BigUint,
    slot: BigUint,
}

impl SlotPosition {
    pub fn new(epoch: impl Into<BigUint>, slot: impl Into<BigUint>) -> Self {
        Self {
            epoch: epoch.into(),
            slot: slot.into(),
        }
    }

    pub fn epoch(&self) -> &BigUint {
        &self.epoch
    }

    pub fn slot(&self) -> &BigUint {
        &self.slot
    }

    /// Recombine into an absolute slot number
    pub fn absolute_slot(&self, slots_per_epoch: &BigUint) -> BigUint {
        &self.epoch * slots_per_epoch + &self.slot
    }
}

impl fmt::Display for SlotPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch {} slot {}", self.epoch, self.slot)
    }
}

/// A slot position and the wall-clock interval `[start, end)` it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDate {
    position: SlotPosition,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SlotDate {
    pub fn position(&self) -> &SlotPosition {
        &self.position
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Instant at which the slot has fully elapsed
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 9, 23, 21, 44, 51).unwrap()
    }

    fn settings(slots_per_epoch: u64, slot_duration: Duration) -> TimeSettings {
        TimeSettings::new(t0(), slots_per_epoch, slot_duration).unwrap()
    }

    #[test]
    fn test_settings_validation() {
        let err = TimeSettings::new(t0(), 0u64, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, TimeError::InvalidSettings(_)));

        let err = TimeSettings::new(t0(), 100u64, Duration::ZERO).unwrap_err();
        assert!(matches!(err, TimeError::InvalidSettings(_)));
    }

    #[test]
    fn test_slot_250_of_100_slot_epochs() {
        let settings = settings(100, Duration::from_secs(1));
        let position = settings.position_of(&BigUint::from(250u32));

        assert_eq!(position, SlotPosition::new(2u32, 50u32));

        let date = settings.slot_date(&position).unwrap();
        assert_eq!(date.start(), t0() + TimeDelta::seconds(250));
        assert_eq!(date.end(), t0() + TimeDelta::seconds(251));
    }

    #[test]
    fn test_genesis_slot() {
        let settings = settings(432_000, Duration::from_secs(1));
        let date = settings
            .slot_date(&settings.position_of(&BigUint::zero()))
            .unwrap();
        assert_eq!(date.start(), t0());
        assert_eq!(date.end(), t0() + TimeDelta::seconds(1));
    }

    #[test]
    fn test_sub_second_slots() {
        let settings = settings(21_600, Duration::from_millis(200));
        let position = settings.position_of(&BigUint::from(21_605u32));
        assert_eq!(position, SlotPosition::new(1u32, 5u32));

        let date = settings.slot_date(&position).unwrap();
        assert_eq!(date.start(), t0() + TimeDelta::milliseconds(4_321_000));
        assert_eq!(date.end(), t0() + TimeDelta::milliseconds(4_321_200));
    }

    #[test]
    fn test_slot_out_of_epoch_rejected() {
        let settings = settings(100, Duration::from_secs(1));
        let err = settings
            .slot_date(&SlotPosition::new(1u32, 100u32))
            .unwrap_err();
        assert!(matches!(err, TimeError::SlotOutOfEpoch { .. }));
    }

    #[test]
    fn test_huge_slot_unrepresentable() {
        let settings = settings(432_000, Duration::from_secs(20));
        let slot_number = BigUint::from(u128::MAX);
        let err = settings
            .slot_date(&settings.position_of(&slot_number))
            .unwrap_err();
        assert_eq!(err, TimeError::Unrepresentable { slot_number });
    }

    #[test]
    fn test_position_display() {
        assert_eq!(SlotPosition::new(208u32, 1234u32).to_string(), "epoch 208 slot 1234");
    }

    /// Arbitrary-width values built from base-2^32 digits
    fn wide_uint(digits: std::ops::Range<usize>) -> impl Strategy<Value = BigUint> {
        prop::collection::vec(any::<u32>(), digits).prop_map(BigUint::new)
    }

    proptest! {
        #[test]
        fn prop_position_round_trip_wide(
            slot_number in wide_uint(5..12),
            slots_per_epoch in wide_uint(1..8).prop_map(|n| n + 1u32),
        ) {
            let settings = TimeSettings::new(t0(), slots_per_epoch, Duration::from_secs(1)).unwrap();
            let position = settings.position_of(&slot_number);

            prop_assert!(position.slot() < settings.slots_per_epoch());
            prop_assert_eq!(position.absolute_slot(settings.slots_per_epoch()), slot_number);
        }

        #[test]
        fn prop_position_round_trip(slot_number in any::<u128>(), slots_per_epoch in 1u64..=u64::MAX) {
            let settings = settings(slots_per_epoch, Duration::from_secs(1));
            let slot_number = BigUint::from(slot_number);
            let position = settings.position_of(&slot_number);

            prop_assert!(position.slot() < settings.slots_per_epoch());
            prop_assert_eq!(position.absolute_slot(settings.slots_per_epoch()), slot_number);
        }

        #[test]
        fn prop_slot_end_monotonic(
            a in 0u64..10_000_000_000,
            b in 0u64..10_000_000_000,
            slots_per_epoch in 1u64..1_000_000,
            slot_millis in 1u64..60_000,
        ) {
            let settings = settings(slots_per_epoch, Duration::from_millis(slot_millis));
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

            let end_of = |n: u64| {
                settings
                    .slot_date(&settings.position_of(&BigUint::from(n)))
                    .map(|d| d.end())
            };

            prop_assert!(end_of(lo).unwrap() <= end_of(hi).unwrap());
        }
    }
}
