use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::UserProfile;

/// Minimum overrun grace, in seconds
pub const MIN_OVERRUN_SECONDS: f64 = 45.0;

/// Overrun grace as a fraction of the available work time
pub const OVERRUN_FRACTION: f64 = 0.05;

/// Warmup and cooldown minutes for a session of the given length
pub fn session_overhead_minutes(duration_minutes: u32) -> (u32, u32) {
    match duration_minutes {
        0..=15 => (2, 1),
        16..=30 => (4, 3),
        31..=45 => (5, 4),
        46..=60 => (7, 5),
        61..=90 => (10, 7),
        _ => (12, 8),
    }
}

/// Safety margin reserved for the unexpected (equipment waits, water breaks)
pub fn buffer_seconds(duration_minutes: u32) -> f64 {
    match duration_minutes {
        0..=15 => 30.0,
        16..=30 => 60.0,
        31..=45 => 90.0,
        46..=60 => 120.0,
        61..=90 => 180.0,
        _ => 240.0,
    }
}

/// Time envelope of a single planning run with admission-controlled consumption.
///
/// `consumed_work_seconds` only ever grows and never exceeds
/// `max_work_seconds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTimeBudget {
    pub duration_minutes: u32,
    pub warmup_seconds: f64,
    pub cooldown_seconds: f64,
    pub buffer_seconds: f64,
    pub available_work_seconds: f64,
    pub max_work_seconds: f64,
    consumed_work_seconds: f64,
}

impl SessionTimeBudget {
    pub fn new(duration_minutes: u32, warmup_enabled: bool, cooldown_enabled: bool) -> Self {
        let (warmup_minutes, cooldown_minutes) = session_overhead_minutes(duration_minutes);
        let warmup_seconds = if warmup_enabled { warmup_minutes as f64 * 60.0 } else { 0.0 };
        let cooldown_seconds = if cooldown_enabled { cooldown_minutes as f64 * 60.0 } else { 0.0 };
        let buffer_seconds = buffer_seconds(duration_minutes);

        let total_seconds = duration_minutes as f64 * 60.0;
        let available_work_seconds =
            (total_seconds - warmup_seconds - cooldown_seconds - buffer_seconds).max(0.0);
        let overrun = (available_work_seconds * OVERRUN_FRACTION).max(MIN_OVERRUN_SECONDS);

        SessionTimeBudget {
            duration_minutes,
            warmup_seconds,
            cooldown_seconds,
            buffer_seconds,
            available_work_seconds,
            max_work_seconds: available_work_seconds + overrun,
            consumed_work_seconds: 0.0,
        }
    }

    /// Budget honouring the profile's warmup/cooldown preferences
    pub fn for_profile(duration_minutes: u32, profile: &UserProfile) -> Self {
        Self::new(duration_minutes, profile.warmup_enabled, profile.cooldown_enabled)
    }

    pub fn consumed_work_seconds(&self) -> f64 {
        self.consumed_work_seconds
    }

    pub fn remaining_seconds(&self) -> f64 {
        (self.max_work_seconds - self.consumed_work_seconds).max(0.0)
    }

    /// Grace band above the available work time
    pub fn overrun_allowance(&self) -> f64 {
        self.max_work_seconds - self.available_work_seconds
    }

    /// Whether anything at all can be scheduled
    pub fn has_work_time(&self) -> bool {
        self.available_work_seconds > 0.0
    }

    /// Admit `seconds` of work if the new total stays within
    /// `max_work_seconds`. State is untouched on refusal.
    pub fn try_consume(&mut self, seconds: f64) -> bool {
        if !seconds.is_finite() || seconds < 0.0 || !self.has_work_time() {
            return false;
        }

        let next = self.consumed_work_seconds + seconds;
        if next <= self.max_work_seconds {
            self.consumed_work_seconds = next;
            true
        } else {
            debug!(
                requested = seconds,
                consumed = self.consumed_work_seconds,
                max = self.max_work_seconds,
                "Refused work time"
            );
            false
        }
    }

    /// Fraction of the available work time consumed so far
    pub fn utilization(&self) -> f64 {
        if self.available_work_seconds > 0.0 {
            self.consumed_work_seconds / self.available_work_seconds
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_thirty_minute_envelope() {
        let budget = SessionTimeBudget::new(30, true, true);
        assert_eq!(budget.warmup_seconds, 240.0);
        assert_eq!(budget.cooldown_seconds, 180.0);
        assert_eq!(budget.buffer_seconds, 60.0);
        assert_eq!(budget.available_work_seconds, 1320.0);
        assert!((budget.overrun_allowance() - 66.0).abs() < 1e-9);
        assert!((budget.max_work_seconds - 1386.0).abs() < 1e-9);
    }

    #[test]
    fn test_minimum_overrun_applies_to_short_sessions() {
        let budget = SessionTimeBudget::new(15, true, true);
        // 900 - 120 - 60 - 30 = 690, 5% = 34.5 < 45
        assert_eq!(budget.available_work_seconds, 690.0);
        assert_eq!(budget.max_work_seconds, 735.0);
    }

    #[test]
    fn test_disabled_preferences_zero_overhead() {
        let profile = UserProfile {
            warmup_enabled: false,
            cooldown_enabled: false,
            ..UserProfile::default()
        };
        let budget = SessionTimeBudget::for_profile(60, &profile);
        assert_eq!(budget.warmup_seconds, 0.0);
        assert_eq!(budget.cooldown_seconds, 0.0);
        assert_eq!(budget.available_work_seconds, 3600.0 - 120.0);
    }

    #[test]
    fn test_zero_duration_has_no_work_time() {
        let mut budget = SessionTimeBudget::new(0, true, true);
        assert_eq!(budget.available_work_seconds, 0.0);
        assert!(!budget.has_work_time());
        assert!(!budget.try_consume(10.0));
        assert_eq!(budget.consumed_work_seconds(), 0.0);
    }

    #[test]
    fn test_refusal_leaves_state_unchanged() {
        let mut budget = SessionTimeBudget::new(30, true, true);
        assert!(budget.try_consume(1000.0));
        assert!(!budget.try_consume(500.0));
        assert_eq!(budget.consumed_work_seconds(), 1000.0);
        assert!(budget.try_consume(386.0));
        assert_eq!(budget.remaining_seconds(), 0.0);
        assert!(!budget.try_consume(f64::NAN));
    }

    proptest! {
        #[test]
        fn test_consumption_never_exceeds_max(
            duration in 0u32..180,
            requests in proptest::collection::vec(0.0f64..900.0, 0..40)
        ) {
            let mut budget = SessionTimeBudget::new(duration, true, true);
            let mut previous = 0.0;
            for seconds in requests {
                budget.try_consume(seconds);
                prop_assert!(budget.consumed_work_seconds() <= budget.max_work_seconds);
                prop_assert!(budget.consumed_work_seconds() >= previous);
                previous = budget.consumed_work_seconds();
            }
        }
    }
}
