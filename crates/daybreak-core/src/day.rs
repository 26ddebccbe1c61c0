//! Day-boundary calculation.
//!
//! The app-day rolls over at a configurable reset hour (03:00 by default),
//! not at midnight: a submission at 02:30 still counts toward the previous
//! calendar date. Both types here are pure values with no failure modes.

use chrono::{Days, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical calendar-day identifier (`YYYY-MM-DD`).
///
/// Produced by [`DayBoundary::app_day`]; may differ from the wall-clock
/// calendar date near the reset hour. Ordered, so submissions can be
/// compared and iterated in day order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AppDay(NaiveDate);

impl AppDay {
    /// Wrap a calendar date as an app-day.
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build from year/month/day, `None` if out of range.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// The underlying calendar date.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The app-day immediately after this one.
    pub fn next(&self) -> Self {
        Self(self.0.checked_add_days(Days::new(1)).unwrap_or(self.0))
    }

    /// Whether `self` is exactly one app-day after `prev`.
    pub fn is_day_after(&self, prev: AppDay) -> bool {
        prev.next() == *self
    }
}

impl fmt::Display for AppDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for AppDay {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Self)
    }
}

/// Maps wall-clock time to the canonical app-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBoundary {
    reset_hour: u32,
}

impl DayBoundary {
    /// Daily reset hour used when none is configured.
    pub const DEFAULT_RESET_HOUR: u32 = 3;

    /// Create a boundary that rolls over at `reset_hour` (clamped to 0..=23).
    pub fn new(reset_hour: u32) -> Self {
        Self {
            reset_hour: reset_hour.min(23),
        }
    }

    /// The configured reset hour.
    pub fn reset_hour(&self) -> u32 {
        self.reset_hour
    }

    /// Compute the app-day for a wall-clock instant.
    ///
    /// Before the reset hour the app-day is the previous calendar date.
    pub fn app_day(&self, now: NaiveDateTime) -> AppDay {
        let date = if now.hour() < self.reset_hour {
            now.date()
                .checked_sub_days(Days::new(1))
                .unwrap_or_else(|| now.date())
        } else {
            now.date()
        };
        AppDay::new(date)
    }
}

impl Default for DayBoundary {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RESET_HOUR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(y: i32, m: u32, d: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    #[test]
    fn test_before_reset_hour_credits_previous_day() {
        let boundary = DayBoundary::new(3);
        // 02:30 on March 5 belongs to March 4
        let day = boundary.app_day(at(2026, 3, 5, 2, 30));
        assert_eq!(day, AppDay::from_ymd(2026, 3, 4).unwrap());
    }

    #[test]
    fn test_at_reset_hour_is_current_day() {
        let boundary = DayBoundary::new(3);
        let day = boundary.app_day(at(2026, 3, 5, 3, 0));
        assert_eq!(day, AppDay::from_ymd(2026, 3, 5).unwrap());
    }

    #[test]
    fn test_advances_across_reset_hour() {
        let boundary = DayBoundary::new(3);
        let before = boundary.app_day(at(2026, 3, 5, 2, 59));
        let after = boundary.app_day(at(2026, 3, 5, 3, 0));
        assert!(after.is_day_after(before));
    }

    #[test]
    fn test_midnight_rollover_with_zero_reset_hour() {
        let boundary = DayBoundary::new(0);
        let day = boundary.app_day(at(2026, 3, 5, 0, 0));
        assert_eq!(day, AppDay::from_ymd(2026, 3, 5).unwrap());
    }

    #[test]
    fn test_app_day_display_roundtrip() {
        let day = AppDay::from_ymd(2026, 3, 4).unwrap();
        assert_eq!(day.to_string(), "2026-03-04");
        assert_eq!("2026-03-04".parse::<AppDay>().unwrap(), day);
    }

    #[test]
    fn test_serde_uses_date_string() {
        let day = AppDay::from_ymd(2026, 3, 4).unwrap();
        let json = serde_json::to_string(&day).unwrap();
        assert_eq!(json, "\"2026-03-04\"");
        let back: AppDay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, day);
    }

    proptest! {
        #[test]
        fn prop_app_day_is_stable(secs in 0i64..4_102_444_800) {
            let now = chrono::DateTime::from_timestamp(secs, 0).unwrap().naive_utc();
            let boundary = DayBoundary::default();
            prop_assert_eq!(boundary.app_day(now), boundary.app_day(now));
        }

        #[test]
        fn prop_app_day_never_ahead_of_calendar(secs in 0i64..4_102_444_800, reset in 0u32..24) {
            let now = chrono::DateTime::from_timestamp(secs, 0).unwrap().naive_utc();
            let day = DayBoundary::new(reset).app_day(now);
            prop_assert!(day.date() <= now.date());
            prop_assert!(day.next().date() >= now.date());
        }
    }
}
