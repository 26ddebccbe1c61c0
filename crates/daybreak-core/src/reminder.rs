//! Daily reminder instruction for the notification scheduler.
//!
//! The engine only computes the instruction; scheduling is the downstream
//! collaborator's job.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Repeat cadence understood by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    Daily,
}

/// `{fire_at, repeat}` instruction, in local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReminderPlan {
    pub fire_at: NaiveDateTime,
    pub repeat: Repeat,
}

impl ReminderPlan {
    /// Reminder fires this long after the configured wake time.
    pub const WAKE_OFFSET_MINUTES: i64 = 90;

    /// Plan the next reminder after `wake`, relative to `now`.
    ///
    /// Fires 90 minutes after wake time; if that instant has already
    /// passed today, the plan rolls to tomorrow.
    pub fn after_wake(wake: NaiveTime, now: NaiveDateTime) -> Self {
        let mut fire_at = now.date().and_time(wake) + Duration::minutes(Self::WAKE_OFFSET_MINUTES);
        if fire_at <= now {
            fire_at += Duration::days(1);
        }
        Self {
            fire_at,
            repeat: Repeat::Daily,
        }
    }
}
