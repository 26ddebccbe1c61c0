//! Streak tracking over accepted submissions.
//!
//! `ProgressState` is derived state: it is mutated exactly once per accepted
//! submission and never edited directly. The caller persists the updated
//! state together with the submission or not at all.

use serde::{Deserialize, Serialize};

use crate::day::AppDay;

/// Per-user progress, mutated only by [`ProgressState::on_submission_accepted`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Consecutive app-days ending at the most recent submission.
    pub current_streak: u32,
    /// Maximum streak ever observed. Never retroactively reduced.
    pub longest_streak: u32,
    /// Count of all accepted submissions ever.
    pub total_days: u32,
    /// App-day of the most recent accepted submission.
    pub last_submitted_day: Option<AppDay>,
}

/// What a submission did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakUpdate {
    /// First-ever submission.
    Started,
    /// Contiguous with the previous app-day.
    Extended,
    /// Gap of two or more app-days, or a backfilled earlier day.
    Reset,
    /// Same app-day seen again; state untouched.
    Duplicate,
}

impl ProgressState {
    /// Local-store key for `user_id`'s progress snapshot.
    pub fn storage_key(user_id: &str) -> String {
        format!("progress/{user_id}")
    }

    /// Apply one accepted submission for `day`.
    ///
    /// A repeat of `last_submitted_day` is a no-op: the Submission API
    /// already rejects same-day resubmission, but a duplicate must never
    /// double-count (a stale queue entry can replay after a restart).
    /// An out-of-order day (earlier than the last) resets the streak to 1.
    pub fn on_submission_accepted(&mut self, day: AppDay) -> StreakUpdate {
        let update = match self.last_submitted_day {
            None => {
                self.current_streak = 1;
                StreakUpdate::Started
            }
            Some(last) if day == last => return StreakUpdate::Duplicate,
            Some(last) if day.is_day_after(last) => {
                self.current_streak += 1;
                StreakUpdate::Extended
            }
            Some(_) => {
                self.current_streak = 1;
                StreakUpdate::Reset
            }
        };
        self.total_days += 1;
        self.last_submitted_day = Some(day);
        self.longest_streak = self.longest_streak.max(self.current_streak);
        update
    }
}
