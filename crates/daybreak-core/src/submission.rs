//! Submission records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::day::AppDay;
use crate::scoring::HabitFlags;

/// Whether a submission has been acknowledged by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Accepted locally, not yet acknowledged remotely.
    Pending,
    /// Acknowledged by the remote store; the record is immutable.
    Synced,
}

/// One habit checklist submission, at most one per (user, app-day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub user_id: String,
    /// Canonical day key; the uniqueness key together with `user_id`.
    pub app_day: AppDay,
    pub flags: HabitFlags,
    /// Derived 0-100 score; never user-supplied.
    pub score: u8,
    pub submitted_at: DateTime<Utc>,
    pub sync_state: SyncState,
}

impl Submission {
    /// Local-store key for the record of `(user_id, day)`.
    pub fn storage_key(user_id: &str, day: AppDay) -> String {
        format!("submission/{user_id}/{day}")
    }
}

/// What `submit` hands back to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub score: u8,
    /// Banded motivational message for the score.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_format() {
        let day = AppDay::from_ymd(2026, 3, 4).unwrap();
        assert_eq!(
            Submission::storage_key("user-1", day),
            "submission/user-1/2026-03-04"
        );
    }

    #[test]
    fn test_sync_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SyncState::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&SyncState::Synced).unwrap(),
            "\"synced\""
        );
    }

    #[test]
    fn test_submission_roundtrip_with_missing_flag() {
        // Records written by older builds may lack a flag; it reads as false.
        let json = r#"{
            "user_id": "user-1",
            "app_day": "2026-03-04",
            "flags": {"drink_water": true, "no_social_media": true, "elephant_task": true},
            "score": 80,
            "submitted_at": "2026-03-04T08:30:00Z",
            "sync_state": "pending"
        }"#;
        let sub: Submission = serde_json::from_str(json).unwrap();
        assert!(!sub.flags.sunlight);
        assert_eq!(sub.score, 80);
        assert_eq!(sub.sync_state, SyncState::Pending);
    }
}
