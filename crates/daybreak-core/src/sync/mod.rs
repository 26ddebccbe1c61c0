//! Sync coordination between the Offline Queue and the remote store.
//!
//! The coordinator subscribes to connectivity transitions (it never polls),
//! drains the queue oldest-first on the unavailable-to-available edge, and
//! publishes live submission state plus sync health to subscribers.

mod coordinator;

pub use coordinator::SyncCoordinator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::submission::Submission;

/// Connectivity as reported by the platform's network-state source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkState {
    Available,
    Unavailable,
}

impl NetworkState {
    pub fn is_available(&self) -> bool {
        matches!(self, NetworkState::Available)
    }
}

/// Background sync health, published on every drain step.
///
/// A permanently failing sync stays enqueued and visible here; it is never
/// surfaced as a `submit` error and never silently discarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncHealth {
    /// Entries still waiting for remote acknowledgment.
    pub pending_count: usize,
    /// When the last entry was acknowledged.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Most recent remote failure, cleared on the next success.
    pub last_error: Option<String>,
    /// Whether a drain pass is in progress.
    pub draining: bool,
}

/// Live view of today's submission.
///
/// Single-slot latest-value delivery: a slow consumer sees the most recent
/// state, not a backlog. Delivery order is local write first, then the
/// remote-confirmed write. `cancel` (or drop) stops delivery without
/// affecting in-flight drains.
pub struct TodayFeed {
    rx: watch::Receiver<Option<Submission>>,
    cancelled: bool,
}

impl TodayFeed {
    pub(crate) fn new(rx: watch::Receiver<Option<Submission>>) -> Self {
        Self {
            rx,
            cancelled: false,
        }
    }

    /// The latest published state without waiting.
    pub fn latest(&self) -> Option<Submission> {
        self.rx.borrow().clone()
    }

    /// Wait for the next published state.
    ///
    /// Returns `None` once the feed is cancelled or the coordinator has
    /// shut down; no further values are delivered after that.
    pub async fn changed(&mut self) -> Option<Option<Submission>> {
        if self.cancelled {
            return None;
        }
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// Stop delivery. Idempotent.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
}
