//! Submission API facade.
//!
//! One [`UserEngine`] per logged-in user: construct on login, `shutdown` on
//! logout. All per-user mutation is serialized through one internal async
//! mutex; distinct users are independent engines and may run fully in
//! parallel.

use chrono::{Local, NaiveDateTime, Utc};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::config::{EngineConfig, ReminderConfig};
use crate::day::{AppDay, DayBoundary};
use crate::error::{EngineError, Result};
use crate::queue::OfflineQueue;
use crate::remote::{DocKey, RemoteStore};
use crate::reminder::ReminderPlan;
use crate::scoring::{motivational_message, HabitFlags, HabitWeights};
use crate::storage::LocalStore;
use crate::streak::ProgressState;
use crate::submission::{SubmitReceipt, Submission, SyncState};
use crate::sync::{NetworkState, SyncCoordinator, SyncHealth, TodayFeed};

/// Mutable per-user state, shared with the Sync Coordinator.
pub(crate) struct UserState {
    pub queue: OfflineQueue,
    pub progress: ProgressState,
}

/// The single entry point used by the UI layer.
pub struct UserEngine {
    user_id: String,
    boundary: DayBoundary,
    weights: HabitWeights,
    reminder: ReminderConfig,
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    network_rx: watch::Receiver<NetworkState>,
    state: Arc<Mutex<UserState>>,
    coordinator: SyncCoordinator,
}

impl UserEngine {
    /// Bring up the engine for one user: load durable state, spawn the sync
    /// coordinator. Call once per login.
    pub fn login(
        user_id: impl Into<String>,
        config: &EngineConfig,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        network_rx: watch::Receiver<NetworkState>,
    ) -> Result<Self> {
        config.validate()?;
        let user_id = user_id.into();
        let boundary = DayBoundary::new(config.reset_hour);

        let queue = OfflineQueue::load(
            Arc::clone(&local),
            &user_id,
            config.sync.enqueue_retry_limit,
        )?;
        let progress = match local.get(&ProgressState::storage_key(&user_id))? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => ProgressState::default(),
        };
        let initial_pending = queue.len();
        let state = Arc::new(Mutex::new(UserState { queue, progress }));

        let coordinator = SyncCoordinator::spawn(
            user_id.clone(),
            boundary,
            Arc::clone(&state),
            Arc::clone(&local),
            Arc::clone(&remote),
            network_rx.clone(),
            config.sync.retry_backoff_secs.clone(),
            initial_pending,
        );

        Ok(Self {
            user_id,
            boundary,
            weights: HabitWeights::default(),
            reminder: config.reminder.clone(),
            local,
            remote,
            network_rx,
            state,
            coordinator,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Submit today's habit checklist.
    ///
    /// Returns once the submission is durably accepted locally; the remote
    /// write happens in the background. The streak is credited on local
    /// acceptance and never retroactively revoked by a failed sync.
    pub async fn submit(&self, flags: HabitFlags) -> Result<SubmitReceipt> {
        self.submit_at(flags, Local::now().naive_local()).await
    }

    /// Submit against an explicit wall-clock instant (clock injection for
    /// tests and replay tooling).
    pub async fn submit_at(&self, flags: HabitFlags, now: NaiveDateTime) -> Result<SubmitReceipt> {
        let day = self.boundary.app_day(now);
        let mut state = self.state.lock().await;

        if state.progress.last_submitted_day == Some(day) {
            return Err(EngineError::AlreadySubmittedToday { day });
        }
        let record_key = Submission::storage_key(&self.user_id, day);
        if self.local.get(&record_key)?.is_some() {
            return Err(EngineError::AlreadySubmittedToday { day });
        }
        // Best effort only: a remote read error never fails the call.
        if self.network_rx.borrow().is_available() {
            let key = DocKey::Submission {
                user_id: self.user_id.clone(),
                day,
            };
            if let Ok(Some(_)) = self.remote.get(&key).await {
                return Err(EngineError::AlreadySubmittedToday { day });
            }
        }

        let score = self.weights.score(&flags);
        let submission = Submission {
            user_id: self.user_id.clone(),
            app_day: day,
            flags,
            score,
            submitted_at: Utc::now(),
            sync_state: SyncState::Pending,
        };

        self.local.set(&record_key, &serde_json::to_vec(&submission)?)?;
        let entry_id = match state.queue.enqueue(submission.clone()) {
            Ok(id) => id,
            Err(err) => {
                let _ = self.local.remove(&record_key);
                return Err(err.into());
            }
        };

        // Streak credit and the durable progress write go together or not
        // at all; the record and queue entry are rolled back on failure.
        let mut updated = state.progress.clone();
        updated.on_submission_accepted(day);
        let progress_key = ProgressState::storage_key(&self.user_id);
        match serde_json::to_vec(&updated) {
            Ok(bytes) => {
                if let Err(err) = self.local.set(&progress_key, &bytes) {
                    let _ = state.queue.remove(entry_id);
                    let _ = self.local.remove(&record_key);
                    return Err(err.into());
                }
            }
            Err(err) => {
                let _ = state.queue.remove(entry_id);
                let _ = self.local.remove(&record_key);
                return Err(err.into());
            }
        }
        state.progress = updated;
        let pending = state.queue.len();
        drop(state);

        self.coordinator.publish_local(&submission, pending);
        self.coordinator.nudge();

        Ok(SubmitReceipt {
            score,
            message: motivational_message(score).to_string(),
        })
    }

    /// Today's submission, if one was accepted.
    pub fn today(&self) -> Result<Option<Submission>> {
        self.today_at(Local::now().naive_local())
    }

    /// `today` against an explicit instant.
    pub fn today_at(&self, now: NaiveDateTime) -> Result<Option<Submission>> {
        self.submission_for(self.boundary.app_day(now))
    }

    /// The stored submission for one app-day.
    pub fn submission_for(&self, day: AppDay) -> Result<Option<Submission>> {
        match self.local.get(&Submission::storage_key(&self.user_id, day))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Seven days of submissions starting at `start`, one slot per day.
    pub fn week(&self, start: AppDay) -> Result<Vec<Option<Submission>>> {
        let mut days = Vec::with_capacity(7);
        let mut day = start;
        for _ in 0..7 {
            days.push(self.submission_for(day)?);
            day = day.next();
        }
        Ok(days)
    }

    /// Current streak state.
    pub async fn progress(&self) -> ProgressState {
        self.state.lock().await.progress.clone()
    }

    /// Live feed of today's submission state.
    pub fn subscribe_today(&self) -> TodayFeed {
        self.coordinator.subscribe_today()
    }

    /// Background sync health telemetry.
    pub fn sync_health(&self) -> watch::Receiver<SyncHealth> {
        self.coordinator.health()
    }

    /// Instruction for the downstream notification scheduler.
    pub fn reminder_plan(&self, now: NaiveDateTime) -> ReminderPlan {
        ReminderPlan::after_wake(self.reminder.wake_time(), now)
    }

    /// Tear down the per-user sync tasks. Call on logout.
    pub async fn shutdown(self) {
        self.coordinator.shutdown().await;
    }
}
