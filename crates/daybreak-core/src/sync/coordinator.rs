//! Background sync coordinator, one task pair per user.
//!
//! Drain rules: oldest-first, stop on the first failure (no skip-ahead, the
//! streak depends on app-day order), retry on the next availability edge or
//! an exponential backoff timer, whichever comes first. A create that finds
//! the document already present counts as acknowledgment.

use chrono::{Local, Utc};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Duration, Instant};

use crate::day::{AppDay, DayBoundary};
use crate::engine::UserState;
use crate::remote::{DocKey, RemoteStore};
use crate::storage::LocalStore;
use crate::submission::{Submission, SyncState};
use crate::sync::{NetworkState, SyncHealth, TodayFeed};

struct Shared {
    user_id: String,
    boundary: DayBoundary,
    state: Arc<Mutex<UserState>>,
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    nudge: Notify,
    health_tx: watch::Sender<SyncHealth>,
    today_tx: watch::Sender<Option<Submission>>,
    backoff_secs: Vec<u64>,
}

/// Handle to the per-user sync tasks.
///
/// Spawned by the engine facade on login and torn down on logout. Holds the
/// queue-drain task and the remote today-feed forwarder.
pub struct SyncCoordinator {
    shared: Arc<Shared>,
    drain_task: JoinHandle<()>,
    feed_task: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl SyncCoordinator {
    pub(crate) fn spawn(
        user_id: String,
        boundary: DayBoundary,
        state: Arc<Mutex<UserState>>,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        network_rx: watch::Receiver<NetworkState>,
        backoff_secs: Vec<u64>,
        initial_pending: usize,
    ) -> Self {
        let (health_tx, _) = watch::channel(SyncHealth {
            pending_count: initial_pending,
            ..SyncHealth::default()
        });
        let (today_tx, _) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            user_id,
            boundary,
            state,
            local,
            remote,
            nudge: Notify::new(),
            health_tx,
            today_tx,
            backoff_secs,
        });
        let drain_task = tokio::spawn(run_drain(
            Arc::clone(&shared),
            network_rx,
            shutdown_rx.clone(),
        ));
        let feed_task = tokio::spawn(run_feed(Arc::clone(&shared), shutdown_rx));
        Self {
            shared,
            drain_task,
            feed_task,
            shutdown_tx,
        }
    }

    /// Live view of today's submission for this user.
    pub fn subscribe_today(&self) -> TodayFeed {
        TodayFeed::new(self.shared.today_tx.subscribe())
    }

    /// Sync health telemetry channel.
    pub fn health(&self) -> watch::Receiver<SyncHealth> {
        self.shared.health_tx.subscribe()
    }

    /// Publish a just-accepted local submission to the today feed.
    pub(crate) fn publish_local(&self, submission: &Submission, pending_count: usize) {
        self.shared.today_tx.send_replace(Some(submission.clone()));
        self.shared
            .health_tx
            .send_modify(|h| h.pending_count = pending_count);
    }

    /// Ask for a drain pass (fire-and-forget, coalesced).
    pub(crate) fn nudge(&self) {
        self.shared.nudge.notify_one();
    }

    /// Stop both tasks and wait for them to finish. In-flight drain steps
    /// complete before the task observes the shutdown signal.
    pub(crate) async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.drain_task.await;
        let _ = self.feed_task.await;
    }
}

async fn run_drain(
    shared: Arc<Shared>,
    mut network_rx: watch::Receiver<NetworkState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut backoff_idx: usize = 0;
    let mut retry_at: Option<Instant> = None;

    // Entries may have survived a restart; drain immediately if online.
    if network_rx.borrow_and_update().is_available() {
        drain(&shared, &mut backoff_idx, &mut retry_at).await;
    }

    loop {
        let retry_deadline =
            retry_at.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
        tokio::select! {
            res = shutdown_rx.changed() => {
                if res.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            res = network_rx.changed() => {
                match res {
                    Ok(()) => {
                        // Edge-triggered: only the transition to Available drains.
                        if network_rx.borrow_and_update().is_available() {
                            backoff_idx = 0;
                            retry_at = None;
                            drain(&shared, &mut backoff_idx, &mut retry_at).await;
                        }
                    }
                    Err(_) => break,
                }
            }
            _ = shared.nudge.notified() => {
                if network_rx.borrow().is_available() {
                    drain(&shared, &mut backoff_idx, &mut retry_at).await;
                }
            }
            _ = sleep_until(retry_deadline), if retry_at.is_some() => {
                retry_at = None;
                if network_rx.borrow().is_available() {
                    drain(&shared, &mut backoff_idx, &mut retry_at).await;
                }
            }
        }
    }
}

/// One drain pass: push queue entries oldest-first until empty or failure.
async fn drain(shared: &Arc<Shared>, backoff_idx: &mut usize, retry_at: &mut Option<Instant>) {
    shared.health_tx.send_modify(|h| h.draining = true);
    let today = shared.boundary.app_day(Local::now().naive_local());

    loop {
        let entry = {
            let st = shared.state.lock().await;
            st.queue.peek_oldest().cloned()
        };
        let Some(entry) = entry else { break };

        let mut submission = entry.submission.clone();
        submission.sync_state = SyncState::Synced;
        let key = DocKey::Submission {
            user_id: submission.user_id.clone(),
            day: submission.app_day,
        };
        let value = match serde_json::to_value(&submission) {
            Ok(value) => value,
            Err(err) => {
                log::error!("could not serialize queue entry {}: {err}", entry.id);
                shared
                    .health_tx
                    .send_modify(|h| h.last_error = Some(err.to_string()));
                break;
            }
        };

        match shared.remote.create_if_absent(&key, value).await {
            // AlreadyExists is acknowledgment too: a retried write that
            // landed, or another device's record for the same app-day.
            Ok(_) => {
                let pending = {
                    let mut st = shared.state.lock().await;
                    if let Err(err) = st.queue.mark_synced(entry.id) {
                        // Leave the entry queued; replaying it later is safe
                        // under the idempotent create.
                        log::warn!("failed to drop acknowledged entry {}: {err}", entry.id);
                        shared
                            .health_tx
                            .send_modify(|h| h.last_error = Some(err.to_string()));
                        break;
                    }
                    st.queue.len()
                };

                let record_key =
                    Submission::storage_key(&submission.user_id, submission.app_day);
                match serde_json::to_vec(&submission) {
                    Ok(bytes) => {
                        if let Err(err) = shared.local.set(&record_key, &bytes) {
                            log::warn!("failed to mark {record_key} synced locally: {err}");
                        }
                    }
                    Err(err) => {
                        log::warn!("could not serialize {record_key}: {err}");
                    }
                }

                if submission.app_day == today {
                    shared.today_tx.send_replace(Some(submission.clone()));
                }

                *backoff_idx = 0;
                shared.health_tx.send_modify(|h| {
                    h.pending_count = pending;
                    h.last_synced_at = Some(Utc::now());
                    h.last_error = None;
                });
            }
            Err(err) => {
                log::warn!("remote write failed for {key}: {err}");
                let delay = shared
                    .backoff_secs
                    .get(*backoff_idx)
                    .or(shared.backoff_secs.last())
                    .copied()
                    .unwrap_or(300);
                *backoff_idx = (*backoff_idx + 1).min(shared.backoff_secs.len());
                *retry_at = Some(Instant::now() + Duration::from_secs(delay));
                shared
                    .health_tx
                    .send_modify(|h| h.last_error = Some(err.to_string()));
                break;
            }
        }
    }

    // After a fully drained pass, push the derived progress snapshot.
    let (empty, snapshot) = {
        let st = shared.state.lock().await;
        (st.queue.is_empty(), st.progress.clone())
    };
    if empty {
        let key = DocKey::Progress {
            user_id: shared.user_id.clone(),
        };
        match serde_json::to_value(&snapshot) {
            Ok(value) => {
                if let Err(err) = shared.remote.put(&key, value).await {
                    log::debug!("progress snapshot upload failed: {err}");
                }
            }
            Err(err) => log::warn!("could not serialize progress snapshot: {err}"),
        }
    }
    shared.health_tx.send_modify(|h| h.draining = false);
}

/// Forward remote changes for today's key into the today feed.
async fn run_feed(shared: Arc<Shared>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut subscribed: Option<(AppDay, watch::Receiver<Option<serde_json::Value>>)> = None;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let today = shared.boundary.app_day(Local::now().naive_local());
        if subscribed.as_ref().map(|(day, _)| *day) != Some(today) {
            let key = DocKey::Submission {
                user_id: shared.user_id.clone(),
                day: today,
            };
            match shared.remote.subscribe(&key).await {
                Ok(rx) => {
                    // The stream is seeded with the current document; forward
                    // it so a record synced by another device before this
                    // subscription still reaches the feed.
                    match rx.borrow().clone() {
                        Some(value) => {
                            if let Ok(sub) = serde_json::from_value::<Submission>(value) {
                                if sub.app_day == today {
                                    shared.today_tx.send_replace(Some(sub));
                                }
                            }
                        }
                        None => {
                            // Day rolled over with nothing submitted yet;
                            // clear yesterday's value from the feed.
                            let rolled_over = subscribed
                                .as_ref()
                                .is_some_and(|(day, _)| *day != today);
                            if rolled_over {
                                shared.today_tx.send_replace(None);
                            }
                        }
                    }
                    subscribed = Some((today, rx));
                }
                Err(err) => {
                    log::debug!("today-feed subscription failed: {err}");
                    subscribed = None;
                    tokio::select! {
                        res = shutdown_rx.changed() => {
                            if res.is_err() {
                                break;
                            }
                        }
                        _ = sleep(Duration::from_secs(60)) => {}
                    }
                    continue;
                }
            }
        }

        let mut lost_stream = false;
        let mut stop = false;
        {
            let Some((day, rx)) = subscribed.as_mut() else {
                continue;
            };
            tokio::select! {
                res = shutdown_rx.changed() => {
                    if res.is_err() || *shutdown_rx.borrow() {
                        stop = true;
                    }
                }
                res = rx.changed() => {
                    match res {
                        Ok(()) => {
                            let value = rx.borrow_and_update().clone();
                            if let Some(value) = value {
                                match serde_json::from_value::<Submission>(value) {
                                    Ok(sub) if sub.app_day == *day => {
                                        shared.today_tx.send_replace(Some(sub));
                                    }
                                    Ok(_) => {}
                                    Err(err) => {
                                        log::debug!("ignoring malformed remote submission: {err}");
                                    }
                                }
                            }
                        }
                        Err(_) => lost_stream = true,
                    }
                }
                // Periodic re-check so the subscription follows the app-day
                // rollover at the reset hour.
                _ = sleep(Duration::from_secs(300)) => {}
            }
        }
        if stop {
            break;
        }
        if lost_stream {
            subscribed = None;
        }
    }
}
