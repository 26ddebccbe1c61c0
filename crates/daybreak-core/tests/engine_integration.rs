//! Integration tests for the submission facade.
//!
//! These drive the full local path: duplicate rejection, streak credit on
//! local acceptance, rollback when durable storage fails, and read APIs.

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use daybreak_core::{
    AppDay, EngineConfig, EngineError, HabitFlags, LocalStore, MemoryRemote, MemoryStore,
    NetworkState, StorageError, SyncState, UserEngine,
};

fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, day)
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
}

fn good_day() -> HabitFlags {
    HabitFlags {
        drink_water: true,
        no_social_media: true,
        sunlight: false,
        elephant_task: true,
    }
}

fn engine_on(
    local: Arc<dyn LocalStore>,
    state: NetworkState,
) -> (UserEngine, watch::Sender<NetworkState>) {
    let (net_tx, net_rx) = watch::channel(state);
    let remote = Arc::new(MemoryRemote::new());
    let engine = UserEngine::login(
        "user-1",
        &EngineConfig::default(),
        local,
        remote,
        net_rx,
    )
    .unwrap();
    (engine, net_tx)
}

#[tokio::test]
async fn test_submit_returns_score_and_banded_message() {
    let local = Arc::new(MemoryStore::new());
    let (engine, _net) = engine_on(local, NetworkState::Unavailable);

    let receipt = engine.submit_at(good_day(), at(5, 8, 0)).await.unwrap();
    assert_eq!(receipt.score, 80);
    assert_eq!(receipt.message, "STRONG performance! Keep building momentum!");

    let today = engine.today_at(at(5, 9, 0)).unwrap().unwrap();
    assert_eq!(today.score, 80);
    assert_eq!(today.sync_state, SyncState::Pending);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_second_submission_same_day_rejected() {
    let local = Arc::new(MemoryStore::new());
    let (engine, _net) = engine_on(local, NetworkState::Unavailable);

    engine.submit_at(good_day(), at(5, 8, 0)).await.unwrap();
    let before = engine.progress().await;

    let err = engine
        .submit_at(HabitFlags::default(), at(5, 22, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadySubmittedToday { .. }));
    // The rejected call must not touch progress
    assert_eq!(engine.progress().await, before);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_before_reset_hour_counts_as_previous_day() {
    let local = Arc::new(MemoryStore::new());
    let (engine, _net) = engine_on(local, NetworkState::Unavailable);

    // 02:30 on March 5 is still app-day March 4
    engine.submit_at(good_day(), at(5, 2, 30)).await.unwrap();
    let progress = engine.progress().await;
    assert_eq!(
        progress.last_submitted_day,
        Some(AppDay::from_ymd(2026, 3, 4).unwrap())
    );

    // Later the same wall-clock day is a new app-day
    let receipt = engine.submit_at(good_day(), at(5, 8, 0)).await;
    assert!(receipt.is_ok());
    assert_eq!(engine.progress().await.current_streak, 2);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_streak_over_consecutive_days_and_gap() {
    let local = Arc::new(MemoryStore::new());
    let (engine, _net) = engine_on(local, NetworkState::Unavailable);

    for day in 1..=3 {
        engine.submit_at(good_day(), at(day, 8, 0)).await.unwrap();
    }
    let progress = engine.progress().await;
    assert_eq!(progress.current_streak, 3);
    assert_eq!(progress.longest_streak, 3);

    // Skip March 4 entirely
    engine.submit_at(good_day(), at(5, 8, 0)).await.unwrap();
    let progress = engine.progress().await;
    assert_eq!(progress.current_streak, 1);
    assert_eq!(progress.longest_streak, 3);
    assert_eq!(progress.total_days, 4);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_week_view_has_one_slot_per_day() {
    let local = Arc::new(MemoryStore::new());
    let (engine, _net) = engine_on(local, NetworkState::Unavailable);

    engine.submit_at(good_day(), at(1, 8, 0)).await.unwrap();
    engine.submit_at(good_day(), at(3, 8, 0)).await.unwrap();

    let week = engine.week(AppDay::from_ymd(2026, 3, 1).unwrap()).unwrap();
    assert_eq!(week.len(), 7);
    assert!(week[0].is_some());
    assert!(week[1].is_none());
    assert!(week[2].is_some());
    assert!(week[3..].iter().all(|slot| slot.is_none()));
    engine.shutdown().await;
}

#[tokio::test]
async fn test_state_survives_logout_login() {
    let local: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
    let (engine, _net) = engine_on(Arc::clone(&local), NetworkState::Unavailable);
    engine.submit_at(good_day(), at(1, 8, 0)).await.unwrap();
    engine.shutdown().await;

    let (engine, _net) = engine_on(local, NetworkState::Unavailable);
    let progress = engine.progress().await;
    assert_eq!(progress.current_streak, 1);
    assert_eq!(progress.total_days, 1);

    // The queued entry survived too, and the next day extends the streak
    assert_eq!(engine.sync_health().borrow().pending_count, 1);
    engine.submit_at(good_day(), at(2, 8, 0)).await.unwrap();
    assert_eq!(engine.progress().await.current_streak, 2);
    assert_eq!(engine.sync_health().borrow().pending_count, 2);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_reminder_plan_from_configured_wake_time() {
    let local = Arc::new(MemoryStore::new());
    let (net_tx, net_rx) = watch::channel(NetworkState::Unavailable);
    let mut config = EngineConfig::default();
    config.reminder.wake_hour = 7;
    config.reminder.wake_minute = 0;
    let engine = UserEngine::login(
        "user-1",
        &config,
        local as Arc<dyn LocalStore>,
        Arc::new(MemoryRemote::new()),
        net_rx,
    )
    .unwrap();

    let plan = engine.reminder_plan(at(5, 6, 0));
    assert_eq!(plan.fire_at, at(5, 8, 30));
    drop(net_tx);
    engine.shutdown().await;
}

/// Store wrapper that fails a scripted range of `set` calls.
struct ScriptedStore {
    inner: MemoryStore,
    set_calls: AtomicU32,
    fail_from: u32,
    fail_to: u32,
}

impl ScriptedStore {
    fn failing_sets(fail_from: u32, fail_to: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            set_calls: AtomicU32::new(0),
            fail_from,
            fail_to,
        }
    }
}

impl LocalStore for ScriptedStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let call = self.set_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if (self.fail_from..=self.fail_to).contains(&call) {
            return Err(StorageError::QueryFailed("scripted failure".into()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.list(prefix)
    }
}

#[tokio::test]
async fn test_enqueue_exhaustion_rolls_back_record() {
    // Set 1 is the submission record; sets 2-4 are the three enqueue
    // attempts, all failing.
    let local: Arc<dyn LocalStore> = Arc::new(ScriptedStore::failing_sets(2, 4));
    let (engine, _net) = engine_on(Arc::clone(&local), NetworkState::Unavailable);

    let err = engine.submit_at(good_day(), at(5, 8, 0)).await.unwrap_err();
    match err {
        EngineError::Storage(StorageError::Unavailable { attempts, .. }) => {
            assert_eq!(attempts, 3)
        }
        other => panic!("expected Storage(Unavailable), got {other:?}"),
    }

    // Nothing half-persisted: no record, no queue entry, no streak credit
    assert!(engine.today_at(at(5, 9, 0)).unwrap().is_none());
    assert!(local.list("queue/user-1/").unwrap().is_empty());
    assert_eq!(engine.progress().await.total_days, 0);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_progress_write_failure_rolls_back_everything() {
    // Set 1 record, set 2 queue entry, set 3 the progress write.
    let local: Arc<dyn LocalStore> = Arc::new(ScriptedStore::failing_sets(3, 3));
    let (engine, _net) = engine_on(Arc::clone(&local), NetworkState::Unavailable);

    let err = engine.submit_at(good_day(), at(5, 8, 0)).await.unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));

    assert!(engine.today_at(at(5, 9, 0)).unwrap().is_none());
    assert!(local.list("queue/user-1/").unwrap().is_empty());
    assert_eq!(engine.progress().await.total_days, 0);

    // The streak was never advanced, so the day is still submittable
    assert!(engine.submit_at(good_day(), at(5, 10, 0)).await.is_ok());
    engine.shutdown().await;
}
