//! # Daybreak Core Library
//!
//! This library provides the daily task submission and progress engine for
//! the Daybreak habit tracker. It is invoked in-process by the UI layer;
//! there is no CLI surface and no wire format of its own.
//!
//! ## Architecture
//!
//! - **Scoring / Day Boundary**: pure functions mapping a habit checklist
//!   to a 0-100 score and wall-clock time to the canonical app-day (the
//!   day rolls over at a configurable reset hour, 03:00 by default)
//! - **Streak Tracker**: derived per-user progress state, credited on
//!   local acceptance and never retroactively revoked
//! - **Offline Queue**: durable FIFO of unacknowledged submissions over a
//!   keyed byte store (SQLite on device)
//! - **Sync Coordinator**: per-user background task that drains the queue
//!   on connectivity edges with idempotent remote creates
//!
//! ## Key Components
//!
//! - [`UserEngine`]: Submission API facade, one per logged-in user
//! - [`DayBoundary`]: wall-clock to app-day calculation
//! - [`OfflineQueue`]: durable submission buffer
//! - [`RemoteStore`]: abstract key-addressed document store collaborator
//! - [`EngineConfig`]: TOML configuration management

pub mod config;
pub mod day;
pub mod engine;
pub mod error;
pub mod queue;
pub mod remote;
pub mod reminder;
pub mod scoring;
pub mod storage;
pub mod streak;
pub mod submission;
pub mod sync;

pub use config::{EngineConfig, ReminderConfig, SyncConfig};
pub use day::{AppDay, DayBoundary};
pub use engine::UserEngine;
pub use error::{ConfigError, EngineError, RemoteError, StorageError};
pub use queue::{OfflineQueue, QueuedSubmission};
pub use remote::{CreateOutcome, DocKey, MemoryRemote, RemoteStore};
pub use reminder::{ReminderPlan, Repeat};
pub use scoring::{motivational_message, score, HabitFlags, HabitWeights};
pub use storage::{data_dir, LocalStore, MemoryStore, SqliteStore};
pub use streak::{ProgressState, StreakUpdate};
pub use submission::{SubmitReceipt, Submission, SyncState};
pub use sync::{NetworkState, SyncCoordinator, SyncHealth, TodayFeed};
