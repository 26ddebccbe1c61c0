//! Core error types for daybreak-core.
//!
//! This module defines the error hierarchy using thiserror. Local-layer
//! errors (storage, queue) propagate to the caller of `submit`; remote-layer
//! errors never do -- they are absorbed by the Sync Coordinator's retry loop
//! and surfaced only through `SyncHealth`.

use std::path::PathBuf;
use thiserror::Error;

use crate::day::AppDay;

/// Top-level error type returned by the Submission API.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A submission already exists for the current app-day.
    #[error("Already submitted for app-day {day}")]
    AlreadySubmittedToday { day: AppDay },

    /// Local durable storage failed after bounded retries.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Local durable-storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the store
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Store is locked
    #[error("Store is locked")]
    Locked,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization of a stored record failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Write kept failing past the retry bound
    #[error("Local storage unavailable after {attempts} attempts: {message}")]
    Unavailable { attempts: u32, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Remote store errors.
///
/// Never returned from `submit`; the coordinator retries and reports them
/// via `SyncHealth::last_error`. A remote record already existing for an
/// app-day is not an error (see `CreateOutcome::AlreadyExists`).
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The store could not be reached
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the write
    #[error("Remote store rejected the request: {0}")]
    Rejected(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for EngineError
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
