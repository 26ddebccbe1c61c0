//! Local durable storage.
//!
//! A simple keyed byte store is the only on-device persistence the engine
//! needs. The Offline Queue, submission records, and progress snapshots all
//! live behind [`LocalStore`]; the SQLite backend is the production choice,
//! the in-memory backend serves tests.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use crate::error::StorageError;

/// Keyed byte storage with ordered listing.
///
/// Implementations must be safe to share across the engine and the Sync
/// Coordinator task. `list` returns keys in ascending lexicographic order,
/// which the Offline Queue relies on for FIFO replay after a restart.
pub trait LocalStore: Send + Sync {
    /// Read the value at `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write `value` at `key`, overwriting any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove the value at `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All keys starting with `prefix`, ascending.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Returns `~/.config/daybreak[-dev]/` based on DAYBREAK_ENV.
///
/// Set DAYBREAK_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("DAYBREAK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("daybreak-dev")
    } else {
        base_dir.join("daybreak")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
