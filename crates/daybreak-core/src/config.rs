//! TOML-based engine configuration.
//!
//! Stores the daily reset hour, the user's wake time for the reminder
//! instruction, and sync tuning. Every field is serde-defaulted so a
//! partial or missing file loads cleanly.
//!
//! Configuration is stored at `~/.config/daybreak/config.toml`.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::day::DayBoundary;
use crate::error::ConfigError;
use crate::storage::data_dir;

/// Reminder-instruction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_wake_hour")]
    pub wake_hour: u32,
    #[serde(default)]
    pub wake_minute: u32,
}

impl ReminderConfig {
    /// The configured wake time as a time of day.
    pub fn wake_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.wake_hour.min(23), self.wake_minute.min(59), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

/// Sync tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Retry delays after a failed remote write; the last value repeats.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: Vec<u64>,
    /// Attempts before a local enqueue is surfaced as unrecoverable.
    #[serde(default = "default_enqueue_retry_limit")]
    pub enqueue_retry_limit: u32,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/daybreak/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hour at which the app-day rolls over (see [`DayBoundary`]).
    #[serde(default = "default_reset_hour")]
    pub reset_hour: u32,
    #[serde(default)]
    pub reminder: ReminderConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

// Default functions
fn default_reset_hour() -> u32 {
    DayBoundary::DEFAULT_RESET_HOUR
}
fn default_wake_hour() -> u32 {
    7
}
fn default_retry_backoff_secs() -> Vec<u64> {
    vec![30, 60, 300]
}
fn default_enqueue_retry_limit() -> u32 {
    3
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            wake_hour: default_wake_hour(),
            wake_minute: 0,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_backoff_secs: default_retry_backoff_secs(),
            enqueue_retry_limit: default_enqueue_retry_limit(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reset_hour: default_reset_hour(),
            reminder: ReminderConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl EngineConfig {
    fn config_path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|err| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: err.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location; defaults if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(&Self::config_path()?)
    }

    /// Load from a specific path (used by tests).
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|err| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        toml::from_str(&content).map_err(|err| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(&Self::config_path()?)
    }

    /// Save to a specific path (used by tests).
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|err| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        std::fs::write(path, content).map_err(|err| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reset_hour > 23 {
            return Err(ConfigError::InvalidValue {
                key: "reset_hour".to_string(),
                message: format!("{} is not an hour of the day", self.reset_hour),
            });
        }
        if self.reminder.wake_hour > 23 || self.reminder.wake_minute > 59 {
            return Err(ConfigError::InvalidValue {
                key: "reminder".to_string(),
                message: format!(
                    "{:02}:{:02} is not a time of day",
                    self.reminder.wake_hour, self.reminder.wake_minute
                ),
            });
        }
        if self.sync.retry_backoff_secs.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "sync.retry_backoff_secs".to_string(),
                message: "at least one delay is required".to_string(),
            });
        }
        if self.sync.enqueue_retry_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sync.enqueue_retry_limit".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.reset_hour, 3);
        assert_eq!(config.reminder.wake_hour, 7);
        assert_eq!(config.sync.retry_backoff_secs, vec![30, 60, 300]);
        assert_eq!(config.sync.enqueue_retry_limit, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load_from_path(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.reset_hour, 3);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "reset_hour = 4\n").unwrap();
        let config = EngineConfig::load_from_path(&path).unwrap();
        assert_eq!(config.reset_hour, 4);
        assert_eq!(config.reminder.wake_hour, 7);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = EngineConfig::default();
        config.reminder.wake_hour = 6;
        config.reminder.wake_minute = 30;
        config.save_to_path(&path).unwrap();

        let loaded = EngineConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.reminder.wake_time().to_string(), "06:30:00");
    }

    #[test]
    fn test_validate_rejects_bad_hours() {
        let config = EngineConfig {
            reset_hour: 24,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.reminder.wake_minute = 60;
        assert!(config.validate().is_err());
    }
}
