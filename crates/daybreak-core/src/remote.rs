//! Remote document store collaborator.
//!
//! The engine treats the backend as an abstract key-addressed store with a
//! create-if-absent primitive and a subscribe-for-changes capability. The
//! create is idempotent per key: a retried write that already landed, or a
//! record created by another device, reports `AlreadyExists` and is treated
//! as success by the Sync Coordinator.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;

use crate::day::AppDay;
use crate::error::RemoteError;

/// Remote document key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocKey {
    /// One submission per (user, app-day).
    Submission { user_id: String, day: AppDay },
    /// Latest progress snapshot per user.
    Progress { user_id: String },
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocKey::Submission { user_id, day } => write!(f, "submission/{user_id}/{day}"),
            DocKey::Progress { user_id } => write!(f, "progress/{user_id}"),
        }
    }
}

/// Result of an idempotent create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The document was written.
    Created,
    /// A document already existed at this key; the write was a no-op.
    AlreadyExists,
}

/// Abstract remote store.
///
/// `subscribe` returns a latest-value channel for one key; dropping the
/// receiver ends delivery with no side effects.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Write `value` at `key` unless a document already exists there.
    async fn create_if_absent(
        &self,
        key: &DocKey,
        value: serde_json::Value,
    ) -> Result<CreateOutcome, RemoteError>;

    /// Read the document at `key`, if any.
    async fn get(&self, key: &DocKey) -> Result<Option<serde_json::Value>, RemoteError>;

    /// Write `value` at `key`, overwriting (last-writer-wins derived state).
    async fn put(&self, key: &DocKey, value: serde_json::Value) -> Result<(), RemoteError>;

    /// Change stream for `key`, seeded with the current document.
    async fn subscribe(
        &self,
        key: &DocKey,
    ) -> Result<watch::Receiver<Option<serde_json::Value>>, RemoteError>;
}

struct Slot {
    value: Option<serde_json::Value>,
    tx: watch::Sender<Option<serde_json::Value>>,
}

/// In-memory [`RemoteStore`].
///
/// Serves tests and local development; `set_online(false)` makes reads and
/// writes fail as unreachable, and `fail_next_creates` injects transient
/// write failures for retry/backoff coverage. Subscriptions stay open while
/// offline, matching a backend whose change streams resume on reconnect.
pub struct MemoryRemote {
    online: AtomicBool,
    fail_creates: AtomicU32,
    slots: Mutex<HashMap<String, Slot>>,
    create_log: Mutex<Vec<String>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            fail_creates: AtomicU32::new(0),
            slots: Mutex::new(HashMap::new()),
            create_log: Mutex::new(Vec::new()),
        }
    }

    /// Simulate connectivity loss or recovery.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Make the next `n` create calls fail even while online.
    pub fn fail_next_creates(&self, n: u32) {
        self.fail_creates.store(n, Ordering::SeqCst);
    }

    /// Keys successfully created, in order. Lets tests assert drain order.
    pub fn created_keys(&self) -> Vec<String> {
        self.create_log.lock().unwrap().clone()
    }

    /// Number of documents currently stored.
    pub fn doc_count(&self) -> usize {
        self.slots
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.value.is_some())
            .count()
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Unavailable("network unreachable".into()))
        }
    }

    fn with_slot<R>(&self, key: &DocKey, f: impl FnOnce(&mut Slot) -> R) -> R {
        let mut slots = self.slots.lock().unwrap();
        let slot = slots.entry(key.to_string()).or_insert_with(|| {
            let (tx, _rx) = watch::channel(None);
            Slot { value: None, tx }
        });
        f(slot)
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn create_if_absent(
        &self,
        key: &DocKey,
        value: serde_json::Value,
    ) -> Result<CreateOutcome, RemoteError> {
        self.check_online()?;
        if self
            .fail_creates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RemoteError::Unavailable("injected create failure".into()));
        }
        let outcome = self.with_slot(key, |slot| {
            if slot.value.is_some() {
                CreateOutcome::AlreadyExists
            } else {
                slot.value = Some(value.clone());
                slot.tx.send_replace(Some(value));
                CreateOutcome::Created
            }
        });
        if outcome == CreateOutcome::Created {
            self.create_log.lock().unwrap().push(key.to_string());
        }
        Ok(outcome)
    }

    async fn get(&self, key: &DocKey) -> Result<Option<serde_json::Value>, RemoteError> {
        self.check_online()?;
        Ok(self.with_slot(key, |slot| slot.value.clone()))
    }

    async fn put(&self, key: &DocKey, value: serde_json::Value) -> Result<(), RemoteError> {
        self.check_online()?;
        self.with_slot(key, |slot| {
            slot.value = Some(value.clone());
            slot.tx.send_replace(Some(value));
        });
        Ok(())
    }

    async fn subscribe(
        &self,
        key: &DocKey,
    ) -> Result<watch::Receiver<Option<serde_json::Value>>, RemoteError> {
        Ok(self.with_slot(key, |slot| slot.tx.subscribe()))
    }
}
