//! Durable offline queue of not-yet-acknowledged submissions.
//!
//! Entries are JSON documents under `queue/{user}/{seq}` in the local store,
//! with a zero-padded monotonic sequence number so lexicographic key order
//! equals insertion order. The in-memory deque is a cache of the durable
//! entries; both are updated together.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage::LocalStore;
use crate::submission::Submission;

/// A submission waiting for remote acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedSubmission {
    /// Locally-unique entry id.
    pub id: Uuid,
    /// Per-user monotonic insertion sequence.
    pub seq: u64,
    pub submission: Submission,
    /// Set when the remote store acknowledges the write.
    pub synced: bool,
}

/// Strict-FIFO durable queue, one per user.
///
/// Submissions for different app-days must drain in app-day order; the
/// Streak Tracker's correctness depends on it. Insertion order equals
/// app-day order because at most one submission is accepted per app-day.
pub struct OfflineQueue {
    store: Arc<dyn LocalStore>,
    user_id: String,
    next_seq: u64,
    entries: VecDeque<QueuedSubmission>,
    retry_limit: u32,
}

impl OfflineQueue {
    /// Load the queue for `user_id`, replaying any entries that survived a
    /// restart.
    pub fn load(
        store: Arc<dyn LocalStore>,
        user_id: &str,
        retry_limit: u32,
    ) -> Result<Self, StorageError> {
        let prefix = Self::prefix(user_id);
        let mut entries = VecDeque::new();
        for key in store.list(&prefix)? {
            match store.get(&key)? {
                Some(bytes) => entries.push_back(serde_json::from_slice(&bytes)?),
                None => continue,
            }
        }
        let next_seq = entries
            .back()
            .map(|e: &QueuedSubmission| e.seq + 1)
            .unwrap_or(0);
        Ok(Self {
            store,
            user_id: user_id.to_string(),
            next_seq,
            entries,
            retry_limit: retry_limit.max(1),
        })
    }

    fn prefix(user_id: &str) -> String {
        format!("queue/{user_id}/")
    }

    fn entry_key(&self, seq: u64) -> String {
        format!("queue/{}/{seq:020}", self.user_id)
    }

    /// Append a submission. Transient storage errors are retried up to the
    /// configured bound; past it the entry is surfaced as unrecoverable
    /// rather than silently dropped.
    pub fn enqueue(&mut self, submission: Submission) -> Result<Uuid, StorageError> {
        let entry = QueuedSubmission {
            id: Uuid::new_v4(),
            seq: self.next_seq,
            submission,
            synced: false,
        };
        let bytes = serde_json::to_vec(&entry)?;
        let key = self.entry_key(entry.seq);

        let mut last_err = None;
        for attempt in 1..=self.retry_limit {
            match self.store.set(&key, &bytes) {
                Ok(()) => {
                    self.next_seq += 1;
                    let id = entry.id;
                    self.entries.push_back(entry);
                    return Ok(id);
                }
                Err(err) => {
                    log::warn!(
                        "enqueue attempt {attempt}/{} failed for {key}: {err}",
                        self.retry_limit
                    );
                    last_err = Some(err);
                }
            }
        }
        Err(StorageError::Unavailable {
            attempts: self.retry_limit,
            message: last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    /// The oldest pending entry, if any.
    pub fn peek_oldest(&self) -> Option<&QueuedSubmission> {
        self.entries.front()
    }

    /// Record remote acknowledgment for `id` and drop the entry.
    pub fn mark_synced(&mut self, id: Uuid) -> Result<(), StorageError> {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.synced = true;
        }
        self.remove(id)
    }

    /// Drop the entry for `id` from the queue and durable storage.
    ///
    /// Also the rollback path when a submission fails to persist fully.
    pub fn remove(&mut self, id: Uuid) -> Result<(), StorageError> {
        if let Some(pos) = self.entries.iter().position(|e| e.id == id) {
            let entry = self.entries.remove(pos).ok_or_else(|| {
                StorageError::QueryFailed("queue entry vanished during remove".into())
            })?;
            self.store.remove(&self.entry_key(entry.seq))?;
        }
        Ok(())
    }

    /// Pending entries, oldest first.
    pub fn list_pending(&self) -> Vec<QueuedSubmission> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
