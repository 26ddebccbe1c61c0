//! In-memory keyed byte store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use super::LocalStore;
use crate::error::StorageError;

/// In-memory [`LocalStore`], mostly for tests.
///
/// `fail_next_writes` injects transient write failures to exercise the
/// Offline Queue's bounded retry.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_writes: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` calls to `set` fail with a transient error.
    pub fn fail_next_writes(&self, n: u32) {
        self.fail_writes.store(n, Ordering::SeqCst);
    }

    fn take_injected_failure(&self) -> bool {
        self.fail_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.map.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        if self.take_injected_failure() {
            return Err(StorageError::QueryFailed("injected write failure".into()));
        }
        self.map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.map.lock().unwrap().remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .map
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_roundtrip() {
        let store = MemoryStore::new();
        store.set("a", b"1").unwrap();
        assert_eq!(store.get("a").unwrap(), Some(b"1".to_vec()));
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_list_sorted_by_key() {
        let store = MemoryStore::new();
        store.set("p/2", b"").unwrap();
        store.set("p/1", b"").unwrap();
        store.set("q/1", b"").unwrap();
        assert_eq!(store.list("p/").unwrap(), vec!["p/1", "p/2"]);
    }

    #[test]
    fn test_injected_failures_are_transient() {
        let store = MemoryStore::new();
        store.fail_next_writes(2);
        assert!(store.set("a", b"1").is_err());
        assert!(store.set("a", b"1").is_err());
        assert!(store.set("a", b"1").is_ok());
    }
}
