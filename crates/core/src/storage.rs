//! Local durable storage port.
//!
//! The application persists everything (tokens, sync state, archived
//! sessions, image payloads) through a string key-value store. Writes may
//! fail (disk full, quota); callers wrap writes so a failure degrades to
//! "not persisted" rather than aborting the operation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use clockwork_domain::{ClockworkError, Result};
use tracing::warn;

/// String key-value storage with get/set/remove.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Missing keys and read failures both surface as `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Write through the store, downgrading failures to a warning.
///
/// In-memory state stays authoritative when the disk is full; the session
/// may be lost on reload, which is the accepted tradeoff for this tool.
pub fn write_best_effort(store: &dyn KeyValueStore, key: &str, value: &str) {
    if let Err(err) = store.set(key, value) {
        warn!(key, error = %err, "local write failed; continuing with in-memory state");
    }
}

/// Remove through the store, downgrading failures to a warning.
pub fn remove_best_effort(store: &dyn KeyValueStore, key: &str) {
    if let Err(err) = store.remove(key) {
        warn!(key, error = %err, "local remove failed");
    }
}

/// In-memory store used in tests and as a degraded fallback when no durable
/// store can be opened.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail, simulating a full disk.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ClockworkError::Storage("simulated write failure".into()));
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|e| ClockworkError::Storage(format!("store lock poisoned: {e}")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ClockworkError::Storage("simulated write failure".into()));
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|e| ClockworkError::Storage(format!("store lock poisoned: {e}")))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_values() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k"), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k"), Some("v".to_string()));
        store.remove("k").unwrap();
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn removing_missing_key_is_fine() {
        let store = MemoryStore::new();
        assert!(store.remove("absent").is_ok());
    }

    #[test]
    fn simulated_write_failure_surfaces_as_storage_error() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(matches!(store.set("k", "v"), Err(ClockworkError::Storage(_))));
        // best-effort helper swallows it
        write_best_effort(&store, "k", "v");
        assert_eq!(store.get("k"), None);
    }
}
