//! SQLite-backed key-value storage.

use std::path::Path;
use std::sync::Mutex;

use clockwork_core::storage::KeyValueStore;
use clockwork_domain::{ClockworkError, Result};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, warn};

/// Durable string key-value store over a single SQLite table.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| ClockworkError::Storage(format!("failed to open store: {e}")))?;
        Self::init(conn)
    }

    /// In-memory store, handy for tests and ephemeral runs.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ClockworkError::Storage(format!("failed to open store: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // journal_mode returns a row, so it cannot go through execute_batch
        let _: std::result::Result<String, _> =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0));
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                 key TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )
        .map_err(|e| ClockworkError::Storage(format!("failed to initialize store: {e}")))?;
        debug!("key-value store ready");
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Option<String> {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = %err, "store lock poisoned");
                return None;
            }
        };
        conn.query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .unwrap_or_else(|err| {
                warn!(key, error = %err, "store read failed");
                None
            })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ClockworkError::Storage(format!("store lock poisoned: {e}")))?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )
        .map_err(|e| ClockworkError::Storage(format!("store write failed: {e}")))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ClockworkError::Storage(format!("store lock poisoned: {e}")))?;
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])
            .map_err(|e| ClockworkError::Storage(format!("store delete failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_values() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get("k"), None);
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k"), Some("v2".to_string()));
        store.remove("k").unwrap();
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clockwork.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("token", "abc").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("token"), Some("abc".to_string()));
    }

    #[test]
    fn removing_missing_key_is_fine() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.remove("absent").is_ok());
    }
}
