//! Session archive: persistent local store of completed sessions.

use std::sync::Arc;

use clockwork_domain::constants::SESSIONS_KEY;
use clockwork_domain::{ClockworkError, Result, SessionRecord, WorkLap};
use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::{remove_best_effort, write_best_effort, KeyValueStore};

/// CRUD over archived sessions, stored newest-first under a single key.
pub struct SessionArchive {
    store: Arc<dyn KeyValueStore>,
}

impl SessionArchive {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Freeze the given ledger snapshot into an archive entry, prepend it,
    /// and persist. The record is returned even when the write fails (the
    /// archive then lives in memory only until the next successful save).
    pub fn save(
        &self,
        laps: &[WorkLap],
        session_name: Option<String>,
        description: Option<String>,
    ) -> SessionRecord {
        let record = SessionRecord::from_laps(laps, session_name, description);
        let mut sessions = self.list();
        sessions.insert(0, record.clone());
        self.persist(&sessions);
        info!(session_id = %record.id, laps = record.lap_count, "session archived");
        record
    }

    /// All archived sessions, newest-first. Missing or corrupt data yields
    /// an empty archive.
    pub fn list(&self) -> Vec<SessionRecord> {
        let Some(raw) = self.store.get(SESSIONS_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(sessions) => sessions,
            Err(err) => {
                warn!(error = %err, "corrupt session archive; starting empty");
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<SessionRecord> {
        self.list().into_iter().find(|session| session.id == id)
    }

    pub fn delete(&self, id: Uuid) {
        let sessions: Vec<SessionRecord> =
            self.list().into_iter().filter(|session| session.id != id).collect();
        self.persist(&sessions);
    }

    pub fn clear(&self) {
        remove_best_effort(self.store.as_ref(), SESSIONS_KEY);
    }

    /// The only permitted post-archive edit: name and description.
    pub fn rename(
        &self,
        id: Uuid,
        session_name: Option<String>,
        description: Option<String>,
    ) -> Result<()> {
        let mut sessions = self.list();
        let session = sessions
            .iter_mut()
            .find(|session| session.id == id)
            .ok_or_else(|| ClockworkError::NotFound(format!("session {id}")))?;
        session.session_name = session_name;
        session.description = description;
        self.persist(&sessions);
        Ok(())
    }

    fn persist(&self, sessions: &[SessionRecord]) {
        match serde_json::to_string(sessions) {
            Ok(json) => write_best_effort(self.store.as_ref(), SESSIONS_KEY, &json),
            Err(err) => warn!(error = %err, "failed to serialize session archive"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::storage::MemoryStore;

    fn archive() -> SessionArchive {
        SessionArchive::new(Arc::new(MemoryStore::new()))
    }

    fn lap(seconds: u64, rate: f64) -> WorkLap {
        let (h, m, s) = clockwork_domain::utils::split_duration(seconds);
        let mut lap = WorkLap::start(rate);
        lap.set_duration(h, m, s);
        lap.end(Utc::now());
        lap
    }

    #[test]
    fn save_then_list_newest_first() {
        let archive = archive();
        let first = archive.save(&[lap(60, 0.0)], None, None);
        let second = archive.save(&[lap(120, 0.0)], None, None);

        let sessions = archive.list();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, second.id);
        assert_eq!(sessions[1].id, first.id);
    }

    #[test]
    fn end_to_end_session_aggregates() {
        let archive = archive();
        let record = archive.save(&[lap(3661, 100.0)], None, None);

        let stored = archive.get(record.id).unwrap();
        assert_eq!(stored.total_seconds, 3661);
        assert_eq!(stored.lap_count, 1);
        assert_eq!(stored.total_amount, 101.69);
    }

    #[test]
    fn delete_removes_only_that_session() {
        let archive = archive();
        let keep = archive.save(&[lap(60, 0.0)], None, None);
        let drop = archive.save(&[lap(60, 0.0)], None, None);

        archive.delete(drop.id);
        let sessions = archive.list();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, keep.id);
    }

    #[test]
    fn clear_empties_the_archive() {
        let archive = archive();
        archive.save(&[lap(60, 0.0)], None, None);
        archive.clear();
        assert!(archive.list().is_empty());
    }

    #[test]
    fn rename_edits_name_and_description() {
        let archive = archive();
        let record = archive.save(&[lap(60, 0.0)], None, None);

        archive
            .rename(record.id, Some("Monday".into()), Some("standup + review".into()))
            .unwrap();
        let stored = archive.get(record.id).unwrap();
        assert_eq!(stored.session_name.as_deref(), Some("Monday"));
        assert_eq!(stored.description.as_deref(), Some("standup + review"));
    }

    #[test]
    fn rename_unknown_session_errors() {
        let archive = archive();
        assert!(archive.rename(Uuid::new_v4(), None, None).is_err());
    }

    #[test]
    fn corrupt_archive_degrades_to_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(SESSIONS_KEY, "not json").unwrap();
        let archive = SessionArchive::new(store);
        assert!(archive.list().is_empty());
    }
}
