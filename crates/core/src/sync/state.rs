//! Durable sync state: retry queue, synced-id set, live-session linkage.
//!
//! Owned by a single engine instance and persisted through the injected
//! store as whole-value snapshots, one key per concern. A session id may
//! sit in the retry queue across many failed attempts; once it enters the
//! synced set it leaves the queue for good.

use std::collections::HashSet;

use clockwork_domain::constants::{LIVE_SESSION_KEY, SYNCED_SESSIONS_KEY, SYNC_QUEUE_KEY};
use clockwork_domain::SessionRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::{remove_best_effort, write_best_effort, KeyValueStore};

/// Linkage to the remote mirror of the in-progress session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiveLink {
    pub remote_id: String,
    /// Local lap ids already created remotely.
    pub synced_laps: HashSet<Uuid>,
    /// Local lap ids whose images have been uploaded (or that have none).
    pub image_synced_laps: HashSet<Uuid>,
}

#[derive(Debug, Default)]
pub struct SyncState {
    queue: Vec<SessionRecord>,
    synced_sessions: HashSet<Uuid>,
    live: Option<LiveLink>,
}

impl SyncState {
    /// Load persisted state; missing or corrupt snapshots start empty.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            queue: read_json(store, SYNC_QUEUE_KEY).unwrap_or_default(),
            synced_sessions: read_json(store, SYNCED_SESSIONS_KEY).unwrap_or_default(),
            live: read_json(store, LIVE_SESSION_KEY),
        }
    }

    pub fn is_synced(&self, session_id: &Uuid) -> bool {
        self.synced_sessions.contains(session_id)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Snapshot of the retry queue for draining.
    pub fn queue_snapshot(&self) -> Vec<SessionRecord> {
        self.queue.clone()
    }

    pub fn is_queued(&self, session_id: &Uuid) -> bool {
        self.queue.iter().any(|session| session.id == *session_id)
    }

    /// Add a session to the retry queue, deduplicated by id.
    pub fn enqueue(&mut self, store: &dyn KeyValueStore, session: &SessionRecord) {
        if self.is_queued(&session.id) {
            return;
        }
        self.queue.push(session.clone());
        self.persist_queue(store);
        debug!(session_id = %session.id, queued = self.queue.len(), "session queued for retry");
    }

    /// Mark a session as pushed: enter the synced set, leave the queue.
    pub fn mark_synced(&mut self, store: &dyn KeyValueStore, session_id: Uuid) {
        self.synced_sessions.insert(session_id);
        self.queue.retain(|session| session.id != session_id);
        self.persist_queue(store);
        write_json(store, SYNCED_SESSIONS_KEY, &self.synced_sessions);
    }

    pub fn live(&self) -> Option<&LiveLink> {
        self.live.as_ref()
    }

    pub fn set_live_session(&mut self, store: &dyn KeyValueStore, remote_id: String) {
        self.live = Some(LiveLink { remote_id, ..Default::default() });
        self.persist_live(store);
    }

    pub fn live_lap_synced(&self, lap_id: &Uuid) -> bool {
        self.live
            .as_ref()
            .is_some_and(|link| link.synced_laps.contains(lap_id))
    }

    pub fn live_lap_count(&self) -> usize {
        self.live.as_ref().map_or(0, |link| link.synced_laps.len())
    }

    /// Record that a lap was created remotely. Returns false if no live
    /// session is linked.
    pub fn record_live_lap(&mut self, store: &dyn KeyValueStore, lap_id: Uuid) -> bool {
        let Some(link) = self.live.as_mut() else {
            warn!(lap_id = %lap_id, "no live session to record lap against");
            return false;
        };
        link.synced_laps.insert(lap_id);
        self.persist_live(store);
        true
    }

    pub fn live_images_synced(&self, lap_id: &Uuid) -> bool {
        self.live
            .as_ref()
            .is_some_and(|link| link.image_synced_laps.contains(lap_id))
    }

    pub fn record_live_images(&mut self, store: &dyn KeyValueStore, lap_id: Uuid) {
        if let Some(link) = self.live.as_mut() {
            link.image_synced_laps.insert(lap_id);
            self.persist_live(store);
        }
    }

    /// Drop all live-session tracking state.
    pub fn clear_live(&mut self, store: &dyn KeyValueStore) {
        self.live = None;
        remove_best_effort(store, LIVE_SESSION_KEY);
    }

    fn persist_queue(&self, store: &dyn KeyValueStore) {
        write_json(store, SYNC_QUEUE_KEY, &self.queue);
    }

    fn persist_live(&self, store: &dyn KeyValueStore) {
        if let Some(link) = &self.live {
            write_json(store, LIVE_SESSION_KEY, link);
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "corrupt sync state snapshot; ignoring");
            None
        }
    }
}

fn write_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => write_best_effort(store, key, &json),
        Err(err) => warn!(key, error = %err, "failed to serialize sync state"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn record() -> SessionRecord {
        SessionRecord::from_laps(&[], None, None)
    }

    #[test]
    fn enqueue_deduplicates_by_session_id() {
        let store = MemoryStore::new();
        let mut state = SyncState::default();
        let session = record();

        state.enqueue(&store, &session);
        state.enqueue(&store, &session);
        assert_eq!(state.queue_len(), 1);
    }

    #[test]
    fn mark_synced_moves_id_out_of_the_queue() {
        let store = MemoryStore::new();
        let mut state = SyncState::default();
        let session = record();

        state.enqueue(&store, &session);
        state.mark_synced(&store, session.id);

        assert!(state.is_synced(&session.id));
        assert!(!state.is_queued(&session.id));
        assert_eq!(state.queue_len(), 0);
    }

    #[test]
    fn state_round_trips_through_the_store() {
        let store = MemoryStore::new();
        let mut state = SyncState::default();
        let queued = record();
        let synced = record();

        state.enqueue(&store, &queued);
        state.mark_synced(&store, synced.id);
        state.set_live_session(&store, "remote-1".into());
        let lap_id = Uuid::new_v4();
        assert!(state.record_live_lap(&store, lap_id));

        let reloaded = SyncState::load(&store);
        assert!(reloaded.is_queued(&queued.id));
        assert!(reloaded.is_synced(&synced.id));
        assert_eq!(reloaded.live().map(|l| l.remote_id.as_str()), Some("remote-1"));
        assert!(reloaded.live_lap_synced(&lap_id));
    }

    #[test]
    fn corrupt_snapshots_start_empty() {
        let store = MemoryStore::new();
        store.set(SYNC_QUEUE_KEY, "garbage").unwrap();
        store.set(SYNCED_SESSIONS_KEY, "[1,").unwrap();

        let state = SyncState::load(&store);
        assert_eq!(state.queue_len(), 0);
        assert!(state.live().is_none());
    }

    #[test]
    fn clear_live_removes_linkage_and_key() {
        let store = MemoryStore::new();
        let mut state = SyncState::default();
        state.set_live_session(&store, "remote-1".into());
        assert!(store.get(LIVE_SESSION_KEY).is_some());

        state.clear_live(&store);
        assert!(state.live().is_none());
        assert_eq!(store.get(LIVE_SESSION_KEY), None);
    }

    #[test]
    fn recording_a_lap_without_live_session_is_rejected() {
        let store = MemoryStore::new();
        let mut state = SyncState::default();
        assert!(!state.record_live_lap(&store, Uuid::new_v4()));
    }
}
