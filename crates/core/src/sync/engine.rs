//! The reconciliation engine: pushes local sessions to the remote store
//! under an at-least-once, idempotent delivery model.
//!
//! Failure semantics: network and auth failures are never fatal. A failed
//! push downgrades to "queued for retry" or "skipped"; the only operation
//! gated by a hard precondition is remote session creation. Partial remote
//! sessions are tolerated, since every other step is best-effort and
//! independently retryable thanks to the synced-id guards.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clockwork_domain::constants::{
    IMAGE_UPLOAD_DELAY_MS, LIVE_BACKUP_KEY, QUEUE_DRAIN_ITEM_DELAY_MS,
};
use clockwork_domain::{SessionRecord, WorkLap};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::auth::CredentialManager;
use crate::storage::{remove_best_effort, KeyValueStore};
use crate::sync::ports::{
    CreateLapRequest, CreateSessionRequest, LapImageSource, RemoteTracker, UpdateSessionRequest,
};
use crate::sync::state::SyncState;

/// Result of pushing one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Session fully pushed; carries the remote session id.
    Synced(String),
    /// Session id was already in the synced set; no network I/O happened.
    AlreadySynced,
    /// Push failed before the atomic gate; session is in the retry queue.
    Queued,
}

pub struct SyncEngine {
    remote: Arc<dyn RemoteTracker>,
    images: Arc<dyn LapImageSource>,
    credentials: Arc<CredentialManager>,
    store: Arc<dyn KeyValueStore>,
    state: Mutex<SyncState>,
    drain_delay: Duration,
    upload_delay: Duration,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteTracker>,
        images: Arc<dyn LapImageSource>,
        credentials: Arc<CredentialManager>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let state = SyncState::load(store.as_ref());
        Self {
            remote,
            images,
            credentials,
            store,
            state: Mutex::new(state),
            drain_delay: Duration::from_millis(QUEUE_DRAIN_ITEM_DELAY_MS),
            upload_delay: Duration::from_millis(IMAGE_UPLOAD_DELAY_MS),
        }
    }

    /// Override the rate-limiting delays (tests run with zero).
    pub fn with_delays(mut self, drain_delay: Duration, upload_delay: Duration) -> Self {
        self.drain_delay = drain_delay;
        self.upload_delay = upload_delay;
        self
    }

    /// Push a completed session: session -> laps -> images -> finalize.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn sync_session(&self, session: &SessionRecord) -> SyncOutcome {
        let mut state = self.state.lock().await;

        if state.is_synced(&session.id) {
            debug!("session already synced; skipping");
            return SyncOutcome::AlreadySynced;
        }

        // Session creation is the atomic gate: nothing further is attempted
        // when it fails, and the session goes to the retry queue.
        let request = CreateSessionRequest {
            session_name: session.display_name(),
            description: session.summary(),
            started_at: session.started_at.unwrap_or(session.created_at),
        };
        let Some(remote_session) = self.remote.create_session(&request).await else {
            warn!("failed to create remote session; queued for retry");
            state.enqueue(self.store.as_ref(), session);
            return SyncOutcome::Queued;
        };

        // Laps go up in chronological order (reverse of newest-first
        // storage), best-effort: one failed lap never aborts the push.
        for lap in session.laps.iter().rev() {
            let lap_request = CreateLapRequest::from_lap(lap);
            match self.remote.create_lap(&remote_session.id, &lap_request).await {
                Some(remote_lap) => {
                    self.push_lap_images(&remote_session.id, &remote_lap.id, &lap.id).await;
                }
                None => {
                    warn!(lap_id = %lap.id, "failed to push lap; continuing");
                }
            }
        }

        let finalize = UpdateSessionRequest {
            ended_at: Some(session.ended_at),
            total_duration: Some(session.total_seconds),
            is_completed: Some(true),
            ..Default::default()
        };
        if self.remote.update_session(&remote_session.id, &finalize).await.is_none() {
            warn!("failed to finalize remote session; leaving partial state");
        }

        state.mark_synced(self.store.as_ref(), session.id);
        info!(remote_id = %remote_session.id, "session synced");
        SyncOutcome::Synced(remote_session.id)
    }

    /// Drain the retry queue. No-op when unauthenticated, the queue is
    /// empty, or the backend is unreachable.
    #[instrument(skip(self))]
    pub async fn process_sync_queue(&self) {
        if !self.credentials.is_authenticated() {
            return;
        }

        let queued = { self.state.lock().await.queue_snapshot() };
        if queued.is_empty() {
            return;
        }

        if !self.remote.check_health().await {
            debug!("backend unreachable; leaving queue untouched");
            return;
        }

        info!(sessions = queued.len(), "processing sync queue");
        for session in &queued {
            let _ = self.sync_session(session).await;
            // be gentle on the server between sessions
            if !self.drain_delay.is_zero() {
                sleep(self.drain_delay).await;
            }
        }
    }

    /// Remote id of the live session, creating it lazily.
    pub async fn ensure_live_session(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        self.ensure_live_locked(&mut state).await
    }

    /// Mirror one completed lap into the live remote session.
    ///
    /// Skips as success when the lap id was already pushed. Creates the
    /// remote lap with all fields in one call, uploads its images, and
    /// refreshes the remote description with the synced-lap count.
    #[instrument(skip(self, lap), fields(lap_id = %lap.id))]
    pub async fn add_lap_to_live_session(&self, lap: &WorkLap) -> bool {
        let mut state = self.state.lock().await;

        if state.live_lap_synced(&lap.id) {
            debug!("lap already mirrored; skipping");
            return true;
        }

        let Some(remote_id) = self.ensure_live_locked(&mut state).await else {
            return false;
        };

        let request = CreateLapRequest::from_lap(lap);
        let Some(remote_lap) = self.remote.create_lap(&remote_id, &request).await else {
            warn!("failed to mirror lap");
            return false;
        };
        state.record_live_lap(self.store.as_ref(), lap.id);

        if self.push_lap_images(&remote_id, &remote_lap.id, &lap.id).await {
            state.record_live_images(self.store.as_ref(), lap.id);
        }

        let update = UpdateSessionRequest {
            description: Some(format!("{} laps synced", state.live_lap_count())),
            ..Default::default()
        };
        let _ = self.remote.update_session(&remote_id, &update).await;
        true
    }

    /// Manual/periodic full-state push of the in-progress session: every
    /// not-yet-synced closed lap goes up, then the aggregates with
    /// `isCompleted = false`.
    #[instrument(skip(self, laps), fields(laps = laps.len()))]
    pub async fn sync_current_session(&self, laps: &[WorkLap]) -> bool {
        let mut state = self.state.lock().await;
        self.sync_current_locked(&mut state, laps).await
    }

    /// Finish the live session: one last full-state push, final totals
    /// with `isCompleted = true`, best-effort positional image catch-up,
    /// then all live-tracking state is cleared.
    #[instrument(skip(self, laps), fields(laps = laps.len()))]
    pub async fn complete_live_session(&self, laps: &[WorkLap]) -> bool {
        let mut state = self.state.lock().await;

        // catch stragglers first
        let _ = self.sync_current_locked(&mut state, laps).await;

        let Some(remote_id) = state.live().map(|link| link.remote_id.clone()) else {
            debug!("no live session to complete");
            return false;
        };

        let total_seconds: u64 = laps.iter().map(WorkLap::total_seconds).sum();
        let finalize = UpdateSessionRequest {
            ended_at: Some(Utc::now()),
            total_duration: Some(total_seconds),
            is_completed: Some(true),
            ..Default::default()
        };
        let completed = self.remote.update_session(&remote_id, &finalize).await.is_some();

        // Positional catch-up: match local laps to remote laps by
        // chronological index and upload images that never made it up.
        if let Some(remote_laps) = self.remote.list_laps(&remote_id).await {
            for (index, lap) in laps.iter().rev().enumerate() {
                if state.live_images_synced(&lap.id) {
                    continue;
                }
                if self.images.images_for(&lap.id).is_empty() {
                    continue;
                }
                let Some(remote_lap) = remote_laps.get(index) else {
                    continue;
                };
                self.push_lap_images(&remote_id, &remote_lap.id, &lap.id).await;
            }
        }

        state.clear_live(self.store.as_ref());
        remove_best_effort(self.store.as_ref(), LIVE_BACKUP_KEY);
        info!(remote_id = %remote_id, completed, "live session completed");
        completed
    }

    /// Whether a session id is in the synced set.
    pub async fn is_session_synced(&self, session_id: Uuid) -> bool {
        self.state.lock().await.is_synced(&session_id)
    }

    /// Number of sessions waiting in the retry queue.
    pub async fn queue_len(&self) -> usize {
        self.state.lock().await.queue_len()
    }

    async fn ensure_live_locked(&self, state: &mut SyncState) -> Option<String> {
        if let Some(link) = state.live() {
            return Some(link.remote_id.clone());
        }

        let now = Utc::now();
        let request = CreateSessionRequest {
            session_name: format!("Session {}", now.format("%Y-%m-%d")),
            description: "in progress".to_string(),
            started_at: now,
        };
        let remote_session = self.remote.create_session(&request).await?;
        state.set_live_session(self.store.as_ref(), remote_session.id.clone());
        info!(remote_id = %remote_session.id, "live session created");
        Some(remote_session.id)
    }

    async fn sync_current_locked(&self, state: &mut SyncState, laps: &[WorkLap]) -> bool {
        let Some(remote_id) = self.ensure_live_locked(state).await else {
            return false;
        };

        // chronological order; running laps wait until they are closed so
        // their end time goes up with the single create call
        for lap in laps.iter().rev() {
            if lap.is_running() {
                debug!(lap_id = %lap.id, "lap still running; not pushed");
                continue;
            }
            if state.live_lap_synced(&lap.id) {
                continue;
            }
            match self.remote.create_lap(&remote_id, &CreateLapRequest::from_lap(lap)).await {
                Some(remote_lap) => {
                    state.record_live_lap(self.store.as_ref(), lap.id);
                    if self.push_lap_images(&remote_id, &remote_lap.id, &lap.id).await {
                        state.record_live_images(self.store.as_ref(), lap.id);
                    }
                }
                None => warn!(lap_id = %lap.id, "failed to push lap; continuing"),
            }
        }

        let total_seconds: u64 =
            laps.iter().filter(|lap| !lap.is_running()).map(|lap| lap.total_seconds()).sum();
        let update = UpdateSessionRequest {
            total_duration: Some(total_seconds),
            is_completed: Some(false),
            ..Default::default()
        };
        let _ = self.remote.update_session(&remote_id, &update).await;
        true
    }

    /// Upload the lap's stored images one by one, rate-limited. Returns
    /// true when every image (possibly zero) went up.
    async fn push_lap_images(
        &self,
        remote_session_id: &str,
        remote_lap_id: &str,
        lap_id: &Uuid,
    ) -> bool {
        let images = self.images.images_for(lap_id);
        if images.is_empty() {
            return true;
        }

        let mut all_uploaded = true;
        for (index, image) in images.iter().enumerate() {
            if index > 0 && !self.upload_delay.is_zero() {
                sleep(self.upload_delay).await;
            }
            if self
                .remote
                .upload_lap_images(remote_session_id, remote_lap_id, std::slice::from_ref(image))
                .await
                .is_none()
            {
                warn!(lap_id = %lap_id, index, "image upload failed; continuing");
                all_uploaded = false;
            }
        }
        all_uploaded
    }
}
