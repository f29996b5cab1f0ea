//! Crash-recovery snapshots of the live ledger.
//!
//! While the timer runs, the current ledger is snapshotted into a plain
//! local key every few minutes. This is pure local redundancy with no
//! remote interaction; the reconciliation engine clears the backup when
//! the live session completes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clockwork_core::storage::{remove_best_effort, write_best_effort, KeyValueStore};
use clockwork_domain::constants::LIVE_BACKUP_KEY;
use clockwork_domain::WorkLap;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Supplies the current ledger snapshot (newest-first).
pub trait LedgerSnapshotSource: Send + Sync {
    fn laps(&self) -> Vec<WorkLap>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveBackupSnapshot {
    pub timestamp: DateTime<Utc>,
    pub laps: Vec<WorkLap>,
}

pub struct LiveBackup {
    store: Arc<dyn KeyValueStore>,
    interval: Duration,
    cancellation: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl LiveBackup {
    pub fn new(store: Arc<dyn KeyValueStore>, interval: Duration) -> Self {
        Self { store, interval, cancellation: CancellationToken::new(), handle: None }
    }

    /// Start periodic snapshots from the given source.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup loop is already running.
    pub fn start(&mut self, source: Arc<dyn LedgerSnapshotSource>) -> Result<(), String> {
        if self.handle.is_some() {
            return Err("Live backup already running".to_string());
        }

        info!("starting live backup loop");
        self.cancellation = CancellationToken::new();

        let store = Arc::clone(&self.store);
        let interval = self.interval;
        let cancel = self.cancellation.clone();

        self.handle = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("live backup cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        let laps = source.laps();
                        if laps.is_empty() {
                            continue;
                        }
                        write_snapshot(store.as_ref(), &laps);
                    }
                }
            }
        }));

        Ok(())
    }

    /// Stop the backup loop. Only prevents future snapshots.
    pub async fn stop(&mut self) {
        self.cancellation.cancel();
        if let Some(handle) = self.handle.take() {
            if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
                warn!("live backup task did not stop within timeout");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Snapshot the given laps right now.
    pub fn take_backup(&self, laps: &[WorkLap]) {
        write_snapshot(self.store.as_ref(), laps);
    }

    /// The most recent snapshot, if one survived a crash.
    pub fn load_backup(&self) -> Option<LiveBackupSnapshot> {
        let raw = self.store.get(LIVE_BACKUP_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(error = %err, "corrupt live backup; ignoring");
                None
            }
        }
    }

    pub fn clear_backup(&self) {
        remove_best_effort(self.store.as_ref(), LIVE_BACKUP_KEY);
    }
}

impl Drop for LiveBackup {
    fn drop(&mut self) {
        if !self.cancellation.is_cancelled() && self.handle.is_some() {
            self.cancellation.cancel();
        }
    }
}

fn write_snapshot(store: &dyn KeyValueStore, laps: &[WorkLap]) {
    let snapshot = LiveBackupSnapshot { timestamp: Utc::now(), laps: laps.to_vec() };
    match serde_json::to_string(&snapshot) {
        Ok(json) => {
            write_best_effort(store, LIVE_BACKUP_KEY, &json);
            debug!(laps = laps.len(), "live backup written");
        }
        Err(err) => warn!(error = %err, "failed to serialize live backup"),
    }
}
