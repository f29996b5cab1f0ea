//! Background sync timers.
//!
//! Two periodic tasks started together and cancelled together:
//! - token sweep: refresh the access token when it is expiring soon;
//! - queue drain: push queued sessions (plus one immediate drain on start).
//!
//! Both are no-ops when unauthenticated. Stopping cancels future cycles
//! but does not abort an in-flight HTTP call.

use std::sync::Arc;
use std::time::Duration;

use clockwork_core::auth::CredentialManager;
use clockwork_core::sync::engine::SyncEngine;
use clockwork_domain::SyncConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::api::gateway::ApiGateway;

pub struct BackgroundSync {
    engine: Arc<SyncEngine>,
    gateway: Arc<ApiGateway>,
    credentials: Arc<CredentialManager>,
    config: SyncConfig,
    cancellation: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundSync {
    pub fn new(
        engine: Arc<SyncEngine>,
        gateway: Arc<ApiGateway>,
        credentials: Arc<CredentialManager>,
        config: SyncConfig,
    ) -> Self {
        Self {
            engine,
            gateway,
            credentials,
            config,
            cancellation: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// Start both timers.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler is already running.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<(), String> {
        if self.is_running() {
            return Err("Background sync already running".to_string());
        }

        info!("starting background sync");
        self.cancellation = CancellationToken::new();

        // Token refresh sweep
        {
            let gateway = Arc::clone(&self.gateway);
            let credentials = Arc::clone(&self.credentials);
            let interval = Duration::from_secs(self.config.token_sweep_interval_seconds);
            let cancel = self.cancellation.clone();

            self.handles.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("token sweep cancelled");
                            break;
                        }
                        _ = tokio::time::sleep(interval) => {
                            if credentials.is_authenticated() && credentials.is_expiring_soon() {
                                info!("token expiring soon; refreshing");
                                let _ = gateway.refresh_access_token().await;
                            }
                        }
                    }
                }
            }));
        }

        // Queue drain sweep, with one immediate pass
        {
            let engine = Arc::clone(&self.engine);
            let interval = Duration::from_secs(self.config.queue_drain_interval_seconds);
            let cancel = self.cancellation.clone();

            self.handles.push(tokio::spawn(async move {
                engine.process_sync_queue().await;

                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("queue drain cancelled");
                            break;
                        }
                        _ = tokio::time::sleep(interval) => {
                            engine.process_sync_queue().await;
                        }
                    }
                }
            }));
        }

        info!("background sync started");
        Ok(())
    }

    /// Stop both timers and await their completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler is not running or a task fails to
    /// stop within the join timeout.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), String> {
        if !self.is_running() {
            return Err("Background sync not running".to_string());
        }

        info!("stopping background sync");
        self.cancellation.cancel();

        for handle in self.handles.drain(..) {
            match tokio::time::timeout(Duration::from_secs(5), handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("background task panicked: {e}");
                    return Err("Background task panicked".to_string());
                }
                Err(_) => {
                    warn!("background task did not stop within timeout");
                    return Err("Background task timeout".to_string());
                }
            }
        }

        info!("background sync stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }
}

/// Ensure the timers die with the scheduler.
impl Drop for BackgroundSync {
    fn drop(&mut self) {
        if !self.cancellation.is_cancelled() && self.is_running() {
            warn!("background sync dropped while running; cancelling");
            self.cancellation.cancel();
        }
    }
}
