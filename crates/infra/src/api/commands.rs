//! Typed endpoint layer over the gateway.
//!
//! Implements the `RemoteTracker` port consumed by the reconciliation
//! engine. Every operation inherits the gateway's absorb-all-failures
//! contract: `None` means unreachable, rejected, or unauthenticated.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clockwork_core::sync::ports::{
    CreateLapRequest, CreateSessionRequest, RemoteLap, RemoteSession, RemoteTracker,
    UpdateLapRequest, UpdateSessionRequest,
};
use clockwork_domain::UserPreferences;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use super::gateway::ApiGateway;

pub struct ApiCommands {
    gateway: Arc<ApiGateway>,
}

impl ApiCommands {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    fn to_body<T: serde::Serialize>(request: &T) -> Option<Value> {
        match serde_json::to_value(request) {
            Ok(body) => Some(body),
            Err(err) => {
                warn!(error = %err, "failed to serialize request body");
                None
            }
        }
    }
}

#[async_trait]
impl RemoteTracker for ApiCommands {
    async fn create_session(&self, request: &CreateSessionRequest) -> Option<RemoteSession> {
        let body = Self::to_body(request)?;
        let session: RemoteSession =
            self.gateway.authenticated(Method::POST, "/sessions/", Some(&body)).await?;
        debug!(remote_id = %session.id, "remote session created");
        Some(session)
    }

    async fn update_session(
        &self,
        session_id: &str,
        request: &UpdateSessionRequest,
    ) -> Option<RemoteSession> {
        let body = Self::to_body(request)?;
        self.gateway
            .authenticated(Method::PUT, &format!("/sessions/{session_id}"), Some(&body))
            .await
    }

    async fn delete_session(&self, session_id: &str) -> Option<()> {
        let _: Value = self
            .gateway
            .authenticated(Method::DELETE, &format!("/sessions/{session_id}"), None)
            .await?;
        Some(())
    }

    async fn list_sessions(&self, limit: u32, offset: u32) -> Option<Vec<RemoteSession>> {
        self.gateway
            .authenticated(
                Method::GET,
                &format!("/sessions/?limit={limit}&offset={offset}"),
                None,
            )
            .await
    }

    async fn create_lap(&self, session_id: &str, request: &CreateLapRequest) -> Option<RemoteLap> {
        let body = Self::to_body(request)?;
        self.gateway
            .authenticated(Method::POST, &format!("/sessions/{session_id}/laps"), Some(&body))
            .await
    }

    async fn update_lap(
        &self,
        session_id: &str,
        lap_id: &str,
        request: &UpdateLapRequest,
    ) -> Option<RemoteLap> {
        let body = Self::to_body(request)?;
        self.gateway
            .authenticated(
                Method::PUT,
                &format!("/sessions/{session_id}/laps/{lap_id}"),
                Some(&body),
            )
            .await
    }

    async fn list_laps(&self, session_id: &str) -> Option<Vec<RemoteLap>> {
        self.gateway
            .authenticated(Method::GET, &format!("/sessions/{session_id}/laps"), None)
            .await
    }

    async fn upload_lap_images(
        &self,
        session_id: &str,
        lap_id: &str,
        images: &[String],
    ) -> Option<usize> {
        let decoded = decode_images(images);
        if decoded.is_empty() {
            return Some(0);
        }
        let count = decoded.len();

        let path = format!("/images/sessions/{session_id}/laps/{lap_id}/upload");
        let _: Value = self
            .gateway
            .authenticated_multipart(&path, || {
                let mut form = Form::new();
                for (index, bytes) in decoded.iter().enumerate() {
                    let part = Part::bytes(bytes.clone()).file_name(format!("image-{index}.png"));
                    form = form.part("images", part);
                }
                form
            })
            .await?;
        Some(count)
    }

    async fn fetch_settings(&self) -> Option<UserPreferences> {
        self.gateway.authenticated(Method::GET, "/settings/", None).await
    }

    async fn push_settings(&self, prefs: &UserPreferences) -> Option<UserPreferences> {
        let body = Self::to_body(prefs)?;
        self.gateway.authenticated(Method::PUT, "/settings/", Some(&body)).await
    }

    async fn check_health(&self) -> bool {
        self.gateway.check_health().await
    }
}

/// Decode stored base64 payloads, tolerating `data:` URL prefixes.
/// Undecodable entries are skipped with a warning.
fn decode_images(images: &[String]) -> Vec<Vec<u8>> {
    images
        .iter()
        .filter_map(|payload| {
            let raw = match payload.find("base64,") {
                Some(index) => &payload[index + "base64,".len()..],
                None => payload.as_str(),
            };
            match BASE64.decode(raw.trim()) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    warn!(error = %err, "skipping undecodable image payload");
                    None
                }
            }
        })
        .collect()
}
