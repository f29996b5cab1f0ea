//! Port interfaces for remote reconciliation.
//!
//! These traits define the boundary between the sync engine and the
//! authenticated HTTP gateway. Every fallible remote operation returns
//! `Option<T>`: `None` uniformly means unreachable, rejected, or
//! unauthenticated. The gateway absorbs all failure modes; the engine
//! only decides between "retry later" and "skip".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clockwork_domain::{UserPreferences, WorkLap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub session_name: String,
    pub description: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Total duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSession {
    pub id: String,
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateLapRequest {
    pub lap_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    pub is_break: bool,
}

impl CreateLapRequest {
    /// Single-call lap creation with all fields, used by both the full
    /// session push and the live mirroring path.
    pub fn from_lap(lap: &WorkLap) -> Self {
        Self {
            lap_name: lap.note.clone(),
            started_at: lap.started_at,
            ended_at: lap.ended_at,
            duration_seconds: Some(lap.total_seconds()),
            is_break: lap.is_break,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLapRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lap_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLap {
    pub id: String,
    #[serde(default)]
    pub lap_name: Option<String>,
}

/// The authenticated remote store, as seen by the reconciliation engine.
#[async_trait]
pub trait RemoteTracker: Send + Sync {
    async fn create_session(&self, request: &CreateSessionRequest) -> Option<RemoteSession>;

    async fn update_session(
        &self,
        session_id: &str,
        request: &UpdateSessionRequest,
    ) -> Option<RemoteSession>;

    async fn delete_session(&self, session_id: &str) -> Option<()>;

    async fn list_sessions(&self, limit: u32, offset: u32) -> Option<Vec<RemoteSession>>;

    async fn create_lap(&self, session_id: &str, request: &CreateLapRequest) -> Option<RemoteLap>;

    async fn update_lap(
        &self,
        session_id: &str,
        lap_id: &str,
        request: &UpdateLapRequest,
    ) -> Option<RemoteLap>;

    /// Remote laps in creation (chronological) order.
    async fn list_laps(&self, session_id: &str) -> Option<Vec<RemoteLap>>;

    /// Upload base64-encoded image payloads for a lap. Returns the number
    /// of images accepted.
    async fn upload_lap_images(
        &self,
        session_id: &str,
        lap_id: &str,
        images: &[String],
    ) -> Option<usize>;

    async fn fetch_settings(&self) -> Option<UserPreferences>;

    async fn push_settings(&self, prefs: &UserPreferences) -> Option<UserPreferences>;

    /// Whether the backend is reachable at all. Never errors.
    async fn check_health(&self) -> bool;
}

/// Locally stored images attached to laps.
pub trait LapImageSource: Send + Sync {
    /// Base64 payloads stored for the lap; empty when none.
    fn images_for(&self, lap_id: &Uuid) -> Vec<String>;
}
