//! Credential set for the remote backend.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair with the locally stamped expiry instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub username: Option<String>,
    /// When the access token expires; `None` if the stamp was lost.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// True if the access token should be refreshed: no expiry recorded,
    /// or now is past `expires_at - margin`.
    pub fn is_expiring_soon(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() > expires_at - margin,
            None => true,
        }
    }
}
