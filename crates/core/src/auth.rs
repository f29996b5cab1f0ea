//! Credential manager: token lifecycle state.
//!
//! Pure state over the injected key-value store plus an in-memory cache.
//! No network calls originate here; refreshing is the gateway's job.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, TimeZone, Utc};
use clockwork_domain::constants::{
    ACCESS_TOKEN_KEY, ACCESS_TOKEN_TTL_MINUTES, REFRESH_TOKEN_KEY, TOKEN_EXPIRY_KEY,
    TOKEN_REFRESH_MARGIN_MINUTES, USERNAME_KEY,
};
use clockwork_domain::Credentials;
use tracing::{debug, info, warn};

use crate::storage::{remove_best_effort, write_best_effort, KeyValueStore};

pub struct CredentialManager {
    store: Arc<dyn KeyValueStore>,
    current: RwLock<Option<Credentials>>,
}

impl CredentialManager {
    /// Create a manager, loading any persisted credentials.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let current = Self::load(store.as_ref());
        if current.is_some() {
            debug!("loaded persisted credentials");
        }
        Self { store, current: RwLock::new(current) }
    }

    fn load(store: &dyn KeyValueStore) -> Option<Credentials> {
        let access_token = store.get(ACCESS_TOKEN_KEY)?;
        let refresh_token = store.get(REFRESH_TOKEN_KEY)?;
        let username = store.get(USERNAME_KEY);
        let expires_at = store
            .get(TOKEN_EXPIRY_KEY)
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single());
        Some(Credentials { access_token, refresh_token, username, expires_at })
    }

    /// True iff both access and refresh tokens are present.
    pub fn is_authenticated(&self) -> bool {
        self.current.read().map(|c| c.is_some()).unwrap_or(false)
    }

    /// True when the access token should be refreshed: no expiry recorded,
    /// or less than the refresh margin left.
    pub fn is_expiring_soon(&self) -> bool {
        match self.current.read() {
            Ok(guard) => match guard.as_ref() {
                Some(credentials) => {
                    credentials.is_expiring_soon(Duration::minutes(TOKEN_REFRESH_MARGIN_MINUTES))
                }
                None => true,
            },
            Err(_) => true,
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.current.read().ok()?.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current.read().ok()?.as_ref().map(|c| c.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current.read().ok()?.as_ref().map(|c| c.refresh_token.clone())
    }

    pub fn username(&self) -> Option<String> {
        self.current.read().ok()?.as_ref().and_then(|c| c.username.clone())
    }

    /// Store a fresh token pair (after login/signup), stamping the expiry
    /// with the configured safety margin under the server's 30-minute
    /// token lifetime.
    pub fn set_tokens(&self, access_token: &str, refresh_token: &str, username: Option<&str>) {
        let expires_at = Utc::now() + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES);
        let username = match username {
            Some(name) => Some(name.to_string()),
            None => self.username(),
        };

        write_best_effort(self.store.as_ref(), ACCESS_TOKEN_KEY, access_token);
        write_best_effort(self.store.as_ref(), REFRESH_TOKEN_KEY, refresh_token);
        if let Some(name) = &username {
            write_best_effort(self.store.as_ref(), USERNAME_KEY, name);
        }
        Self::persist_expiry(self.store.as_ref(), expires_at);

        if let Ok(mut guard) = self.current.write() {
            *guard = Some(Credentials {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
                username,
                expires_at: Some(expires_at),
            });
        }
        info!("credentials stored");
    }

    /// Refresh path: replace only the access token and re-stamp expiry.
    pub fn update_access_token(&self, access_token: &str) {
        let expires_at = Utc::now() + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES);

        match self.current.write() {
            Ok(mut guard) => match guard.as_mut() {
                Some(credentials) => {
                    credentials.access_token = access_token.to_string();
                    credentials.expires_at = Some(expires_at);
                }
                None => {
                    warn!("refreshed access token with no stored credentials; ignoring");
                    return;
                }
            },
            Err(_) => return,
        }

        write_best_effort(self.store.as_ref(), ACCESS_TOKEN_KEY, access_token);
        Self::persist_expiry(self.store.as_ref(), expires_at);
        debug!("access token refreshed");
    }

    /// Remove all credential state (logout).
    pub fn clear(&self) {
        remove_best_effort(self.store.as_ref(), ACCESS_TOKEN_KEY);
        remove_best_effort(self.store.as_ref(), REFRESH_TOKEN_KEY);
        remove_best_effort(self.store.as_ref(), USERNAME_KEY);
        remove_best_effort(self.store.as_ref(), TOKEN_EXPIRY_KEY);
        if let Ok(mut guard) = self.current.write() {
            *guard = None;
        }
        info!("credentials cleared");
    }

    fn persist_expiry(store: &dyn KeyValueStore, expires_at: DateTime<Utc>) {
        write_best_effort(store, TOKEN_EXPIRY_KEY, &expires_at.timestamp_millis().to_string());
    }
}
