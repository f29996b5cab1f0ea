//! Auth service: login, signup, logout, backend-online probe.
//!
//! Foreground auth actions return a `{success, message}`-shaped outcome so
//! the UI can surface a human-readable result without handling errors;
//! nothing here throws.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clockwork_core::auth::CredentialManager;
use reqwest::Method;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::api::gateway::{ApiGateway, PublicOutcome};

/// Human-readable result of a foreground auth action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: String,
}

impl AuthOutcome {
    fn success(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    message: Option<String>,
}

const UNREACHABLE_MESSAGE: &str = "Cannot reach the server. Please try again later.";

pub struct AuthService {
    gateway: Arc<ApiGateway>,
    credentials: Arc<CredentialManager>,
    backend_online: AtomicBool,
}

impl AuthService {
    pub fn new(gateway: Arc<ApiGateway>, credentials: Arc<CredentialManager>) -> Self {
        Self { gateway, credentials, backend_online: AtomicBool::new(false) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    pub fn username(&self) -> Option<String> {
        self.credentials.username()
    }

    /// Log in and store the returned token pair.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> AuthOutcome {
        self.token_request("/auth/login", username, password, "Login successful", || {
            "Login failed. Please check your credentials.".to_string()
        })
        .await
    }

    /// Create an account and store the returned token pair.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn signup(&self, username: &str, password: &str) -> AuthOutcome {
        self.token_request("/auth/signup", username, password, "Account created successfully", || {
            "Signup failed. Username may already exist.".to_string()
        })
        .await
    }

    /// Best-effort server-side revoke, then local clear. Never fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.credentials.refresh_token() {
            let body = serde_json::json!({ "refreshToken": refresh_token });
            let outcome: PublicOutcome<serde_json::Value> =
                self.gateway.public(Method::POST, "/auth/logout", Some(&body)).await;
            if !matches!(outcome, PublicOutcome::Ok(_)) {
                warn!("server-side logout failed; clearing local state anyway");
            }
        }
        self.credentials.clear();
        info!("logged out");
    }

    /// Probe the backend and remember the result for the UI's online
    /// indicator.
    pub async fn probe_backend(&self) -> bool {
        let online = self.gateway.check_health().await;
        self.backend_online.store(online, Ordering::SeqCst);
        online
    }

    pub fn backend_online(&self) -> bool {
        self.backend_online.load(Ordering::SeqCst)
    }

    async fn token_request(
        &self,
        path: &str,
        username: &str,
        password: &str,
        success_message: &str,
        default_failure: impl Fn() -> String,
    ) -> AuthOutcome {
        let body = serde_json::json!({ "username": username, "password": password });
        match self.gateway.public::<TokenResponse>(Method::POST, path, Some(&body)).await {
            PublicOutcome::Ok(tokens) => {
                self.credentials.set_tokens(
                    &tokens.access_token,
                    &tokens.refresh_token,
                    Some(username),
                );
                AuthOutcome::success(tokens.message.unwrap_or_else(|| success_message.to_string()))
            }
            PublicOutcome::Rejected { detail, status } => {
                warn!(status, "auth request rejected");
                let message = if detail.is_empty() || detail == "Request failed" {
                    default_failure()
                } else {
                    detail
                };
                AuthOutcome::failure(message)
            }
            PublicOutcome::Unreachable => AuthOutcome::failure(UNREACHABLE_MESSAGE),
        }
    }
}
