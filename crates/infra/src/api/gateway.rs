//! The sync gateway: one authenticated or public HTTP call with every
//! failure mode normalized.
//!
//! Authenticated calls wrap expiry-aware token refresh and
//! single-retry-on-401 semantics and degrade to `None` ("unreachable")
//! instead of propagating errors. Public calls additionally distinguish
//! "server reachable but rejected" from "server unreachable" so login and
//! signup can show the right message.

use std::sync::Arc;
use std::time::Duration;

use clockwork_core::auth::CredentialManager;
use clockwork_domain::constants::HEALTH_CHECK_TIMEOUT_SECS;
use clockwork_domain::ApiConfig;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::errors::ApiError;

/// Outcome of an unauthenticated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicOutcome<T> {
    /// 2xx with a parsed body.
    Ok(T),
    /// Server reachable but returned non-2xx.
    Rejected { status: u16, detail: String },
    /// Network failure, timeout, or unparseable success body.
    Unreachable,
}

impl<T> PublicOutcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            _ => None,
        }
    }
}

pub struct ApiGateway {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<CredentialManager>,
}

impl ApiGateway {
    /// Build a gateway against the configured base URL (including the
    /// `/api` prefix).
    pub fn new(config: &ApiConfig, credentials: Arc<CredentialManager>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/health` lives outside the `/api` prefix.
    fn health_endpoint(&self) -> String {
        format!("{}/health", self.base_url.trim_end_matches("/api"))
    }

    /// Issue an authenticated JSON request. Returns the parsed body, or
    /// `None` on any failure: not logged in, network error, non-2xx, or a
    /// 401 that survives one refresh-and-retry.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn authenticated<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Option<T> {
        if !self.credentials.is_authenticated() {
            return None;
        }

        // Best-effort pre-refresh; proceed with the current token on
        // failure and let the 401 path sort it out.
        if self.credentials.is_expiring_soon() && !self.refresh_access_token().await {
            warn!("token refresh failed, proceeding with current token");
        }

        let token = self.credentials.access_token()?;
        let response = match self.send_bearer(method.clone(), path, body, &token).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "network error");
                return None;
            }
        };

        if response.status() == StatusCode::UNAUTHORIZED {
            if !self.refresh_access_token().await {
                warn!("authentication failed, tokens may be expired");
                return None;
            }
            let token = self.credentials.access_token()?;
            let retry = match self.send_bearer(method, path, body, &token).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "network error on retry");
                    return None;
                }
            };
            if !retry.status().is_success() {
                warn!(status = %retry.status(), "retry failed");
                return None;
            }
            return parse_json(retry).await;
        }

        if !response.status().is_success() {
            warn!(status = %response.status(), "request failed");
            return None;
        }

        parse_json(response).await
    }

    /// Authenticated multipart upload with the same expiry/401 semantics.
    /// The form is rebuilt through the closure for the retry; no explicit
    /// content-type header so the transport sets the multipart boundary.
    #[instrument(skip(self, make_form), fields(path = %path))]
    pub async fn authenticated_multipart<T, F>(&self, path: &str, make_form: F) -> Option<T>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::multipart::Form,
    {
        if !self.credentials.is_authenticated() {
            return None;
        }

        if self.credentials.is_expiring_soon() && !self.refresh_access_token().await {
            warn!("token refresh failed, proceeding with current token");
        }

        let token = self.credentials.access_token()?;
        let send = |token: String| {
            self.http
                .post(self.endpoint(path))
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .multipart(make_form())
                .send()
        };

        let response = match send(token).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "network error");
                return None;
            }
        };

        if response.status() == StatusCode::UNAUTHORIZED {
            if !self.refresh_access_token().await {
                return None;
            }
            let token = self.credentials.access_token()?;
            let retry = send(token).await.ok()?;
            if !retry.status().is_success() {
                warn!(status = %retry.status(), "upload retry failed");
                return None;
            }
            return parse_json(retry).await;
        }

        if !response.status().is_success() {
            warn!(status = %response.status(), "upload failed");
            return None;
        }

        parse_json(response).await
    }

    /// Issue an unauthenticated JSON request.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn public<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> PublicOutcome<T> {
        let mut request = self
            .http
            .request(method, self.endpoint(path))
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "network error");
                return PublicOutcome::Unreachable;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("detail").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "Request failed".to_string());
            return PublicOutcome::Rejected { status: status.as_u16(), detail };
        }

        match parse_json(response).await {
            Some(value) => PublicOutcome::Ok(value),
            None => PublicOutcome::Unreachable,
        }
    }

    /// Exchange the refresh token for a new access token. Updates only the
    /// access token and its expiry stamp. Never errors.
    pub async fn refresh_access_token(&self) -> bool {
        let Some(refresh_token) = self.credentials.refresh_token() else {
            return false;
        };

        let body = serde_json::json!({ "refreshToken": refresh_token });
        let response = match self
            .http
            .post(self.endpoint("/auth/refresh"))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "token refresh network error");
                return false;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "token refresh failed");
            return false;
        }

        match response.json::<Value>().await {
            Ok(body) => match body.get("accessToken").and_then(Value::as_str) {
                Some(access_token) => {
                    self.credentials.update_access_token(access_token);
                    debug!("access token refreshed");
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    /// Whether the backend is reachable, bounded to 5 seconds. Every
    /// failure is swallowed to `false`.
    pub async fn check_health(&self) -> bool {
        let probe = self.http.get(self.health_endpoint()).send();
        match tokio::time::timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS), probe).await {
            Ok(Ok(response)) => response.status().is_success(),
            Ok(Err(err)) => {
                debug!(error = %err, "health check failed");
                false
            }
            Err(_) => {
                debug!("health check timed out");
                false
            }
        }
    }

    async fn send_bearer(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<Response, reqwest::Error> {
        let mut request = self
            .http
            .request(method, self.endpoint(path))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }
}

/// Parse a 2xx response body. An empty body deserializes as JSON `null`
/// (covers 204-style responses for `()`-shaped targets).
async fn parse_json<T: DeserializeOwned>(response: Response) -> Option<T> {
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to read response body");
            return None;
        }
    };

    if bytes.is_empty() {
        return serde_json::from_value(Value::Null).ok();
    }

    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, "failed to parse response body");
            None
        }
    }
}
