//! API error types.

use thiserror::Error;

/// Errors raised while constructing or classifying API calls.
///
/// Note that the gateway itself never surfaces these to sync callers; it
/// normalizes every failure into its `Option`/`PublicOutcome` contract.
/// They exist for construction failures and structured logging.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("client error: {0}")]
    Client(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<ApiError> for clockwork_domain::ClockworkError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(msg) => Self::Network(msg),
            ApiError::Auth(msg) => Self::Auth(msg),
            ApiError::Config(msg) => Self::Config(msg),
            ApiError::Client(msg) | ApiError::Server(msg) => Self::Network(msg),
        }
    }
}
