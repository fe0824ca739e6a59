//! API-specific error types
//!
//! Errors surfaced by the document and service-directory clients. Status
//! codes of document calls are returned to the caller as-is; these errors
//! cover lookups that must interpret the answer and calls that could not be
//! made at all.

use odp_session_domain::SessionError;
use serde_json::Value;
use thiserror::Error;

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// No token, or the server rejected it (401, 403)
    Authentication,
    /// Rate limiting (429)
    RateLimit,
    /// Server errors (5xx) and unusable answers
    Server,
    /// Client errors (4xx except auth), including lookups that found nothing
    Client,
    /// Network/connection errors
    Network,
    /// Configuration errors
    Config,
}

/// API operation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) | Self::InvalidResponse(_) => ApiErrorCategory::Server,
            Self::Client(_) | Self::NotFound(_) => ApiErrorCategory::Client,
            Self::Network(_) => ApiErrorCategory::Network,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Classify a non-success answer.
    pub fn from_status(status: u16, body: &Value) -> Self {
        let message = format!("HTTP {status}: {body}");
        match status {
            401 | 403 => Self::Auth(message),
            404 => Self::NotFound(message),
            429 => Self::RateLimit(message),
            500..=599 => Self::Server(message),
            _ => Self::Client(message),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Transport(msg) => Self::Network(msg),
            SessionError::NotAuthenticated => Self::Auth("no active session".into()),
            SessionError::Auth { status, body } => Self::from_status(status, &body),
            SessionError::Unauthorized { origin } => {
                Self::Auth(format!("{origin} rejected as unauthorized"))
            }
            SessionError::TransientMaintenance { status, body, .. } => {
                Self::from_status(status, &body)
            }
            SessionError::InvalidResponse(msg) => Self::InvalidResponse(msg),
            SessionError::Config(msg) | SessionError::TokenStore(msg) => Self::Config(msg),
        }
    }
}
