//! Error types used throughout the session keeper

use serde_json::Value;
use thiserror::Error;

use crate::types::SchedulerKind;

/// Main error type for session operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Login endpoint answered with something other than 200
    #[error("Login rejected with status {status}: {body}")]
    Auth { status: u16, body: Value },

    /// Refresh or heartbeat answered 401
    #[error("{origin} rejected as unauthorized")]
    Unauthorized { origin: SchedulerKind },

    /// Refresh or heartbeat answered a non-200, non-401 status
    #[error("{origin} failed with status {status}")]
    TransientMaintenance { origin: SchedulerKind, status: u16, body: Value },

    /// The request could not be completed at all
    #[error("Transport error: {0}")]
    Transport(String),

    /// A 200 response that cannot be used as session data
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Token store error: {0}")]
    TokenStore(String),
}

impl SessionError {
    /// Whether this error ends a login attempt.
    ///
    /// Transport failures count as authentication failures for login even
    /// though schedulers treat them as transient.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::Transport(_) | Self::InvalidResponse(_))
    }

    /// Whether a scheduler should keep its cadence after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientMaintenance { .. } | Self::Transport(_))
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::TransientMaintenance { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
