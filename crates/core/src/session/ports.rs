//! Port interfaces for the session keeper
//!
//! These traits define the boundaries between the session lifecycle and
//! the infrastructure that carries requests, stores tokens and consumes
//! lifecycle events.

use async_trait::async_trait;
use odp_session_domain::{
    Result, SchedulerKind, SessionData, SessionError, TransportRequest, TransportResponse,
};

/// Performs a single HTTP exchange
///
/// Implementations return `Ok` for every completed exchange regardless of
/// status code; `Err(SessionError::Transport)` means no response was obtained.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// Read-only access to the current bearer token
///
/// Used by request collaborators that must never block on session
/// maintenance.
pub trait TokenSupplier: Send + Sync {
    /// Latest known token, or `None` before the first successful login
    fn current_token(&self) -> Option<String>;
}

/// Durable cache for the bearer token between process runs
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load a previously saved token
    async fn load(&self) -> Result<Option<String>>;

    /// Persist the current token, replacing any previous one
    async fn save(&self, token: &str) -> Result<()>;

    /// Remove the stored token
    async fn clear(&self) -> Result<()>;
}

/// Lifecycle notifications
///
/// Hooks run on the task that produced the event and must not block.
pub trait SessionObserver: Send + Sync {
    /// A login (explicit, resumed or escalated) succeeded
    fn on_session_established(&self, _session: &SessionData) {}

    /// Re-login after a 401 failed; maintenance has stopped
    fn on_session_lost(&self, _error: &SessionError) {}

    /// A maintenance call failed without invalidating the session
    fn on_maintenance_failure(&self, _kind: SchedulerKind, _error: &SessionError) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
