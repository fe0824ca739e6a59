//! Classification of endpoint responses
//!
//! Login failures are fatal to the caller. Maintenance failures split into
//! a 401, which invalidates the session, and everything else, which leaves
//! the cadence untouched.

use odp_session_domain::{Result, SchedulerKind, SessionData, SessionError, TransportResponse};

/// What a refresh or heartbeat exchange means for the session
#[derive(Debug, Clone, PartialEq)]
pub enum MaintenanceOutcome {
    /// 200 with a usable body; fields to merge
    Renewed(SessionData),
    /// 401; the session must be re-established
    Unauthorized,
    /// Anything else; logged and ignored
    Transient(SessionError),
}

/// Interpret a login (or token check) exchange.
///
/// # Errors
/// - [`SessionError::Auth`] for any status other than 200
/// - [`SessionError::InvalidResponse`] for a 200 whose body is not a
///   session record or carries no token
/// - the transport error unchanged when no response was obtained
pub fn classify_login(response: Result<TransportResponse>) -> Result<SessionData> {
    let response = response?;
    if !response.is_ok() {
        return Err(SessionError::Auth { status: response.status, body: response.body });
    }
    let session = SessionData::from_response_body(&response.body)?;
    if !session.has_token() {
        return Err(SessionError::InvalidResponse("login response carries no token".into()));
    }
    Ok(session)
}

/// Interpret a refresh or heartbeat exchange.
pub fn classify_maintenance(
    kind: SchedulerKind,
    response: Result<TransportResponse>,
) -> MaintenanceOutcome {
    let response = match response {
        Ok(response) => response,
        Err(err) => return MaintenanceOutcome::Transient(err),
    };
    if response.is_unauthorized() {
        return MaintenanceOutcome::Unauthorized;
    }
    if !response.is_ok() {
        return MaintenanceOutcome::Transient(SessionError::TransientMaintenance {
            origin: kind,
            status: response.status,
            body: response.body,
        });
    }
    match SessionData::from_response_body(&response.body) {
        Ok(patch) => MaintenanceOutcome::Renewed(patch),
        Err(err) => MaintenanceOutcome::Transient(err),
    }
}
