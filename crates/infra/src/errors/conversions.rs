//! Conversions from external infrastructure errors into domain errors.

use odp_session_domain::SessionError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SessionError);

impl From<InfraError> for SessionError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SessionError> for InfraError {
    fn from(value: SessionError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoSessionError {
    fn into_session_error(self) -> SessionError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SessionError */
/* -------------------------------------------------------------------------- */

impl IntoSessionError for HttpError {
    fn into_session_error(self) -> SessionError {
        if self.is_timeout() {
            return SessionError::Transport("HTTP request timed out".into());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return SessionError::Transport("HTTP connection failure".into());
        }

        if self.is_builder() {
            return SessionError::Config(format!("invalid HTTP request: {self}"));
        }

        if self.is_decode() || self.is_body() {
            return SessionError::Transport(format!("failed to read HTTP body: {self}"));
        }

        SessionError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_session_error())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → SessionError */
/* -------------------------------------------------------------------------- */

impl IntoSessionError for std::io::Error {
    fn into_session_error(self) -> SessionError {
        SessionError::TokenStore(format!("{:?}: {self}", self.kind()))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_session_error())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
