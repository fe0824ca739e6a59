//! Configuration management

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TOKEN_FILE;
use crate::errors::{Result, SessionError};
use crate::types::{Credentials, Endpoints};

/// Session keeper configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Base URL of the ODP deployment, e.g. `https://odp.example.com`
    pub host: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    #[serde(default)]
    pub http: HttpConfig,
    /// Where the durable token cache lives
    #[serde(default = "default_token_store_path")]
    pub token_store_path: String,
}

/// HTTP transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    /// Total attempts per request; 1 disables transport retries
    pub max_attempts: u32,
    pub base_backoff_millis: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_attempts: 1,
            base_backoff_millis: 200,
            user_agent: format!("odp-session/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn default_token_store_path() -> String {
    DEFAULT_TOKEN_FILE.to_string()
}

impl SessionConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            http: HttpConfig::default(),
            token_store_path: default_token_store_path(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::from_host(&self.host)
    }

    /// Reject configurations that cannot possibly log in.
    ///
    /// # Errors
    /// Returns [`SessionError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(SessionError::Config("host must not be empty".into()));
        }
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(SessionError::Config(format!(
                "host must start with http:// or https://, got {host}"
            )));
        }
        if self.username.trim().is_empty() {
            return Err(SessionError::Config("username must not be empty".into()));
        }
        if self.password.is_empty() {
            return Err(SessionError::Config("password must not be empty".into()));
        }
        if self.http.max_attempts == 0 {
            return Err(SessionError::Config("http.max_attempts must be at least 1".into()));
        }
        if self.http.timeout_seconds == 0 {
            return Err(SessionError::Config("http.timeout_seconds must be positive".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("http", &self.http)
            .field("token_store_path", &self.token_store_path)
            .finish()
    }
}
