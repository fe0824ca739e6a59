//! Transport-level request and response shapes
//!
//! The session keeper talks to the service only through these two types,
//! so any HTTP stack (or a scripted test double) can sit underneath.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{AUTHORIZATION_HEADER, AUTH_SCHEME, REFRESH_TOKEN_HEADER};
use crate::impl_label_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl_label_conversions!(HttpMethod {
    Get => "get",
    Post => "post",
    Put => "put",
    Delete => "delete",
});

/// A single outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl TransportRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: Vec::new(), query: Vec::new(), body: None }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach `Authorization: JWT <token>`.
    #[must_use]
    pub fn jwt(self, token: &str) -> Self {
        self.header(AUTHORIZATION_HEADER, format!("{AUTH_SCHEME} {token}"))
    }

    /// Attach the `rToken` header used by the refresh endpoint.
    #[must_use]
    pub fn refresh_token(self, refresh_token: &str) -> Self {
        self.header(REFRESH_TOKEN_HEADER, refresh_token)
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status and decoded JSON body of a completed request.
///
/// Non-JSON or empty bodies decode to `Value::Null` (or a string), never to
/// a transport error.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}
