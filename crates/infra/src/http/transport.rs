//! Reqwest-backed implementation of the [`Transport`] port

use async_trait::async_trait;
use odp_session_core::Transport;
use odp_session_domain::{
    HttpConfig, HttpMethod, Result, SessionError, TransportRequest, TransportResponse,
};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, instrument};

use super::client::HttpClient;
use crate::errors::InfraError;

/// Sends [`TransportRequest`]s through the workspace [`HttpClient`].
///
/// Bodies are decoded as JSON where possible; anything else comes back as a
/// JSON string, and an empty body as `null`.
#[derive(Clone)]
pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Returns [`SessionError::Config`] or [`SessionError::Transport`] if the
    /// underlying client cannot be built.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Ok(Self::new(HttpClient::from_config(config)?))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method))]
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = self.client.request(to_reqwest_method(request.method), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = self.client.send(builder).await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|err| {
            let infra: InfraError = err.into();
            SessionError::from(infra)
        })?;

        debug!(status, bytes = bytes.len(), "transport exchange complete");
        Ok(TransportResponse::new(status, decode_body(&bytes)))
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
