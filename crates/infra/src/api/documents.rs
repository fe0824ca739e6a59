//! Document CRUD client for a data service
//!
//! Thin verb wrapper over one data-service base URL. Every call attaches the
//! current session token and returns the status and body untouched, leaving
//! interpretation to the caller.

use std::sync::Arc;

use odp_session_core::{TokenSupplier, Transport};
use odp_session_domain::constants::{CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE};
use odp_session_domain::{HttpMethod, TransportRequest};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::directory::ServiceDirectory;
use super::errors::ApiError;

/// Status and body of a document call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Paging, projection and filtering for [`DocumentClient::list`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    /// Documents per page; `-1` returns everything
    pub count: Option<i64>,
    /// 1-based page number, ignored when `count` is `-1`
    pub page: Option<u32>,
    /// Comma-separated projection
    pub select: Option<String>,
    /// Sort keys, `-` prefix for descending
    pub sort: Option<String>,
    /// Mongo-style filter document
    pub filter: Option<Value>,
}

impl ListOptions {
    #[must_use]
    pub fn count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    fn apply(&self, mut request: TransportRequest) -> TransportRequest {
        if let Some(select) = &self.select {
            request = request.query("select", select);
        }
        if let Some(sort) = &self.sort {
            request = request.query("sort", sort);
        }
        if let Some(count) = self.count {
            request = request.query("count", count.to_string());
        }
        if let Some(page) = self.page {
            request = request.query("page", page.to_string());
        }
        if let Some(filter) = &self.filter {
            request = request.query("filter", filter.to_string());
        }
        request
    }
}

/// CRUD verbs against one data-service base URL
#[derive(Clone)]
pub struct DocumentClient {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenSupplier>,
    base_url: String,
}

impl DocumentClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenSupplier>,
        base_url: impl Into<String>,
    ) -> Self {
        Self { transport, tokens, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    /// Resolve `service` of `app` through the service directory and bind to
    /// its data API.
    ///
    /// # Errors
    /// Propagates the lookup error from [`ServiceDirectory::resolve`].
    pub async fn for_service(
        directory: &ServiceDirectory,
        app: &str,
        service: &str,
    ) -> Result<Self, ApiError> {
        let api_path = directory.resolve(app, service).await?;
        Ok(Self::new(
            directory.transport(),
            directory.tokens(),
            directory.endpoints().join(&api_path),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Count documents matching `filter`.
    #[instrument(skip(self, filter))]
    pub async fn count(&self, filter: Option<&Value>) -> Result<ApiResponse, ApiError> {
        let mut request = TransportRequest::get(self.document_url("count")?);
        if let Some(filter) = filter {
            request = request.query("filter", filter.to_string());
        }
        self.execute(request).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str, select: Option<&str>) -> Result<ApiResponse, ApiError> {
        let mut request = TransportRequest::get(self.document_url(id)?);
        if let Some(select) = select {
            request = request.query("select", select);
        }
        self.execute(request).await
    }

    #[instrument(skip(self, options))]
    pub async fn list(&self, options: &ListOptions) -> Result<ApiResponse, ApiError> {
        let request = options.apply(TransportRequest::get(self.base_url.clone()));
        self.execute(request).await
    }

    #[instrument(skip(self, document))]
    pub async fn create(&self, document: Value) -> Result<ApiResponse, ApiError> {
        self.execute(TransportRequest::post(self.base_url.clone()).json(document)).await
    }

    #[instrument(skip(self, document))]
    pub async fn update(&self, id: &str, document: Value) -> Result<ApiResponse, ApiError> {
        let request = TransportRequest::new(HttpMethod::Put, self.document_url(id)?).json(document);
        self.execute(request).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<ApiResponse, ApiError> {
        self.execute(TransportRequest::new(HttpMethod::Delete, self.document_url(id)?)).await
    }

    fn document_url(&self, segment: &str) -> Result<String, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Config(format!("invalid data API url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| {
                ApiError::Config(format!("data API url cannot take a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .push(segment);
        Ok(url.into())
    }

    async fn execute(&self, request: TransportRequest) -> Result<ApiResponse, ApiError> {
        let token = self
            .tokens
            .current_token()
            .ok_or_else(|| ApiError::Auth("no session token available".into()))?;
        let request = request.jwt(&token).header(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE);
        let method = request.method;

        let response = self.transport.send(request).await?;
        debug!(%method, status = response.status, "document call complete");
        Ok(ApiResponse { status: response.status, body: response.body })
    }
}
