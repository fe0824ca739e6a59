//! Service directory lookups
//!
//! Maps an app and a service id (or name) to the data API path the service
//! is published under, and fetches app metadata.

use std::sync::Arc;

use odp_session_core::{TokenSupplier, Transport};
use odp_session_domain::constants::{
    DATA_API_PREFIX, SERVICE_LOOKUP_COUNT, SERVICE_LOOKUP_SELECT,
};
use odp_session_domain::{Endpoints, TransportRequest, TransportResponse};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::errors::ApiError;

#[derive(Clone)]
pub struct ServiceDirectory {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenSupplier>,
    endpoints: Endpoints,
}

impl ServiceDirectory {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenSupplier>,
        endpoints: Endpoints,
    ) -> Self {
        Self { transport, tokens, endpoints }
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub fn tokens(&self) -> Arc<dyn TokenSupplier> {
        Arc::clone(&self.tokens)
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Data API path for a service, e.g. `/api/c/Adam/orders`.
    ///
    /// # Errors
    /// - [`ApiError::NotFound`] when no service matches
    /// - [`ApiError::InvalidResponse`] when the record lacks `app` or `api`
    /// - status-derived errors for non-200 answers
    #[instrument(skip(self))]
    pub async fn resolve(&self, app: &str, service: &str) -> Result<String, ApiError> {
        let record = self.describe(app, service, None).await?;
        let field = |name: &str| {
            record.get(name).and_then(Value::as_str).map(str::to_string).ok_or_else(|| {
                ApiError::InvalidResponse(format!("service record for {service} has no {name}"))
            })
        };
        let path = format!("{DATA_API_PREFIX}{}{}", field("app")?, field("api")?);
        debug!(%path, "service resolved");
        Ok(path)
    }

    /// First service record matching `service` by id or name within `app`.
    ///
    /// # Errors
    /// Same as [`ServiceDirectory::resolve`], except for missing fields.
    #[instrument(skip(self))]
    pub async fn describe(
        &self,
        app: &str,
        service: &str,
        select: Option<&str>,
    ) -> Result<Value, ApiError> {
        let request = TransportRequest::get(self.endpoints.service_directory())
            .query("select", select.unwrap_or(SERVICE_LOOKUP_SELECT))
            .query("count", SERVICE_LOOKUP_COUNT.to_string())
            .query("filter", lookup_filter(app, service).to_string());

        let response = self.execute(request).await?;
        match response.body {
            Value::Array(records) => records.into_iter().next().ok_or_else(|| {
                ApiError::NotFound(format!("service {service} not found in app {app}"))
            }),
            other => {
                Err(ApiError::InvalidResponse(format!("expected a list of services, got {other}")))
            }
        }
    }

    /// App metadata from the RBAC service.
    ///
    /// # Errors
    /// Status-derived errors for non-200 answers.
    #[instrument(skip(self))]
    pub async fn app_details(&self, app: &str, select: Option<&str>) -> Result<Value, ApiError> {
        let mut request = TransportRequest::get(self.endpoints.app(app));
        if let Some(select) = select {
            request = request.query("select", select);
        }
        Ok(self.execute(request).await?.body)
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, ApiError> {
        let token = self
            .tokens
            .current_token()
            .ok_or_else(|| ApiError::Auth("no session token available".into()))?;
        let response = self.transport.send(request.jwt(&token)).await?;
        if !response.is_ok() {
            return Err(ApiError::from_status(response.status, &response.body));
        }
        Ok(response)
    }
}

fn lookup_filter(app: &str, service: &str) -> Value {
    json!({ "$and": [{ "app": app }, { "$or": [{ "_id": service }, { "name": service }] }] })
}
