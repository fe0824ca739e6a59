//! Absolute URLs for the RBAC and service manager endpoints

use crate::constants::{
    APP_PATH_PREFIX, CHECK_PATH, DATA_API_PREFIX, HEARTBEAT_PATH, LOGIN_PATH, REFRESH_PATH,
    SERVICE_DIRECTORY_PATH,
};

/// Endpoint set derived from a single host base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    /// Build from a host such as `https://odp.example.com/`.
    ///
    /// Trailing slashes are dropped so paths can be appended verbatim.
    pub fn from_host(host: &str) -> Self {
        Self { base: host.trim().trim_end_matches('/').to_string() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn login(&self) -> String {
        self.join(LOGIN_PATH)
    }

    pub fn refresh(&self) -> String {
        self.join(REFRESH_PATH)
    }

    pub fn heartbeat(&self) -> String {
        self.join(HEARTBEAT_PATH)
    }

    pub fn check(&self) -> String {
        self.join(CHECK_PATH)
    }

    pub fn app(&self, app: &str) -> String {
        format!("{}{APP_PATH_PREFIX}{app}", self.base)
    }

    pub fn service_directory(&self) -> String {
        self.join(SERVICE_DIRECTORY_PATH)
    }

    /// Data API root for a service, e.g. `/api/c/<app><api>`.
    ///
    /// `api` is expected to carry its own leading slash, as the service
    /// manager reports it.
    pub fn data_api(&self, app: &str, api: &str) -> String {
        format!("{}{DATA_API_PREFIX}{app}{api}", self.base)
    }

    /// Append an arbitrary path, inserting a slash if the path lacks one.
    pub fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base)
        } else {
            format!("{}/{path}", self.base)
        }
    }
}
