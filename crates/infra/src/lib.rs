//! # ODP Session Infrastructure
//!
//! Infrastructure implementations of the session ports.
//!
//! This crate contains:
//! - The reqwest-backed transport and its retrying HTTP client
//! - The session runtime (login, refresh/heartbeat schedulers, escalation)
//! - The file-backed token store
//! - Configuration loading from the environment or JSON/TOML files
//! - Request collaborators for the service directory and data APIs
//!
//! ## Architecture
//! - Implements traits defined in `odp-session-core`
//! - Depends on `odp-session-domain` and `odp-session-core`
//! - Contains all "impure" code (network, filesystem, timers)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod session;
pub mod token_store;

// Re-export commonly used items
pub use api::{
    ApiError, ApiErrorCategory, ApiResponse, DocumentClient, ListOptions, ServiceDirectory,
};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder, HttpTransport};
pub use session::{Authenticator, AuthenticatorBuilder, MaintenanceStatus, SessionState};
pub use token_store::FileTokenStore;
