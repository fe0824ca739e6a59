//! Request collaborators for the ODP data and service-manager APIs
//!
//! These clients never take part in session maintenance: each call reads
//! the current token from a [`TokenSupplier`](odp_session_core::TokenSupplier)
//! and sends one request.

pub mod directory;
pub mod documents;
pub mod errors;

pub use directory::ServiceDirectory;
pub use documents::{ApiResponse, DocumentClient, ListOptions};
pub use errors::{ApiError, ApiErrorCategory};
