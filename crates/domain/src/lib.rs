//! # ODP Session Domain
//!
//! Domain types for the ODP session keeper.
//!
//! This crate contains:
//! - The session record returned by the RBAC service and its merge rules
//! - Credentials and transport-level request/response shapes
//! - Domain error types and Result definitions
//! - Configuration structures and endpoint constants
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
