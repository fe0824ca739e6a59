//! # ODP Session Core
//!
//! Session lifecycle rules with no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the transport, observers, token suppliers
//!   and durable token stores
//! - Pure timing computations for the refresh and heartbeat schedulers
//! - Classification of endpoint responses into session outcomes
//!
//! ## Architecture Principles
//! - Only depends on `odp-session-domain`
//! - No HTTP, timer or filesystem code
//! - All external effects via traits

pub mod session;

pub use session::outcome::{classify_login, classify_maintenance, MaintenanceOutcome};
pub use session::ports::{NoopObserver, SessionObserver, TokenStore, TokenSupplier, Transport};
pub use session::schedule::{HeartbeatPlan, PlanError, RefreshPlan};
