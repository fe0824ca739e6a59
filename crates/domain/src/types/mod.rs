//! Domain types and models

pub mod credentials;
pub mod endpoints;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use credentials::Credentials;
pub use endpoints::Endpoints;
pub use scheduler::{SchedulerKind, SchedulerPhase};
pub use session::SessionData;
pub use transport::{HttpMethod, TransportRequest, TransportResponse};
