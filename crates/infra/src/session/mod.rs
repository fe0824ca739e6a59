//! Session runtime
//!
//! Login, the refresh and heartbeat schedulers, and the escalation path
//! that re-authenticates when either scheduler is told the session is no
//! longer valid.

pub mod authenticator;
pub mod escalation;
pub mod handle;
pub mod heartbeat;
mod maintenance;
pub mod refresh;
pub mod state;

pub use authenticator::{Authenticator, AuthenticatorBuilder, MaintenanceStatus};
pub use escalation::EscalationController;
pub use handle::{PhaseCell, SchedulerHandle, SchedulerSlot};
pub use state::SessionState;
