//! Escalation controller
//!
//! Turns a 401 from either scheduler into a single re-login. Each
//! scheduler generation gets a controller stamped with its epoch; reports
//! from a superseded generation are ignored.

use std::sync::Weak;

use odp_session_domain::SchedulerKind;
use tracing::debug;

use super::authenticator::{Authenticator, SessionInner};

#[derive(Clone)]
pub struct EscalationController {
    session: Weak<SessionInner>,
    epoch: u64,
}

impl EscalationController {
    pub(crate) fn new(session: Weak<SessionInner>, epoch: u64) -> Self {
        Self { session, epoch }
    }

    /// Generation this controller reports for.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Hand a 401 to the authenticator without waiting for the re-login.
    ///
    /// The re-login runs on its own task so that the reporting scheduler can
    /// exit immediately.
    pub fn on_unauthorized(&self, origin: SchedulerKind) {
        let Some(inner) = self.session.upgrade() else {
            debug!(%origin, "session already dropped; ignoring 401");
            return;
        };
        let epoch = self.epoch;
        tokio::spawn(async move {
            Authenticator::from_inner(inner).escalate(origin, epoch).await;
        });
    }
}
