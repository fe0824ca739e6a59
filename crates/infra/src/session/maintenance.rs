//! Plumbing shared by the refresh and heartbeat schedulers

use std::sync::Arc;

use odp_session_core::{
    classify_maintenance, MaintenanceOutcome, SessionObserver, TokenStore, Transport,
};
use odp_session_domain::{Endpoints, SchedulerKind, SchedulerPhase, SessionData, TransportRequest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::escalation::EscalationController;
use super::handle::PhaseCell;
use super::state::SessionState;

/// What a scheduler does after one maintenance call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    /// 401 handed to the escalation controller
    Escalated,
    Cancelled,
}

impl Flow {
    /// Record the terminal phase, if any; `true` means keep firing.
    pub(crate) fn keep_going(self, phase: &PhaseCell) -> bool {
        match self {
            Self::Continue => true,
            Self::Escalated => {
                phase.set(SchedulerPhase::Stopped);
                false
            }
            Self::Cancelled => {
                phase.set(SchedulerPhase::Cancelled);
                false
            }
        }
    }
}

/// Everything one scheduler generation needs
#[derive(Clone)]
pub(crate) struct MaintenanceContext {
    pub transport: Arc<dyn Transport>,
    pub endpoints: Endpoints,
    pub state: Arc<SessionState>,
    pub observer: Arc<dyn SessionObserver>,
    pub token_store: Option<Arc<dyn TokenStore>>,
    pub escalation: EscalationController,
}

impl MaintenanceContext {
    /// Issue one maintenance call and fold its outcome into the session.
    ///
    /// The call is abandoned if `cancel` fires first, and no outcome of a
    /// cancelled generation is applied.
    pub(crate) async fn exchange(
        &self,
        kind: SchedulerKind,
        cancel: &CancellationToken,
        request: TransportRequest,
    ) -> Flow {
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Flow::Cancelled,
            response = self.transport.send(request) => response,
        };
        if cancel.is_cancelled() {
            debug!(%kind, "discarding result of cancelled scheduler");
            return Flow::Cancelled;
        }

        match classify_maintenance(kind, response) {
            MaintenanceOutcome::Renewed(patch) => self.absorb(kind, cancel, patch).await,
            MaintenanceOutcome::Unauthorized => {
                warn!(%kind, "maintenance call rejected as unauthorized; escalating");
                self.escalation.on_unauthorized(kind);
                Flow::Escalated
            }
            MaintenanceOutcome::Transient(err) => {
                warn!(%kind, error = %err, "maintenance call failed; keeping cadence");
                self.observer.on_maintenance_failure(kind, &err);
                Flow::Continue
            }
        }
    }

    async fn absorb(
        &self,
        kind: SchedulerKind,
        cancel: &CancellationToken,
        patch: SessionData,
    ) -> Flow {
        let previous = self.state.token();
        let renews_token = patch.has_token();
        let Some(merged) = self.state.merge_unless_cancelled(cancel, patch) else {
            debug!(%kind, "discarding result of cancelled scheduler");
            return Flow::Cancelled;
        };
        debug!(%kind, "session data merged");

        if renews_token && merged.token() != previous.as_deref() {
            if let Some(token) = merged.token() {
                persist_token(self.token_store.as_ref(), token).await;
            }
        }
        Flow::Continue
    }
}

/// Save `token` to the durable store, if one is configured.
///
/// Store failures are logged and otherwise ignored.
pub(crate) async fn persist_token(store: Option<&Arc<dyn TokenStore>>, token: &str) {
    let Some(store) = store else {
        return;
    };
    if let Err(err) = store.save(token).await {
        warn!(error = %err, "failed to persist session token");
    }
}
