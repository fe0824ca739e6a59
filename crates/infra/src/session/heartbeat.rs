//! Heartbeat scheduler
//!
//! Beats once immediately, then every `rbacHbInterval` seconds minus one.

use odp_session_core::HeartbeatPlan;
use odp_session_domain::{HttpMethod, SchedulerKind, SchedulerPhase, TransportRequest};
use serde_json::json;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::handle::{PhaseCell, SchedulerHandle};
use super::maintenance::{Flow, MaintenanceContext};

/// Spawn a heartbeat scheduler for the current generation.
pub(crate) fn start(ctx: MaintenanceContext, plan: HeartbeatPlan) -> SchedulerHandle {
    let cancel = CancellationToken::new();
    let phase = PhaseCell::new();
    let task = tokio::spawn(run(ctx, plan, cancel.clone(), phase.clone()));
    SchedulerHandle::new(SchedulerKind::Heartbeat, cancel, phase, task)
}

#[instrument(name = "heartbeat_scheduler", skip_all, fields(epoch = ctx.escalation.epoch()))]
async fn run(
    ctx: MaintenanceContext,
    plan: HeartbeatPlan,
    cancel: CancellationToken,
    phase: PhaseCell,
) {
    info!(interval_ms = plan.interval.as_millis(), "heartbeat scheduler started");
    phase.set(SchedulerPhase::Immediate);

    // first tick completes immediately
    let mut ticker = interval(plan.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                phase.set(SchedulerPhase::Cancelled);
                debug!("heartbeat scheduler cancelled");
                return;
            }
            _ = ticker.tick() => {}
        }

        if !beat(&ctx, &plan, &cancel).await.keep_going(&phase) {
            return;
        }
        phase.set(SchedulerPhase::Recurring);
    }
}

async fn beat(ctx: &MaintenanceContext, plan: &HeartbeatPlan, cancel: &CancellationToken) -> Flow {
    let snapshot = ctx.state.snapshot();
    let Some(token) = snapshot.token() else {
        warn!("no token for heartbeat; skipping tick");
        return Flow::Continue;
    };
    let session_id = snapshot.session_id.as_deref().unwrap_or(&plan.session_id);

    let request = TransportRequest::new(HttpMethod::Put, ctx.endpoints.heartbeat())
        .jwt(token)
        .json(json!({ "uuid": session_id }));

    debug!("sending heartbeat");
    ctx.exchange(SchedulerKind::Heartbeat, cancel, request).await
}
