//! Refresh scheduler
//!
//! Waits until five minutes before the declared expiry, refreshes once,
//! then refreshes on a fixed interval derived from the token lifetime.

use odp_session_core::RefreshPlan;
use odp_session_domain::{SchedulerKind, SchedulerPhase, TransportRequest};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::handle::{PhaseCell, SchedulerHandle};
use super::maintenance::{Flow, MaintenanceContext};

/// Spawn a refresh scheduler for the current generation.
pub(crate) fn start(ctx: MaintenanceContext, plan: RefreshPlan) -> SchedulerHandle {
    let cancel = CancellationToken::new();
    let phase = PhaseCell::new();
    let task = tokio::spawn(run(ctx, plan, cancel.clone(), phase.clone()));
    SchedulerHandle::new(SchedulerKind::Refresh, cancel, phase, task)
}

#[instrument(name = "refresh_scheduler", skip_all, fields(epoch = ctx.escalation.epoch()))]
async fn run(
    ctx: MaintenanceContext,
    plan: RefreshPlan,
    cancel: CancellationToken,
    phase: PhaseCell,
) {
    info!(
        first_delay_ms = plan.first_delay.as_millis(),
        interval_ms = plan.interval.as_millis(),
        "refresh scheduler started"
    );
    phase.set(plan.initial_phase());

    if !plan.first_delay.is_zero() {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                phase.set(SchedulerPhase::Cancelled);
                debug!("refresh cancelled during first wait");
                return;
            }
            () = sleep(plan.first_delay) => {}
        }
    }

    let first_fire = Instant::now();
    if !refresh_once(&ctx, &cancel).await.keep_going(&phase) {
        return;
    }
    phase.set(SchedulerPhase::Recurring);

    let Some(second_fire) = first_fire.checked_add(plan.interval) else {
        error!(interval_ms = plan.interval.as_millis(), "refresh interval cannot be scheduled");
        phase.set(SchedulerPhase::Stopped);
        return;
    };
    let mut ticker = interval_at(second_fire, plan.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                phase.set(SchedulerPhase::Cancelled);
                debug!("refresh scheduler cancelled");
                return;
            }
            _ = ticker.tick() => {}
        }

        if !refresh_once(&ctx, &cancel).await.keep_going(&phase) {
            return;
        }
    }
}

async fn refresh_once(ctx: &MaintenanceContext, cancel: &CancellationToken) -> Flow {
    let snapshot = ctx.state.snapshot();
    let Some(token) = snapshot.token() else {
        warn!("no token to refresh; skipping tick");
        return Flow::Continue;
    };

    let mut request = TransportRequest::get(ctx.endpoints.refresh()).jwt(token);
    if let Some(refresh_token) = snapshot.refresh_token.as_deref() {
        request = request.refresh_token(refresh_token);
    }

    debug!("refreshing token");
    ctx.exchange(SchedulerKind::Refresh, cancel, request).await
}
