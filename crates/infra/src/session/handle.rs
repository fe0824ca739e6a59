//! Scheduler handles and per-kind slots

use std::sync::Arc;

use odp_session_domain::{SchedulerKind, SchedulerPhase};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::state::SessionState;

/// Phase shared between a scheduler task and its handle
#[derive(Debug, Clone)]
pub struct PhaseCell(Arc<Mutex<SchedulerPhase>>);

impl PhaseCell {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(SchedulerPhase::Idle)))
    }

    pub fn get(&self) -> SchedulerPhase {
        *self.0.lock()
    }

    pub fn set(&self, phase: SchedulerPhase) {
        *self.0.lock() = phase;
    }

    /// Move to `Cancelled` unless the task already reached a terminal phase.
    fn cancel(&self) {
        let mut phase = self.0.lock();
        if !matches!(*phase, SchedulerPhase::Stopped | SchedulerPhase::Cancelled) {
            *phase = SchedulerPhase::Cancelled;
        }
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellable reference to one running scheduler task
pub struct SchedulerHandle {
    kind: SchedulerKind,
    cancel: CancellationToken,
    phase: PhaseCell,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn new(
        kind: SchedulerKind,
        cancel: CancellationToken,
        phase: PhaseCell,
        task: JoinHandle<()>,
    ) -> Self {
        Self { kind, cancel, phase, task }
    }

    /// Recorded phase, or `Stopped` once the task has exited without
    /// reaching a terminal phase.
    pub fn phase(&self) -> SchedulerPhase {
        let phase = self.phase.get();
        if phase.is_live() && self.task.is_finished() {
            SchedulerPhase::Stopped
        } else {
            phase
        }
    }

    /// Whether the task may still issue calls.
    pub fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && self.phase().is_live()
    }

    /// Signal the task to stop. The task is not awaited.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.phase.cancel();
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() {
            debug!(kind = %self.kind, "scheduler handle dropped while running; cancelling");
            self.cancel();
        }
    }
}

/// Holds at most one handle for a scheduler kind
#[derive(Default)]
pub struct SchedulerSlot {
    handle: Option<SchedulerHandle>,
}

impl SchedulerSlot {
    /// Cancel the current occupant, then install the handle `start` returns.
    pub fn install(&mut self, state: &SessionState, start: impl FnOnce() -> SchedulerHandle) {
        self.cancel(state);
        self.handle = Some(start());
    }

    /// Cancel and remove the occupant; returns whether there was one.
    ///
    /// The state fence guarantees no merge from the old task lands after
    /// this returns.
    pub fn cancel(&mut self, state: &SessionState) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.cancel();
                state.fence();
                true
            }
            None => false,
        }
    }

    pub fn phase(&self) -> Option<SchedulerPhase> {
        self.handle.as_ref().map(SchedulerHandle::phase)
    }

    pub fn is_live(&self) -> bool {
        self.handle.as_ref().is_some_and(SchedulerHandle::is_live)
    }
}
