//! Background maintenance scheduler labels

use serde::{Deserialize, Serialize};

use crate::impl_label_conversions;

/// The two maintenance activities a session runs in the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    Refresh,
    Heartbeat,
}

impl_label_conversions!(SchedulerKind {
    Refresh => "refresh",
    Heartbeat => "heartbeat",
});

/// Lifecycle of a single scheduler task.
///
/// `FirstWait` and `Immediate` only occur for the refresh scheduler;
/// heartbeats start directly in `Recurring`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerPhase {
    /// Not yet started
    Idle,
    /// Sleeping until the first refresh is due
    FirstWait,
    /// First refresh is overdue and fires without waiting
    Immediate,
    /// Firing on a fixed interval
    Recurring,
    /// Exited on its own after escalating a 401
    Stopped,
    /// Cancelled by its owner
    Cancelled,
}

impl_label_conversions!(SchedulerPhase {
    Idle => "idle",
    FirstWait => "firstwait",
    Immediate => "immediate",
    Recurring => "recurring",
    Stopped => "stopped",
    Cancelled => "cancelled",
});

impl SchedulerPhase {
    /// Whether the task may still fire.
    pub fn is_live(self) -> bool {
        matches!(self, Self::FirstWait | Self::Immediate | Self::Recurring)
    }
}
