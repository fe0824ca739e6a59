//! Timing rules for session maintenance
//!
//! All delays are derived from server-supplied fields only. The local clock
//! is never consulted, so skew between client and server does not move the
//! refresh point.

use std::time::Duration;

use odp_session_domain::constants::{
    HEARTBEAT_MARGIN_MS, MAX_SCHEDULE_INTERVAL_SECS, REFRESH_INTERVAL_MARGIN_SECS,
    REFRESH_MARGIN_MS,
};
use odp_session_domain::{SchedulerPhase, SessionData};
use thiserror::Error;

/// Reasons a scheduler cannot be planned from the current session record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("session record has no {0}")]
    MissingField(&'static str),

    #[error("{field} of {value}s leaves no positive interval")]
    IntervalTooShort { field: &'static str, value: u64 },

    #[error("{field} of {value}s exceeds the {max}s scheduling limit")]
    IntervalTooLong { field: &'static str, value: u64, max: u64 },
}

fn duration_field(session: &SessionData) -> &'static str {
    if session.is_bot.unwrap_or(false) {
        "rbacBotTokenDuration"
    } else {
        "rbacUserTokenDuration"
    }
}

/// When the refresh scheduler fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPlan {
    /// Wait before the first refresh
    pub first_delay: Duration,
    /// Cadence of every refresh after the first
    pub interval: Duration,
}

impl RefreshPlan {
    /// Plan from a freshly installed session.
    ///
    /// - first delay: `max(0, expiresIn - serverTime - 300000)` ms
    /// - interval: `(duration - 300) * 1000` ms, with the bot duration used
    ///   for bot principals
    ///
    /// # Errors
    /// Returns [`PlanError`] when a timing field is absent, the token
    /// lifetime does not exceed the 300 s margin, or it is longer than
    /// [`MAX_SCHEDULE_INTERVAL_SECS`].
    pub fn from_session(session: &SessionData) -> Result<Self, PlanError> {
        let expires_in = session.expires_in.ok_or(PlanError::MissingField("expiresIn"))?;
        let server_time = session.server_time.ok_or(PlanError::MissingField("serverTime"))?;
        let field = duration_field(session);
        let duration = session.token_duration_seconds().ok_or(PlanError::MissingField(field))?;
        if duration <= REFRESH_INTERVAL_MARGIN_SECS {
            return Err(PlanError::IntervalTooShort { field, value: duration });
        }
        if duration > MAX_SCHEDULE_INTERVAL_SECS {
            return Err(PlanError::IntervalTooLong {
                field,
                value: duration,
                max: MAX_SCHEDULE_INTERVAL_SECS,
            });
        }

        let first_delay_ms =
            expires_in.saturating_sub(server_time).saturating_sub(REFRESH_MARGIN_MS);
        Ok(Self {
            first_delay: Duration::from_millis(u64::try_from(first_delay_ms).unwrap_or(0)),
            interval: Duration::from_secs(duration - REFRESH_INTERVAL_MARGIN_SECS),
        })
    }

    /// Phase the scheduler enters on start.
    pub fn initial_phase(&self) -> SchedulerPhase {
        if self.first_delay.is_zero() {
            SchedulerPhase::Immediate
        } else {
            SchedulerPhase::FirstWait
        }
    }
}

/// When the heartbeat scheduler fires and what it sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatPlan {
    /// Cadence after the immediate first beat
    pub interval: Duration,
    /// Session instance id echoed in every beat
    pub session_id: String,
}

impl HeartbeatPlan {
    /// Plan from a freshly installed session.
    ///
    /// Interval is `rbacHbInterval * 1000 - 1000` ms.
    ///
    /// # Errors
    /// Returns [`PlanError`] when `rbacHbInterval` or `uuid` is absent, or
    /// the interval is one second or less, or longer than
    /// [`MAX_SCHEDULE_INTERVAL_SECS`].
    pub fn from_session(session: &SessionData) -> Result<Self, PlanError> {
        let seconds = session
            .heartbeat_interval_seconds
            .ok_or(PlanError::MissingField("rbacHbInterval"))?;
        if seconds > MAX_SCHEDULE_INTERVAL_SECS {
            return Err(PlanError::IntervalTooLong {
                field: "rbacHbInterval",
                value: seconds,
                max: MAX_SCHEDULE_INTERVAL_SECS,
            });
        }
        let interval_ms = seconds.saturating_mul(1000).saturating_sub(HEARTBEAT_MARGIN_MS);
        if interval_ms == 0 {
            return Err(PlanError::IntervalTooShort { field: "rbacHbInterval", value: seconds });
        }
        let session_id = session
            .session_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(PlanError::MissingField("uuid"))?;

        Ok(Self { interval: Duration::from_millis(interval_ms), session_id })
    }
}
