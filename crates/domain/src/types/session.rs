//! Session record returned by the RBAC service
//!
//! The login, refresh, check and heartbeat endpoints all answer with a
//! (possibly partial) view of the same record. [`SessionData`] names the
//! fields the session keeper interprets and carries everything else
//! opaquely in [`SessionData::extra`].

use chrono::DateTime;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Result, SessionError};

/// Current credentials and server-declared policy for one session.
///
/// Every field is optional on the wire: a refresh answer typically carries
/// only `token`, `expiresIn` and `serverTime`. Use [`SessionData::merge`] to
/// fold a partial answer into the current record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Bearer credential sent as `Authorization: JWT <token>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Credential exchanged for a new `token` by the refresh endpoint
    #[serde(rename = "rToken", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Server-assigned session instance id, echoed by heartbeats
    #[serde(rename = "uuid", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Server clock at issue time, epoch millis
    #[serde(
        rename = "serverTime",
        default,
        deserialize_with = "de_opt_epoch_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub server_time: Option<i64>,

    /// Absolute expiry of `token`, epoch millis
    #[serde(
        rename = "expiresIn",
        default,
        deserialize_with = "de_opt_epoch_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_in: Option<i64>,

    /// Nominal user token lifetime, seconds
    #[serde(
        rename = "rbacUserTokenDuration",
        default,
        deserialize_with = "de_opt_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_token_duration: Option<u64>,

    /// Nominal bot token lifetime, seconds
    #[serde(
        rename = "rbacBotTokenDuration",
        default,
        deserialize_with = "de_opt_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub bot_token_duration: Option<u64>,

    /// Heartbeat cadence, seconds
    #[serde(
        rename = "rbacHbInterval",
        default,
        deserialize_with = "de_opt_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub heartbeat_interval_seconds: Option<u64>,

    #[serde(rename = "rbacUserToSingleSession", default, skip_serializing_if = "Option::is_none")]
    pub single_session_policy: Option<bool>,

    #[serde(
        rename = "rbacUserCloseWindowToLogout",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub close_window_logout_policy: Option<bool>,

    #[serde(rename = "rbacUserTokenRefresh", default, skip_serializing_if = "Option::is_none")]
    pub token_refresh_policy: Option<bool>,

    #[serde(rename = "bot", default, skip_serializing_if = "Option::is_none")]
    pub is_bot: Option<bool>,

    /// Profile fields the session keeper does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionData {
    /// Decode a response body into a (possibly partial) session record.
    ///
    /// `null` decodes to an empty record so that endpoints answering with no
    /// body merge as a no-op.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidResponse`] for non-object bodies or
    /// fields with unusable types.
    pub fn from_response_body(body: &Value) -> Result<Self> {
        match body {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => Self::deserialize(body)
                .map_err(|e| SessionError::InvalidResponse(format!("session body: {e}"))),
            other => Err(SessionError::InvalidResponse(format!(
                "expected a JSON object, found {}",
                json_kind(other)
            ))),
        }
    }

    /// Field-wise union with `patch`.
    ///
    /// Fields present in `patch` overwrite, absent fields are left alone.
    /// `extra` is unioned key by key at the top level only; nested objects
    /// are replaced, never merged.
    pub fn merge(&mut self, patch: Self) {
        let Self {
            token,
            refresh_token,
            session_id,
            server_time,
            expires_in,
            user_token_duration,
            bot_token_duration,
            heartbeat_interval_seconds,
            single_session_policy,
            close_window_logout_policy,
            token_refresh_policy,
            is_bot,
            extra,
        } = patch;

        overwrite(&mut self.token, token);
        overwrite(&mut self.refresh_token, refresh_token);
        overwrite(&mut self.session_id, session_id);
        overwrite(&mut self.server_time, server_time);
        overwrite(&mut self.expires_in, expires_in);
        overwrite(&mut self.user_token_duration, user_token_duration);
        overwrite(&mut self.bot_token_duration, bot_token_duration);
        overwrite(&mut self.heartbeat_interval_seconds, heartbeat_interval_seconds);
        overwrite(&mut self.single_session_policy, single_session_policy);
        overwrite(&mut self.close_window_logout_policy, close_window_logout_policy);
        overwrite(&mut self.token_refresh_policy, token_refresh_policy);
        overwrite(&mut self.is_bot, is_bot);

        for (key, value) in extra {
            self.extra.insert(key, value);
        }
    }

    /// Current token, treating an empty string as absent.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Heartbeats are required by either the single-session or the
    /// close-window-logout policy.
    pub fn wants_heartbeat(&self) -> bool {
        self.single_session_policy.unwrap_or(false)
            || self.close_window_logout_policy.unwrap_or(false)
    }

    pub fn wants_refresh(&self) -> bool {
        self.token_refresh_policy.unwrap_or(false)
    }

    /// Nominal token lifetime that governs the recurring refresh.
    pub fn token_duration_seconds(&self) -> Option<u64> {
        if self.is_bot.unwrap_or(false) {
            self.bot_token_duration
        } else {
            self.user_token_duration
        }
    }

    /// Principal name, when the server sent one.
    pub fn username(&self) -> Option<&str> {
        self.extra.get("username").and_then(Value::as_str)
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if let Some(value) = value {
        *slot = Some(value);
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse an epoch-millis timestamp given either as digits or RFC 3339.
pub fn parse_epoch_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return Some(millis);
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.timestamp_millis())
}

fn de_opt_epoch_millis<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {n}"))),
        Some(Value::String(s)) => parse_epoch_millis(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("unrecognised timestamp: {s}"))),
        Some(other) => {
            Err(de::Error::custom(format!("expected a timestamp, found {}", json_kind(&other))))
        }
    }
}

fn de_opt_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected non-negative seconds, found {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected seconds, found {s:?}"))),
        Some(other) => {
            Err(de::Error::custom(format!("expected seconds, found {}", json_kind(&other))))
        }
    }
}
