//! Service constants
//!
//! Endpoint paths, header names and the safety margins applied to
//! server-declared timings.

// RBAC endpoints (relative to the configured host)
pub const LOGIN_PATH: &str = "/api/a/rbac/login";
pub const REFRESH_PATH: &str = "/api/a/rbac/refresh";
pub const HEARTBEAT_PATH: &str = "/api/a/rbac/usr/hb";
pub const CHECK_PATH: &str = "/api/a/rbac/check";
pub const APP_PATH_PREFIX: &str = "/api/a/rbac/app/";

// Service manager endpoints
pub const SERVICE_DIRECTORY_PATH: &str = "/api/a/sm/service";
pub const DATA_API_PREFIX: &str = "/api/c/";
pub const SERVICE_LOOKUP_SELECT: &str = "_id,api,app";
pub const SERVICE_LOOKUP_COUNT: u32 = 2;

// Headers
pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const AUTH_SCHEME: &str = "JWT";
pub const REFRESH_TOKEN_HEADER: &str = "rToken";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

// Refresh is scheduled this long before the declared expiry
pub const REFRESH_MARGIN_MS: i64 = 300_000;
// Subtracted from the nominal token lifetime to size the recurring refresh
pub const REFRESH_INTERVAL_MARGIN_SECS: u64 = 300;
// Subtracted from the server heartbeat cadence
pub const HEARTBEAT_MARGIN_MS: u64 = 1_000;
// Longest server-declared cadence a scheduler accepts (365 days)
pub const MAX_SCHEDULE_INTERVAL_SECS: u64 = 31_536_000;

// Durable token cache
pub const DEFAULT_TOKEN_FILE: &str = "TOKEN";
