//! Configuration loader
//!
//! Loads session configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `ODP_HOST`: Base URL of the ODP deployment (required)
//! - `ODP_USERNAME`: Bot or user name (required)
//! - `ODP_PASSWORD`: Password (required)
//! - `ODP_HTTP_TIMEOUT`: Request timeout in seconds
//! - `ODP_HTTP_MAX_ATTEMPTS`: Total attempts per request
//! - `ODP_TOKEN_PATH`: Location of the durable token cache
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./odp.json` or `./odp.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names in the parent directory
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use odp_session_domain::{HttpConfig, Result, SessionConfig, SessionError};

const CONFIG_FILE_NAMES: [&str; 4] = ["odp.json", "odp.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file. The
/// result is validated either way.
///
/// # Errors
/// Returns `SessionError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing or fail validation
pub fn load() -> Result<SessionConfig> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// `ODP_HOST`, `ODP_USERNAME` and `ODP_PASSWORD` must be present; the
/// remaining variables fall back to defaults.
///
/// # Errors
/// Returns `SessionError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<SessionConfig> {
    let mut config = SessionConfig::new(
        env_var("ODP_HOST")?,
        env_var("ODP_USERNAME")?,
        env_var("ODP_PASSWORD")?,
    );

    let defaults = HttpConfig::default();
    config.http.timeout_seconds =
        env_parse("ODP_HTTP_TIMEOUT", "timeout")?.unwrap_or(defaults.timeout_seconds);
    config.http.max_attempts =
        env_parse("ODP_HTTP_MAX_ATTEMPTS", "attempt count")?.unwrap_or(defaults.max_attempts);
    if let Ok(path) = std::env::var("ODP_TOKEN_PATH") {
        config.token_store_path = path;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SessionError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<SessionConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SessionError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SessionError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SessionError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<SessionConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SessionError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SessionError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SessionError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its parent, and the directory
/// of the running executable for `odp.{json,toml}` and
/// `config.{json,toml}`.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        roots.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| SessionError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional numeric environment variable
fn env_parse<T>(key: &str, what: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SessionError::Config(format!("Invalid {what} in {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ODP_VARS: [&str; 6] = [
        "ODP_HOST",
        "ODP_USERNAME",
        "ODP_PASSWORD",
        "ODP_HTTP_TIMEOUT",
        "ODP_HTTP_MAX_ATTEMPTS",
        "ODP_TOKEN_PATH",
    ];

    fn clear_env() {
        for key in ODP_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("ODP_HOST", "https://odp.example.com");
        std::env::set_var("ODP_USERNAME", "bot");
        std::env::set_var("ODP_PASSWORD", "secret");
        std::env::set_var("ODP_HTTP_TIMEOUT", "12");
        std::env::set_var("ODP_HTTP_MAX_ATTEMPTS", "3");
        std::env::set_var("ODP_TOKEN_PATH", "/tmp/odp-token");

        let config = load_from_env().expect("config from env");
        assert_eq!(config.host, "https://odp.example.com");
        assert_eq!(config.username, "bot");
        assert_eq!(config.password, "secret");
        assert_eq!(config.http.timeout_seconds, 12);
        assert_eq!(config.http.max_attempts, 3);
        assert_eq!(config.token_store_path, "/tmp/odp-token");

        clear_env();
    }

    #[test]
    fn test_load_from_env_defaults_optional_vars() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("ODP_HOST", "https://odp.example.com");
        std::env::set_var("ODP_USERNAME", "bot");
        std::env::set_var("ODP_PASSWORD", "secret");

        let config = load_from_env().expect("config from env");
        assert_eq!(config.http, HttpConfig::default());
        assert_eq!(config.token_store_path, "TOKEN");

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("ODP_HOST", "https://odp.example.com");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, SessionError::Config(ref msg) if msg.contains("ODP_USERNAME")));

        clear_env();
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("ODP_HOST", "https://odp.example.com");
        std::env::set_var("ODP_USERNAME", "bot");
        std::env::set_var("ODP_PASSWORD", "secret");
        std::env::set_var("ODP_HTTP_TIMEOUT", "soon");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, SessionError::Config(ref msg) if msg.contains("ODP_HTTP_TIMEOUT")));

        clear_env();
    }

    #[test]
    fn test_load_from_file_json() {
        let json_content = r#"{
            "host": "https://odp.example.com/",
            "username": "bot",
            "password": "secret",
            "http": { "timeout_seconds": 5 }
        }"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(json_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).expect("config from JSON file");
        assert_eq!(config.http.timeout_seconds, 5);
        assert_eq!(config.http.max_attempts, 1);
        assert_eq!(config.endpoints().login(), "https://odp.example.com/api/a/rbac/login");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/odp.json"))).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_content = r#"
host = "http://localhost:8080"
username = "bot"
password = "secret"
token_store_path = "/var/run/odp/TOKEN"

[http]
max_attempts = 2
"#;

        let config = parse_config(toml_content, &PathBuf::from("odp.toml")).expect("toml");
        assert_eq!(config.host, "http://localhost:8080");
        assert_eq!(config.http.max_attempts, 2);
        assert_eq!(config.token_store_path, "/var/run/odp/TOKEN");
    }

    #[test]
    fn test_parse_config_unsupported_extension() {
        let err = parse_config("host: x", &PathBuf::from("odp.yaml")).unwrap_err();
        assert!(matches!(err, SessionError::Config(ref msg) if msg.contains("yaml")));
    }
}
