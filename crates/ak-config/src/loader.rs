//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "adminkit.toml",
    "./config/config.toml",
    "/etc/adminkit/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, |key| env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("ADMINKIT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `ADMINKIT_*` overrides read through `lookup`.
///
/// Unparseable numeric or boolean values are ignored.
pub(crate) fn apply_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(port) = lookup("ADMINKIT_HTTP_PORT").and_then(|v| v.parse().ok()) {
        config.http.port = port;
    }
    if let Some(val) = lookup("ADMINKIT_HTTP_HOST") {
        config.http.host = val;
    }
    if let Some(val) = lookup("ADMINKIT_CORS_ORIGINS") {
        config.http.cors_origins = val.split(',').map(|s| s.trim().to_string()).collect();
    }

    // Database
    if let Some(val) = lookup("ADMINKIT_DATABASE_URL") {
        config.database.url = val;
    }
    if let Some(max) = lookup("ADMINKIT_DATABASE_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
        config.database.max_connections = max;
    }

    // Redis
    if let Some(enabled) = lookup("ADMINKIT_REDIS_ENABLED").and_then(|v| v.parse().ok()) {
        config.redis.enabled = enabled;
    }
    if let Some(val) = lookup("ADMINKIT_REDIS_URL") {
        config.redis.url = val;
    }

    // Session
    if let Some(secs) = lookup("ADMINKIT_SESSION_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.session.timeout_secs = secs;
    }
    if let Some(secs) = lookup("ADMINKIT_SESSION_SWEEP_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
        config.session.sweep_interval_secs = secs;
    }

    // Operate log
    if let Some(enabled) = lookup("ADMINKIT_OPERATE_LOG_ENABLED").and_then(|v| v.parse().ok()) {
        config.operate_log.enabled = enabled;
    }
    if let Some(bytes) = lookup("ADMINKIT_OPERATE_LOG_MAX_BODY_BYTES").and_then(|v| v.parse().ok()) {
        config.operate_log.max_request_body_bytes = bytes;
    }

    // General
    if let Some(dev) = lookup("ADMINKIT_DEV_MODE").and_then(|v| v.parse().ok()) {
        config.dev_mode = dev;
    }
}
