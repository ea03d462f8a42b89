//! Service configuration.
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a valid
//! configuration for local development.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http_server::HttpServerConfig;
use crate::observability::LogFormat;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub realtime: RealtimeConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.realtime.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "realtime.channel_capacity must be > 0".into(),
            ));
        }
        if self.realtime.probe_table.trim().is_empty() {
            return Err(ConfigError::Invalid("realtime.probe_table must be set".into()));
        }
        if self.realtime.probe_limit == 0 {
            return Err(ConfigError::Invalid("realtime.probe_limit must be > 0".into()));
        }
        if self.realtime.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "realtime.probe_timeout_ms must be > 0".into(),
            ));
        }
        if self.auth.jwt_secret.len() < 16 {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret must be at least 16 bytes".into(),
            ));
        }
        if !(1..=MAX_ACCESS_TOKEN_TTL_MINUTES).contains(&self.auth.access_token_ttl_minutes) {
            return Err(ConfigError::Invalid(format!(
                "auth.access_token_ttl_minutes must be between 1 and {}",
                MAX_ACCESS_TOKEN_TTL_MINUTES
            )));
        }
        if self.auth.admin_email.is_some() != self.auth.admin_password.is_some() {
            return Err(ConfigError::Invalid(
                "auth.admin_email and auth.admin_password must be set together".into(),
            ));
        }
        if LogFormat::parse(&self.logging.format).is_none() {
            return Err(ConfigError::Invalid(format!(
                "logging.format '{}' must be 'compact' or 'json'",
                self.logging.format
            )));
        }
        Ok(())
    }
}

/// Live synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Queued events per channel before changes are dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Table read by the connection probe
    #[serde(default = "default_probe_table")]
    pub probe_table: String,

    /// Row bound of the probe read
    #[serde(default = "default_probe_limit")]
    pub probe_limit: usize,

    /// Probe gives up after this long
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_channel_capacity() -> usize {
    64
}

fn default_probe_table() -> String {
    "categories".to_string()
}

fn default_probe_limit() -> usize {
    1
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            probe_table: default_probe_table(),
            probe_limit: default_probe_limit(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl RealtimeConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_access_token_ttl_minutes")]
    pub access_token_ttl_minutes: i64,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Admin profile created at startup when absent
    #[serde(default)]
    pub admin_email: Option<String>,

    #[serde(default)]
    pub admin_password: Option<String>,
}

fn default_jwt_secret() -> String {
    "CHANGE_THIS_SECRET_IN_PRODUCTION".to_string()
}

/// One year
pub const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

fn default_access_token_ttl_minutes() -> i64 {
    60
}

fn default_issuer() -> String {
    "medcatalog".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_token_ttl_minutes: default_access_token_ttl_minutes(),
            issuer: default_issuer(),
            admin_email: None,
            admin_password: None,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level directive, e.g. "info" or "medcatalog=debug"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "compact" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
