//! CLI command implementations
//!
//! `serve` boot order: config, logging, store, admin bootstrap, realtime
//! probe, HTTP listener. Shutdown on Ctrl-C closes every live channel
//! before returning.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::config::AppConfig;
use crate::http_server::{AppState, HttpServer};
use crate::observability::{self, Event};
use crate::store::{BackingStore, MemoryStore};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

const DEFAULT_JWT_SECRET: &str = "CHANGE_THIS_SECRET_IN_PRODUCTION";

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(config.as_deref(), port),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Load `path`, or the defaults when no path is given
pub fn load_config(path: Option<&Path>) -> CliResult<AppConfig> {
    match path {
        Some(path) => Ok(AppConfig::load(path)?),
        None => Ok(AppConfig::default()),
    }
}

/// Validate a configuration file and print it with secrets masked
pub fn check_config(path: &Path) -> CliResult<()> {
    let config = AppConfig::load(path)?;
    let rendered = serde_json::to_string_pretty(&redacted(&config)?)
        .map_err(|e| CliError::Config(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

/// Configuration as JSON with secrets replaced
pub fn redacted(config: &AppConfig) -> CliResult<Value> {
    let mut value = serde_json::to_value(config).map_err(|e| CliError::Config(e.to_string()))?;
    if let Some(auth) = value.get_mut("auth").and_then(Value::as_object_mut) {
        for key in ["jwt_secret", "admin_password"] {
            if auth.get(key).is_some_and(|v| !v.is_null()) {
                auth.insert(key.to_string(), Value::String("********".into()));
            }
        }
    }
    Ok(value)
}

/// Boot and serve until interrupted
pub fn serve(config_path: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    observability::init_logging(&config.logging).map_err(CliError::Logging)?;
    tracing::info!(
        event = %Event::ConfigLoaded,
        path = %config_path.map(|p| p.display().to_string()).unwrap_or_else(|| "<defaults>".into()),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::BootFailed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(run_server(config))
}

async fn run_server(config: AppConfig) -> CliResult<()> {
    tracing::info!(event = %Event::BootStart, version = env!("CARGO_PKG_VERSION"), "booting");

    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("auth.jwt_secret is the built-in default; set a real secret before deploying");
    }

    let store: Arc<dyn BackingStore> = Arc::new(MemoryStore::catalog());
    let state = AppState::new(store, &config);

    if let (Some(email), Some(password)) = (&config.auth.admin_email, &config.auth.admin_password) {
        state
            .auth
            .ensure_admin(email, password)
            .await
            .map_err(|e| CliError::BootFailed(format!("Admin bootstrap failed: {}", e)))?;
    }

    let connected = state.realtime.start().await;
    let realtime = Arc::clone(&state.realtime);
    tracing::info!(event = %Event::BootComplete, realtime = connected, "boot complete");

    let server = HttpServer::new(config.server.clone(), state);
    let served = server.start(shutdown_signal()).await;

    tracing::info!(event = %Event::ShutdownStart, "shutting down");
    realtime.shutdown().await;
    tracing::info!(event = %Event::ShutdownComplete, "shutdown complete");

    served.map_err(|e| CliError::BootFailed(format!("HTTP server failed: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_defaults_without_path() {
        let config = load_config(None).unwrap();
        assert_eq!(config.server.port, 54321);
    }

    #[test]
    fn test_check_config_rejects_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"realtime": {{"probe_limit": 0}}}}"#).unwrap();

        let err = check_config(file.path()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_check_config_accepts_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": {{"port": 9000}}}}"#).unwrap();
        assert!(check_config(file.path()).is_ok());
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut config = AppConfig::default();
        config.auth.admin_email = Some("admin@clinic.org".into());
        config.auth.admin_password = Some("hunter22".into());

        let value = redacted(&config).unwrap();
        assert_eq!(value["auth"]["jwt_secret"], "********");
        assert_eq!(value["auth"]["admin_password"], "********");
        assert_eq!(value["auth"]["admin_email"], "admin@clinic.org");
    }
}
