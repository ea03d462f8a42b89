//! CLI-specific error types
//!
//! Every CLI error is fatal: `main` prints it and exits non-zero.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("MEDCAT_CLI_CONFIG_ERROR: {0}")]
    Config(String),

    #[error("MEDCAT_CLI_LOGGING_ERROR: {0}")]
    Logging(String),

    #[error("MEDCAT_CLI_BOOT_FAILED: {0}")]
    BootFailed(String),
}

impl CliError {
    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        match self {
            CliError::Config(_) => "MEDCAT_CLI_CONFIG_ERROR",
            CliError::Logging(_) => "MEDCAT_CLI_LOGGING_ERROR",
            CliError::BootFailed(_) => "MEDCAT_CLI_BOOT_FAILED",
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
