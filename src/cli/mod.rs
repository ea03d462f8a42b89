//! CLI module for medcatalog
//!
//! Provides command-line interface for:
//! - serve: Boot the service and accept HTTP and WebSocket traffic
//! - check-config: Validate a configuration file

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check_config, load_config, redacted, run, run_command, serve};
pub use errors::{CliError, CliResult};
