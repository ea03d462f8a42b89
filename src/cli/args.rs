//! CLI argument definitions using clap
//!
//! Commands:
//! - medcatalog serve [--config <path>] [--port <port>]
//! - medcatalog check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// medcatalog - medical equipment catalog API with live sync
#[derive(Parser, Debug)]
#[command(name = "medcatalog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file; built-in defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Load and validate a configuration file, then print it
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./medcatalog.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
