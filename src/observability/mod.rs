//! Observability: structured logging.
//!
//! Log lines are emitted with `tracing` macros carrying an `event` field
//! from [`Event`]. [`init_logging`] installs a `tracing-subscriber` with an
//! `EnvFilter` and either compact text or JSON-lines output.

mod events;

pub use events::Event;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact text: timestamp LEVEL target fields message
    Compact,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "compact" | "text" => Some(LogFormat::Compact),
            "json" | "jsonl" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Build the filter from the base level plus overrides for noisy crates.
///
/// `RUST_LOG`, when set, wins over the configured level.
pub fn build_env_filter(level: &str) -> Result<EnvFilter, String> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![level.to_string()];
    for (target, lvl) in [("hyper", "warn"), ("tower_http", "info"), ("h2", "warn")] {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter = directives.join(",");
    EnvFilter::try_new(&filter).map_err(|e| format!("Invalid log filter '{}': {}", filter, e))
}

/// Install the global subscriber.
///
/// Calling this twice is harmless; the second install is ignored.
pub fn init_logging(config: &LoggingConfig) -> Result<(), String> {
    let format = LogFormat::parse(&config.format)
        .ok_or_else(|| format!("Unknown log format: {}", config.format))?;
    let filter = build_env_filter(&config.level)?;

    let layer = match format {
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false)
            .with_filter(filter)
            .boxed(),
    };

    let _ = tracing_subscriber::registry().with(layer).try_init();
    Ok(())
}
