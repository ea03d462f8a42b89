//! # Connection Probe
//!
//! Decides whether the backing store is reachable and records the answer in
//! the shared connected flag.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::observability::Event;
use crate::store::{BackingStore, SelectQuery};

/// Session-wide connected flag.
///
/// Clones share the same flag. Readers can either sample it with
/// [`ConnectionState::is_connected`] or await changes through
/// [`ConnectionState::watch`].
#[derive(Debug, Clone)]
pub struct ConnectionState {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionState {
    /// Start disconnected
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.sender.borrow()
    }

    /// Record the latest reachability result
    pub fn set(&self, connected: bool) {
        self.sender.send_replace(connected);
    }

    /// Receiver notified on every change of the flag
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

/// A single bounded read against a known-safe table
#[derive(Debug, Clone)]
pub struct ConnectionProbe {
    table: String,
    limit: usize,
    timeout: Duration,
}

impl ConnectionProbe {
    pub fn new(table: impl Into<String>, limit: usize, timeout: Duration) -> Self {
        Self {
            table: table.into(),
            limit: limit.max(1),
            timeout,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Run the probe once and store the result in `state`.
    ///
    /// Never fails: unavailability, a missing table and a timeout all record
    /// `false`. There is no retry; call again to re-probe.
    pub async fn run(&self, store: &dyn BackingStore, state: &ConnectionState) -> bool {
        let query = SelectQuery::new(&self.table).limit(self.limit);

        let connected = match tokio::time::timeout(self.timeout, store.select(query)).await {
            Ok(Ok(_)) => {
                tracing::info!(event = %Event::ProbeSucceeded, table = %self.table, "backing store reachable");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(event = %Event::ProbeFailed, table = %self.table, error = %e, "probe read failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    event = %Event::ProbeFailed,
                    table = %self.table,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "probe read timed out"
                );
                false
            }
        };

        state.set(connected);
        connected
    }
}
