//! Observable lifecycle events.
//!
//! Every log line the service emits at INFO or above carries an `event`
//! field naming one of these, so log consumers can match on a stable
//! identifier instead of message text.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & Lifecycle
    /// Startup begins
    BootStart,
    /// Startup complete, ready to serve
    BootComplete,
    /// Shutdown initiated
    ShutdownStart,
    /// Shutdown complete
    ShutdownComplete,

    // Configuration
    /// Configuration loaded
    ConfigLoaded,
    /// Bootstrap admin profile created
    AdminBootstrapped,

    // Connection probe
    /// Probe read succeeded
    ProbeSucceeded,
    /// Probe read failed or timed out
    ProbeFailed,

    // Channel registry
    /// Channel opened for a table
    ChannelOpened,
    /// Existing channel closed to make room for a new one
    ChannelReplaced,
    /// Channel closed
    ChannelClosed,
    /// Subscribe refused while disconnected
    SubscriptionUnavailable,
    /// Registry closed every handle
    RegistryTornDown,

    // Change delivery
    /// Change could not be queued for a channel
    ChangeDropped,
    /// Change rejected by a consumer before merge
    ChangeIgnored,

    // Sessions
    /// WebSocket session opened
    SessionOpened,
    /// WebSocket session closed
    SessionClosed,
    /// Sign-in or token check failed
    AuthFailed,

    // Requests
    /// Request handler returned a server error
    RequestFailed,

    // Server
    /// HTTP listener bound
    Serving,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "STARTUP_BEGIN",
            Event::BootComplete => "STARTUP_COMPLETE",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::AdminBootstrapped => "ADMIN_BOOTSTRAPPED",

            Event::ProbeSucceeded => "PROBE_SUCCEEDED",
            Event::ProbeFailed => "PROBE_FAILED",

            Event::ChannelOpened => "CHANNEL_OPENED",
            Event::ChannelReplaced => "CHANNEL_REPLACED",
            Event::ChannelClosed => "CHANNEL_CLOSED",
            Event::SubscriptionUnavailable => "SUBSCRIPTION_UNAVAILABLE",
            Event::RegistryTornDown => "REGISTRY_TORN_DOWN",

            Event::ChangeDropped => "CHANGE_DROPPED",
            Event::ChangeIgnored => "CHANGE_IGNORED",

            Event::SessionOpened => "SESSION_OPENED",
            Event::SessionClosed => "SESSION_CLOSED",
            Event::AuthFailed => "AUTH_FAILED",

            Event::RequestFailed => "REQUEST_FAILED",

            Event::Serving => "SERVING",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
