//! # Real-Time Errors
//!
//! Errors reported to WebSocket clients.

use thiserror::Error;

/// Result type for real-time operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Real-time errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    /// Message could not be parsed
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// Table is not part of the catalog
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Channel could not be opened
    #[error("Realtime unavailable for table: {0}")]
    Unavailable(String),

    /// Table needs an authenticated admin session
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Token was valid but lacks the admin role
    #[error("Not authorized to subscribe to this table")]
    Unauthorized,

    /// Token rejected
    #[error("Authentication error: {0}")]
    AuthError(String),
}

impl RealtimeError {
    /// Stable code sent in `error` messages
    pub fn code(&self) -> &'static str {
        match self {
            RealtimeError::InvalidMessage(_) => "INVALID_MESSAGE",
            RealtimeError::UnknownTable(_) => "UNKNOWN_TABLE",
            RealtimeError::Unavailable(_) => "UNAVAILABLE",
            RealtimeError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            RealtimeError::Unauthorized => "UNAUTHORIZED",
            RealtimeError::AuthError(_) => "AUTH_ERROR",
        }
    }

    /// Returns the close code for WebSocket
    pub fn close_code(&self) -> u16 {
        match self {
            RealtimeError::InvalidMessage(_) => 1003,
            RealtimeError::UnknownTable(_) => 4000,
            RealtimeError::Unavailable(_) => 4503,
            RealtimeError::Unauthorized => 4003,
            RealtimeError::AuthenticationRequired => 4004,
            RealtimeError::AuthError(_) => 4003,
        }
    }
}
