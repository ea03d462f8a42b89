//! # WebSocket Protocol
//!
//! JSON messages exchanged on `/realtime/ws`. Every message is an object
//! tagged by `type`.

use serde::{Deserialize, Serialize};

use super::errors::RealtimeError;
use super::event::ChangeEvent;
use crate::store::tables;

/// Tables anyone may subscribe to
pub const PUBLIC_TABLES: &[&str] = &[tables::PRODUCTS, tables::CATEGORIES];

/// Tables that need an admin session
pub const ADMIN_TABLES: &[&str] = &[
    tables::CONTACT_MESSAGES,
    tables::PROFILES,
    tables::WEBSITE_SETTINGS,
    tables::INVENTORY_HISTORY,
];

/// Access level a table requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAccess {
    Public,
    Admin,
}

/// Classify `table`, rejecting anything outside the catalog
pub fn table_access(table: &str) -> Result<TableAccess, RealtimeError> {
    if PUBLIC_TABLES.contains(&table) {
        Ok(TableAccess::Public)
    } else if ADMIN_TABLES.contains(&table) {
        Ok(TableAccess::Admin)
    } else {
        Err(RealtimeError::UnknownTable(table.to_string()))
    }
}

/// WebSocket message from client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { table: String },
    Unsubscribe { table: String },
    Auth { token: String },
    Ping,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, RealtimeError> {
        serde_json::from_str(text).map_err(|e| RealtimeError::InvalidMessage(e.to_string()))
    }
}

/// WebSocket message to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Channel is open
    Subscribed { table: String, channel: String },

    /// Channel is closed
    Unsubscribed { table: String },

    /// Not connected to the store, or the channel could not be opened
    Unavailable { table: String },

    /// A row changed
    Change { table: String, event: ChangeEvent },

    Authenticated { user_id: String, role: String },

    Pong { server_time: i64 },

    Error { message: String, code: String },
}

impl ServerMessage {
    pub fn error(err: &RealtimeError) -> Self {
        ServerMessage::Error {
            message: err.to_string(),
            code: err.code().to_string(),
        }
    }

    pub fn pong() -> Self {
        ServerMessage::Pong {
            server_time: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","message":"serialization failed","code":"INTERNAL"}"#.to_string()
        })
    }
}
