//! # Change Events
//!
//! Row change notifications delivered on a table channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{RecordId, Row};

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    /// New row inserted
    Insert,
    /// Existing row updated
    Update,
    /// Row deleted
    Delete,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Insert => write!(f, "INSERT"),
            EventType::Update => write!(f, "UPDATE"),
            EventType::Delete => write!(f, "DELETE"),
        }
    }
}

/// Event class a channel listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventFilter {
    Insert,
    Update,
    Delete,
    #[default]
    All,
}

impl EventFilter {
    pub fn accepts(&self, event_type: EventType) -> bool {
        matches!(
            (self, event_type),
            (EventFilter::All, _)
                | (EventFilter::Insert, EventType::Insert)
                | (EventFilter::Update, EventType::Update)
                | (EventFilter::Delete, EventType::Delete)
        )
    }
}

/// A row change on one table.
///
/// INSERT and UPDATE carry `new`; DELETE carries `old`. Consumers must not
/// assume both images are present, and should call [`ChangeEvent::validate`]
/// before reading either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "eventType")]
    pub event_type: EventType,

    /// Table the row belongs to
    pub table: String,

    /// Row image after the change
    #[serde(default)]
    pub new: Option<Row>,

    /// Row image before the change
    #[serde(default)]
    pub old: Option<Row>,

    pub commit_timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Create an INSERT event
    pub fn insert(table: impl Into<String>, row: Row) -> Self {
        Self {
            event_type: EventType::Insert,
            table: table.into(),
            new: Some(row),
            old: None,
            commit_timestamp: Utc::now(),
        }
    }

    /// Create an UPDATE event
    pub fn update(table: impl Into<String>, old: Row, new: Row) -> Self {
        Self {
            event_type: EventType::Update,
            table: table.into(),
            new: Some(new),
            old: Some(old),
            commit_timestamp: Utc::now(),
        }
    }

    /// Create a DELETE event
    pub fn delete(table: impl Into<String>, old: Row) -> Self {
        Self {
            event_type: EventType::Delete,
            table: table.into(),
            new: None,
            old: Some(old),
            commit_timestamp: Utc::now(),
        }
    }

    /// Check that the row image the event type depends on is present and
    /// carries an identifier.
    pub fn validate(&self) -> Result<RecordId, MalformedEvent> {
        let (image, side) = match self.event_type {
            EventType::Insert | EventType::Update => (self.new.as_ref(), "new"),
            EventType::Delete => (self.old.as_ref(), "old"),
        };

        let Some(row) = image else {
            return Err(MalformedEvent::MissingImage {
                event_type: self.event_type,
                side,
            });
        };

        if !row.is_object() {
            return Err(MalformedEvent::NotAnObject { side });
        }

        RecordId::of(row).ok_or(MalformedEvent::MissingId { side })
    }
}

/// Reason a change event was rejected before merge
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedEvent {
    #[error("{event_type} event without `{side}` row image")]
    MissingImage {
        event_type: EventType,
        side: &'static str,
    },

    #[error("`{side}` row image is not an object")]
    NotAnObject { side: &'static str },

    #[error("`{side}` row image has no usable id")]
    MissingId { side: &'static str },
}
