//! Row images and identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A table row as stored: a JSON object
pub type Row = Value;

/// Primary key of a row, normalized to text.
///
/// Tables key rows either by UUID string or by auto-incrementing integer;
/// both compare through their textual form so `7` and `"7"` name the same
/// row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Extract the `id` column of a row image
    pub fn of(row: &Row) -> Option<Self> {
        row.get("id").and_then(Self::from_value)
    }

    /// Interpret a JSON scalar as an id
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
