//! # Store Client
//!
//! The narrow interface the application uses to reach the backing store.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::errors::StoreResult;
use super::row::{RecordId, Row};
use crate::realtime::{ChangeEvent, EventFilter};

/// Sort direction for a select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A bounded read against one table
#[derive(Debug, Clone)]
pub struct SelectQuery {
    pub table: String,
    /// Equality predicates, all of which must hold
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
            offset: 0,
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Check a row against the equality predicates
    pub fn matches(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|(column, expected)| row.get(column).map_or(expected.is_null(), |v| v == expected))
    }
}

/// Identifier of an open change channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch-{}", self.0)
    }
}

/// Receiving end of an open change channel.
///
/// The stream ends (`recv` returns `None`) once the store closes the
/// channel.
#[derive(Debug)]
pub struct ChangeStream {
    id: ChannelId,
    table: String,
    receiver: mpsc::Receiver<ChangeEvent>,
}

impl ChangeStream {
    pub fn new(id: ChannelId, table: impl Into<String>, receiver: mpsc::Receiver<ChangeEvent>) -> Self {
        Self {
            id,
            table: table.into(),
            receiver,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Wait for the next change on this channel
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }

    /// Take a change if one is already queued
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Backing store client
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Run a bounded select
    async fn select(&self, query: SelectQuery) -> StoreResult<Vec<Row>>;

    /// Fetch one row by id
    async fn get(&self, table: &str, id: &RecordId) -> StoreResult<Option<Row>>;

    /// Insert a row, returning the stored image with generated columns
    async fn insert(&self, table: &str, row: Row) -> StoreResult<Row>;

    /// Merge `patch` into an existing row, returning the new image
    async fn update(&self, table: &str, id: &RecordId, patch: Row) -> StoreResult<Row>;

    /// Delete a row, returning its last image
    async fn delete(&self, table: &str, id: &RecordId) -> StoreResult<Row>;

    /// Open a change channel on a table with room for `capacity` queued
    /// events
    async fn open_channel(
        &self,
        table: &str,
        filter: EventFilter,
        capacity: usize,
    ) -> StoreResult<ChangeStream>;

    /// Close a change channel. Unknown ids are ignored.
    async fn close_channel(&self, id: ChannelId);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_query_matches() {
        let query = SelectQuery::new("products").eq("is_active", true).eq("category_id", 3);

        assert!(query.matches(&json!({"is_active": true, "category_id": 3})));
        assert!(!query.matches(&json!({"is_active": false, "category_id": 3})));
        assert!(!query.matches(&json!({"is_active": true})));
    }

    #[test]
    fn test_null_filter_matches_missing_column() {
        let query = SelectQuery::new("products").eq("category_id", Value::Null);
        assert!(query.matches(&json!({"name": "x"})));
        assert!(query.matches(&json!({"category_id": null})));
    }

    #[test]
    fn test_channel_id_display() {
        assert_eq!(ChannelId(12).to_string(), "ch-12");
    }
}
