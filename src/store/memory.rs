//! # In-Process Store
//!
//! A [`BackingStore`] that keeps tables in memory and fans row changes out
//! to open channels.
//!
//! Delivery to channels is best-effort: each channel has a bounded queue and
//! an event that does not fit is dropped for that channel only. There is no
//! replay.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::client::{BackingStore, ChangeStream, ChannelId, SelectQuery, SortOrder};
use super::errors::{StoreError, StoreResult};
use super::row::{RecordId, Row};
use super::tables;
use crate::observability::Event;
use crate::realtime::{ChangeEvent, EventFilter};

/// How a table assigns primary keys to inserted rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    /// Random UUID v4 string
    Uuid,
    /// Auto-incrementing integer starting at 1
    Serial,
}

/// Table definition
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub id: IdStrategy,
    /// Columns whose non-null values must be unique
    pub unique: Vec<String>,
}

impl TableLayout {
    pub fn uuid() -> Self {
        Self {
            id: IdStrategy::Uuid,
            unique: Vec::new(),
        }
    }

    pub fn serial() -> Self {
        Self {
            id: IdStrategy::Serial,
            unique: Vec::new(),
        }
    }

    pub fn unique(mut self, column: impl Into<String>) -> Self {
        self.unique.push(column.into());
        self
    }
}

#[derive(Debug)]
struct Table {
    layout: TableLayout,
    rows: Vec<Row>,
    next_serial: i64,
}

impl Table {
    fn new(layout: TableLayout) -> Self {
        Self {
            layout,
            rows: Vec::new(),
            next_serial: 1,
        }
    }

    fn position(&self, id: &RecordId) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| RecordId::of(row).as_ref() == Some(id))
    }

    /// Next serial id not already held by a caller-supplied id
    fn take_serial(&mut self, table: &str) -> StoreResult<i64> {
        loop {
            let n = self.next_serial;
            if n == i64::MAX {
                return Err(StoreError::Internal(format!("serial ids exhausted in {}", table)));
            }
            self.next_serial = n + 1;
            if self.position(&RecordId::from(n)).is_none() {
                return Ok(n);
            }
        }
    }

    /// Check unique columns of `row` against every other row
    fn check_unique(&self, table: &str, row: &Row, skip: Option<usize>) -> StoreResult<()> {
        for column in &self.layout.unique {
            let Some(value) = row.get(column).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = self
                .rows
                .iter()
                .enumerate()
                .any(|(i, other)| Some(i) != skip && other.get(column) == Some(value));
            if clash {
                return Err(StoreError::UniqueViolation {
                    table: table.to_string(),
                    column: column.clone(),
                    value: display_value(value),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Channel {
    table: String,
    filter: EventFilter,
    sender: mpsc::Sender<ChangeEvent>,
}

/// In-memory backing store
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    channels: RwLock<HashMap<ChannelId, Channel>>,
    next_channel: AtomicU64,
    available: AtomicBool,
    latency_ms: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with no tables
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
            next_channel: AtomicU64::new(1),
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Create a store with the catalog tables
    pub fn catalog() -> Self {
        Self::new()
            .with_table(tables::PRODUCTS, TableLayout::uuid().unique("slug"))
            .with_table(tables::CATEGORIES, TableLayout::serial().unique("slug"))
            .with_table(tables::CONTACT_MESSAGES, TableLayout::uuid())
            .with_table(tables::PROFILES, TableLayout::uuid().unique("email"))
            .with_table(tables::WEBSITE_SETTINGS, TableLayout::serial().unique("key"))
            .with_table(tables::INVENTORY_HISTORY, TableLayout::serial())
    }

    /// Register a table
    pub fn with_table(self, name: &str, layout: TableLayout) -> Self {
        if let Ok(mut tables) = self.tables.write() {
            tables.insert(name.to_string(), Table::new(layout));
        }
        self
    }

    /// Simulate losing or regaining connectivity
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    /// Delay every operation by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, AtomicOrdering::SeqCst);
    }

    /// Number of open channels
    pub fn channel_count(&self) -> usize {
        self.channels.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of open channels on one table
    pub fn channel_count_for(&self, table: &str) -> usize {
        self.channels
            .read()
            .map(|c| c.values().filter(|ch| ch.table == table).count())
            .unwrap_or(0)
    }

    async fn round_trip(&self) -> StoreResult<()> {
        let latency = self.latency_ms.load(AtomicOrdering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.available.load(AtomicOrdering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    /// Deliver a change to every open channel on its table
    fn publish(&self, event: ChangeEvent) {
        let mut closed = Vec::new();

        if let Ok(channels) = self.channels.read() {
            for (id, channel) in channels.iter() {
                if channel.table != event.table || !channel.filter.accepts(event.event_type) {
                    continue;
                }
                match channel.sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(
                            event = %Event::ChangeDropped,
                            channel = %id,
                            table = %event.table,
                            "channel queue full, change dropped"
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            if let Ok(mut channels) = self.channels.write() {
                for id in closed {
                    channels.remove(&id);
                }
            }
        }
    }
}

fn lock_poisoned<T>(_: T) -> StoreError {
    StoreError::Internal("lock poisoned".to_string())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn as_object(row: Row) -> StoreResult<Map<String, Value>> {
    match row {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidRow(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn select(&self, query: SelectQuery) -> StoreResult<Vec<Row>> {
        self.round_trip().await?;

        let tables = self.tables.read().map_err(lock_poisoned)?;
        let table = tables
            .get(&query.table)
            .ok_or_else(|| StoreError::TableNotFound(query.table.clone()))?;

        let mut rows: Vec<Row> = table
            .rows
            .iter()
            .filter(|row| query.matches(row))
            .cloned()
            .collect();

        if let Some((column, order)) = &query.order_by {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(column), b.get(column));
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            });
        }

        let rows = rows.into_iter().skip(query.offset);
        Ok(match query.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        })
    }

    async fn get(&self, table: &str, id: &RecordId) -> StoreResult<Option<Row>> {
        self.round_trip().await?;

        let tables = self.tables.read().map_err(lock_poisoned)?;
        let table = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        Ok(table.position(id).map(|i| table.rows[i].clone()))
    }

    async fn insert(&self, table_name: &str, row: Row) -> StoreResult<Row> {
        self.round_trip().await?;
        let mut fields = as_object(row)?;

        let stored = {
            let mut tables = self.tables.write().map_err(lock_poisoned)?;
            let table = tables
                .get_mut(table_name)
                .ok_or_else(|| StoreError::TableNotFound(table_name.to_string()))?;

            let given = fields.get("id").filter(|v| !v.is_null()).cloned();
            match given {
                Some(given) => {
                    let id = RecordId::from_value(&given)
                        .ok_or_else(|| StoreError::InvalidRow("unusable id".to_string()))?;
                    if table.position(&id).is_some() {
                        return Err(StoreError::UniqueViolation {
                            table: table_name.to_string(),
                            column: "id".to_string(),
                            value: id.to_string(),
                        });
                    }
                    if let Ok(n) = id.as_str().parse::<i64>() {
                        table.next_serial = table.next_serial.max(n.saturating_add(1));
                    }
                }
                None => {
                    let id = match table.layout.id {
                        IdStrategy::Uuid => Value::String(Uuid::new_v4().to_string()),
                        IdStrategy::Serial => Value::from(table.take_serial(table_name)?),
                    };
                    fields.insert("id".to_string(), id);
                }
            }

            let timestamp = now();
            fields
                .entry("created_at")
                .or_insert_with(|| timestamp.clone());
            fields.insert("updated_at".to_string(), timestamp);

            let row = Value::Object(fields);
            table.check_unique(table_name, &row, None)?;
            table.rows.push(row.clone());
            row
        };

        self.publish(ChangeEvent::insert(table_name, stored.clone()));
        Ok(stored)
    }

    async fn update(&self, table_name: &str, id: &RecordId, patch: Row) -> StoreResult<Row> {
        self.round_trip().await?;
        let patch = as_object(patch)?;

        let (old, new) = {
            let mut tables = self.tables.write().map_err(lock_poisoned)?;
            let table = tables
                .get_mut(table_name)
                .ok_or_else(|| StoreError::TableNotFound(table_name.to_string()))?;
            let index = table.position(id).ok_or_else(|| StoreError::RowNotFound {
                table: table_name.to_string(),
                id: id.to_string(),
            })?;

            let old = table.rows[index].clone();
            let mut fields = as_object(old.clone())?;
            for (column, value) in patch {
                if column == "id" || column == "created_at" {
                    continue;
                }
                fields.insert(column, value);
            }
            fields.insert("updated_at".to_string(), now());

            let new = Value::Object(fields);
            table.check_unique(table_name, &new, Some(index))?;
            table.rows[index] = new.clone();
            (old, new)
        };

        self.publish(ChangeEvent::update(table_name, old, new.clone()));
        Ok(new)
    }

    async fn delete(&self, table_name: &str, id: &RecordId) -> StoreResult<Row> {
        self.round_trip().await?;

        let old = {
            let mut tables = self.tables.write().map_err(lock_poisoned)?;
            let table = tables
                .get_mut(table_name)
                .ok_or_else(|| StoreError::TableNotFound(table_name.to_string()))?;
            let index = table.position(id).ok_or_else(|| StoreError::RowNotFound {
                table: table_name.to_string(),
                id: id.to_string(),
            })?;
            table.rows.remove(index)
        };

        self.publish(ChangeEvent::delete(table_name, old.clone()));
        Ok(old)
    }

    async fn open_channel(
        &self,
        table: &str,
        filter: EventFilter,
        capacity: usize,
    ) -> StoreResult<ChangeStream> {
        self.round_trip().await?;

        let known = self
            .tables
            .read()
            .map_err(lock_poisoned)?
            .contains_key(table);
        if !known {
            return Err(StoreError::TableNotFound(table.to_string()));
        }

        let id = ChannelId(self.next_channel.fetch_add(1, AtomicOrdering::SeqCst));
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        self.channels.write().map_err(lock_poisoned)?.insert(
            id,
            Channel {
                table: table.to_string(),
                filter,
                sender,
            },
        );

        tracing::debug!(channel = %id, table, ?filter, "store channel opened");
        Ok(ChangeStream::new(id, table, receiver))
    }

    async fn close_channel(&self, id: ChannelId) {
        let removed = self
            .channels
            .write()
            .map(|mut channels| channels.remove(&id).is_some())
            .unwrap_or(false);
        if removed {
            tracing::debug!(channel = %id, "store channel closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::EventType;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_ids_and_timestamps() {
        let store = MemoryStore::catalog();

        let product = store
            .insert("products", json!({"name": "Monitor", "slug": "monitor"}))
            .await
            .unwrap();
        assert!(Uuid::parse_str(product["id"].as_str().unwrap()).is_ok());
        assert!(product["created_at"].is_string());
        assert!(product["updated_at"].is_string());

        let first = store.insert("categories", json!({"name": "A", "slug": "a"})).await.unwrap();
        let second = store.insert("categories", json!({"name": "B", "slug": "b"})).await.unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
    }

    #[tokio::test]
    async fn test_given_text_id_not_reissued() {
        let store = MemoryStore::catalog();

        store
            .insert("categories", json!({"id": "2", "name": "Given", "slug": "given"}))
            .await
            .unwrap();
        let first = store.insert("categories", json!({"name": "A", "slug": "a"})).await.unwrap();
        let second = store.insert("categories", json!({"name": "B", "slug": "b"})).await.unwrap();

        assert_eq!(first["id"], 3);
        assert_eq!(second["id"], 4);
        let given = store.get("categories", &RecordId::from(2)).await.unwrap().unwrap();
        assert_eq!(given["name"], "Given");
    }

    #[tokio::test]
    async fn test_max_serial_id_exhausts_without_overflow() {
        let store = MemoryStore::catalog();

        let top = store
            .insert("categories", json!({"id": i64::MAX, "name": "Top", "slug": "top"}))
            .await
            .unwrap();
        assert_eq!(top["id"], i64::MAX);

        let err = store
            .insert("categories", json!({"name": "Next", "slug": "next"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Internal(_)));
    }

    #[tokio::test]
    async fn test_unique_columns() {
        let store = MemoryStore::catalog();
        store.insert("categories", json!({"name": "A", "slug": "a"})).await.unwrap();

        let err = store
            .insert("categories", json!({"name": "A again", "slug": "a"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { ref column, .. } if column == "slug"));

        let err = store.insert("products", json!({"id": "p1"})).await;
        assert!(err.is_ok());
        let err = store.insert("products", json!({"id": "p1"})).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { ref column, .. } if column == "id"));
    }

    #[tokio::test]
    async fn test_select_filters_orders_and_bounds() {
        let store = MemoryStore::catalog();
        for (name, price) in [("a", 30), ("b", 10), ("c", 20)] {
            store
                .insert("products", json!({"name": name, "price": price, "is_active": true}))
                .await
                .unwrap();
        }
        store
            .insert("products", json!({"name": "hidden", "price": 5, "is_active": false}))
            .await
            .unwrap();

        let rows = store
            .select(
                SelectQuery::new("products")
                    .eq("is_active", true)
                    .order_by("price", SortOrder::Ascending)
                    .limit(2),
            )
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["b", "c"]);

        let rows = store
            .select(SelectQuery::new("products").order_by("price", SortOrder::Descending).offset(1))
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["name"], "c");
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let store = MemoryStore::catalog();
        let row = store
            .insert("products", json!({"id": "p1", "name": "Old", "price": 1}))
            .await
            .unwrap();

        let updated = store
            .update(
                "products",
                &RecordId::from("p1"),
                json!({"name": "New", "id": "hijack", "created_at": "never"}),
            )
            .await
            .unwrap();
        assert_eq!(updated["id"], "p1");
        assert_eq!(updated["name"], "New");
        assert_eq!(updated["price"], 1);
        assert_eq!(updated["created_at"], row["created_at"]);
    }

    #[tokio::test]
    async fn test_missing_rows_and_tables() {
        let store = MemoryStore::catalog();
        let id = RecordId::from("nope");

        assert!(store.get("products", &id).await.unwrap().is_none());
        assert!(matches!(
            store.delete("products", &id).await,
            Err(StoreError::RowNotFound { .. })
        ));
        assert!(matches!(
            store.select(SelectQuery::new("widgets")).await,
            Err(StoreError::TableNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = MemoryStore::catalog();
        store.set_available(false);

        assert_eq!(
            store.select(SelectQuery::new("products")).await.unwrap_err(),
            StoreError::Unavailable
        );
        assert!(store
            .open_channel("products", EventFilter::All, 4)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_channel_receives_changes() {
        let store = MemoryStore::catalog();
        let mut stream = store.open_channel("products", EventFilter::All, 8).await.unwrap();

        store.insert("products", json!({"id": "p1", "name": "A"})).await.unwrap();
        store
            .update("products", &RecordId::from("p1"), json!({"name": "B"}))
            .await
            .unwrap();
        store.delete("products", &RecordId::from("p1")).await.unwrap();
        store.insert("categories", json!({"name": "other"})).await.unwrap();

        let kinds: Vec<_> = [
            stream.recv().await.unwrap(),
            stream.recv().await.unwrap(),
            stream.recv().await.unwrap(),
        ]
        .iter()
        .map(|e| e.event_type)
        .collect();
        assert_eq!(kinds, vec![EventType::Insert, EventType::Update, EventType::Delete]);
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_channel_filter() {
        let store = MemoryStore::catalog();
        let mut deletes = store
            .open_channel("products", EventFilter::Delete, 8)
            .await
            .unwrap();

        store.insert("products", json!({"id": "p1"})).await.unwrap();
        store.delete("products", &RecordId::from("p1")).await.unwrap();

        let event = deletes.recv().await.unwrap();
        assert_eq!(event.event_type, EventType::Delete);
        assert!(deletes.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_full_channel_drops() {
        let store = MemoryStore::catalog();
        let mut stream = store.open_channel("products", EventFilter::All, 1).await.unwrap();

        store.insert("products", json!({"id": "p1"})).await.unwrap();
        store.insert("products", json!({"id": "p2"})).await.unwrap();

        let first = stream.recv().await.unwrap();
        assert_eq!(first.new.unwrap()["id"], "p1");
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_close_channel_ends_stream() {
        let store = MemoryStore::catalog();
        let mut stream = store.open_channel("products", EventFilter::All, 4).await.unwrap();
        assert_eq!(store.channel_count(), 1);

        store.close_channel(stream.id()).await;
        assert_eq!(store.channel_count(), 0);
        assert!(stream.recv().await.is_none());

        // Unknown ids are ignored
        store.close_channel(ChannelId(999)).await;
    }
}
