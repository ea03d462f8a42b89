//! # Channel Registry
//!
//! Maps each table to at most one live change channel.
//!
//! Subscribing to a table that already has a channel closes the old one
//! first. All mutations go through one async mutex, so subscribe and
//! unsubscribe calls on a registry never interleave.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use super::event::{ChangeEvent, EventFilter};
use super::probe::ConnectionState;
use crate::observability::Event;
use crate::store::{BackingStore, ChangeStream, ChannelId};

/// Callback invoked with every change on a channel
pub type ChangeCallback = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Registry key of a table channel: `realtime:<table>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey(String);

impl ChannelKey {
    pub fn for_table(table: &str) -> Self {
        Self(format!("realtime:{}", table))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct HandleInner {
    key: ChannelKey,
    table: String,
    channel: ChannelId,
    closed: AtomicBool,
    delivery: Mutex<Option<JoinHandle<()>>>,
}

/// Reference to an open channel.
///
/// Clones refer to the same channel. Once closed a handle stays closed.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    inner: Arc<HandleInner>,
}

impl SubscriptionHandle {
    fn new(key: ChannelKey, table: &str, channel: ChannelId) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                key,
                table: table.to_string(),
                channel,
                closed: AtomicBool::new(false),
                delivery: Mutex::new(None),
            }),
        }
    }

    pub fn key(&self) -> &ChannelKey {
        &self.inner.key
    }

    pub fn table(&self) -> &str {
        &self.inner.table
    }

    pub fn channel_id(&self) -> ChannelId {
        self.inner.channel
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Whether two handles came from the same subscribe call
    pub fn same_channel(&self, other: &SubscriptionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn attach_delivery(&self, task: JoinHandle<()>) {
        if self.is_closed() {
            task.abort();
            return;
        }
        if let Ok(mut slot) = self.inner.delivery.lock() {
            *slot = Some(task);
        }
    }

    /// Flip to closed and stop callback delivery. Returns whether the
    /// handle was open.
    fn mark_closed(&self) -> bool {
        let was_open = !self.inner.closed.swap(true, Ordering::SeqCst);
        if let Ok(mut slot) = self.inner.delivery.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
        was_open
    }
}

/// Table → channel map for one session
pub struct ChannelRegistry {
    store: Arc<dyn BackingStore>,
    connection: ConnectionState,
    capacity: usize,
    handles: AsyncMutex<HashMap<ChannelKey, SubscriptionHandle>>,
}

impl ChannelRegistry {
    /// Create a registry whose channels hold up to `capacity` queued events
    pub fn new(store: Arc<dyn BackingStore>, connection: ConnectionState, capacity: usize) -> Self {
        Self {
            store,
            connection,
            capacity: capacity.max(1),
            handles: AsyncMutex::new(HashMap::new()),
        }
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    /// Subscribe `callback` to every change on `table`.
    ///
    /// Returns `None` without side effects while disconnected or for an
    /// empty table name. The callback runs on a delivery task for as long as
    /// the handle stays open.
    pub async fn subscribe(&self, table: &str, callback: ChangeCallback) -> Option<SubscriptionHandle> {
        let (handle, mut stream) = self.subscribe_stream(table).await?;

        let task = tokio::spawn(async move {
            while let Some(event) = stream.recv().await {
                callback(event);
            }
        });
        handle.attach_delivery(task);

        Some(handle)
    }

    /// Subscribe to every change on `table`, handing back the bounded stream
    /// instead of driving a callback.
    ///
    /// Same gating and replacement rules as [`ChannelRegistry::subscribe`].
    pub async fn subscribe_stream(&self, table: &str) -> Option<(SubscriptionHandle, ChangeStream)> {
        if table.trim().is_empty() {
            return None;
        }
        if !self.connection.is_connected() {
            tracing::debug!(event = %Event::SubscriptionUnavailable, table, "not connected, subscribe skipped");
            return None;
        }

        let key = ChannelKey::for_table(table);
        let mut handles = self.handles.lock().await;

        if let Some(previous) = handles.remove(&key) {
            self.close(&previous).await;
            tracing::debug!(event = %Event::ChannelReplaced, key = %key, channel = %previous.channel_id(), "previous channel replaced");
        }

        match self.store.open_channel(table, EventFilter::All, self.capacity).await {
            Ok(stream) => {
                let handle = SubscriptionHandle::new(key.clone(), table, stream.id());
                tracing::info!(event = %Event::ChannelOpened, key = %key, channel = %stream.id(), "channel opened");
                handles.insert(key, handle.clone());
                Some((handle, stream))
            }
            Err(e) => {
                tracing::warn!(event = %Event::SubscriptionUnavailable, key = %key, error = %e, "channel open failed");
                if e.is_connectivity() {
                    self.connection.set(false);
                }
                None
            }
        }
    }

    /// Close `handle` and drop it from the registry. Handles this registry
    /// no longer holds (closed, replaced or foreign) are a no-op.
    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let mut handles = self.handles.lock().await;

        let key = handles
            .iter()
            .find(|(_, h)| h.same_channel(handle))
            .map(|(k, _)| k.clone());
        let Some(key) = key else {
            return;
        };

        if let Some(removed) = handles.remove(&key) {
            self.close(&removed).await;
        }
    }

    /// Release a handle from a context that cannot await, such as `Drop`.
    pub fn release_detached(self: &Arc<Self>, handle: SubscriptionHandle) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let registry = Arc::clone(self);
                runtime.spawn(async move {
                    registry.unsubscribe(&handle).await;
                });
            }
            Err(_) => {
                handle.mark_closed();
            }
        }
    }

    /// Close every handle and empty the registry
    pub async fn teardown(&self) {
        let mut handles = self.handles.lock().await;
        let drained: Vec<SubscriptionHandle> = handles.drain().map(|(_, h)| h).collect();

        for handle in &drained {
            self.close(handle).await;
        }
        tracing::info!(event = %Event::RegistryTornDown, closed = drained.len(), "registry torn down");
    }

    /// Number of live channels
    pub async fn len(&self) -> usize {
        self.handles.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether `table` has a live channel
    pub async fn contains(&self, table: &str) -> bool {
        self.handles.lock().await.contains_key(&ChannelKey::for_table(table))
    }

    /// Handle currently registered for `table`
    pub async fn handle_for(&self, table: &str) -> Option<SubscriptionHandle> {
        self.handles.lock().await.get(&ChannelKey::for_table(table)).cloned()
    }

    /// Tables with a live channel, sorted
    pub async fn channels(&self) -> Vec<String> {
        let handles = self.handles.lock().await;
        let mut tables: Vec<String> = handles.values().map(|h| h.table().to_string()).collect();
        tables.sort();
        tables
    }

    async fn close(&self, handle: &SubscriptionHandle) {
        if handle.mark_closed() {
            self.store.close_channel(handle.channel_id()).await;
            tracing::debug!(event = %Event::ChannelClosed, key = %handle.key(), channel = %handle.channel_id(), "channel closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn connected_registry() -> (Arc<MemoryStore>, ChannelRegistry) {
        let store = Arc::new(MemoryStore::catalog());
        let connection = ConnectionState::new();
        connection.set(true);
        let registry = ChannelRegistry::new(store.clone(), connection, 16);
        (store, registry)
    }

    fn noop() -> ChangeCallback {
        Arc::new(|_| {})
    }

    #[test]
    fn test_channel_key_format() {
        assert_eq!(ChannelKey::for_table("products").as_str(), "realtime:products");
    }

    #[tokio::test]
    async fn test_subscribe_registers_handle() {
        let (store, registry) = connected_registry();

        let handle = registry.subscribe("products", noop()).await.unwrap();
        assert_eq!(handle.table(), "products");
        assert_eq!(handle.key().as_str(), "realtime:products");
        assert!(!handle.is_closed());
        assert!(registry.contains("products").await);
        assert_eq!(store.channel_count_for("products"), 1);
    }

    #[tokio::test]
    async fn test_empty_table_rejected() {
        let (store, registry) = connected_registry();
        assert!(registry.subscribe("", noop()).await.is_none());
        assert!(registry.subscribe("   ", noop()).await.is_none());
        assert!(registry.is_empty().await);
        assert_eq!(store.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_callback_receives_changes() {
        let (store, registry) = connected_registry();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        let _handle = registry
            .subscribe(
                "products",
                Arc::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        store.insert("products", json!({"id": "p1"})).await.unwrap();
        store.insert("products", json!({"id": "p2"})).await.unwrap();

        for _ in 0..100 {
            if seen.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_closed_handle_stops_delivery() {
        let (store, registry) = connected_registry();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        let handle = registry
            .subscribe(
                "products",
                Arc::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();
        registry.unsubscribe(&handle).await;

        store.insert("products", json!({"id": "p1"})).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_open_failure_marks_disconnected() {
        let (store, registry) = connected_registry();
        store.set_available(false);

        assert!(registry.subscribe("products", noop()).await.is_none());
        assert!(!registry.connection().is_connected());
    }

    #[tokio::test]
    async fn test_unknown_table_keeps_connection() {
        let (_store, registry) = connected_registry();

        assert!(registry.subscribe("widgets", noop()).await.is_none());
        assert!(registry.connection().is_connected());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_channels_listing() {
        let (_store, registry) = connected_registry();
        registry.subscribe("products", noop()).await.unwrap();
        registry.subscribe("categories", noop()).await.unwrap();

        assert_eq!(registry.channels().await, vec!["categories", "products"]);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_release_detached() {
        let (store, registry) = connected_registry();
        let registry = Arc::new(registry);

        let handle = registry.subscribe("products", noop()).await.unwrap();
        registry.release_detached(handle.clone());

        for _ in 0..100 {
            if registry.is_empty().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(registry.is_empty().await);
        assert!(handle.is_closed());
        assert_eq!(store.channel_count(), 0);
    }
}
