//! # Live Subscriptions
//!
//! Per-consumer subscription lifecycle over a [`ChannelRegistry`].
//!
//! A [`LiveSubscription`] holds a channel open while it is enabled and the
//! store is connected, and releases it when disabled, retargeted, unmounted
//! or dropped. The callback can be swapped at any time without reopening
//! the channel.

use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use super::context::RealtimeContext;
use super::probe::ConnectionState;
use super::registry::{ChangeCallback, ChannelRegistry, SubscriptionHandle};

pub struct LiveSubscription {
    registry: Arc<ChannelRegistry>,
    connection: ConnectionState,
    connection_rx: watch::Receiver<bool>,
    table: String,
    enabled: bool,
    callback: Arc<RwLock<ChangeCallback>>,
    handle: Option<SubscriptionHandle>,
}

impl LiveSubscription {
    /// Mount against the context's shared registry
    pub async fn mount(
        ctx: &RealtimeContext,
        table: impl Into<String>,
        enabled: bool,
        callback: ChangeCallback,
    ) -> Self {
        Self::mount_on(Arc::clone(ctx.registry()), table, enabled, callback).await
    }

    /// Mount against a specific registry
    pub async fn mount_on(
        registry: Arc<ChannelRegistry>,
        table: impl Into<String>,
        enabled: bool,
        callback: ChangeCallback,
    ) -> Self {
        let connection = registry.connection().clone();
        let connection_rx = connection.watch();

        let mut subscription = Self {
            registry,
            connection,
            connection_rx,
            table: table.into(),
            enabled,
            callback: Arc::new(RwLock::new(callback)),
            handle: None,
        };
        subscription.reconcile().await;
        subscription
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True only while connected with an open channel
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected() && self.channel().is_some()
    }

    /// The open channel, if any
    pub fn channel(&self) -> Option<&SubscriptionHandle> {
        self.handle.as_ref().filter(|h| !h.is_closed())
    }

    /// Replace the callback. The channel stays open; the next change goes to
    /// the new callback.
    pub fn set_callback(&self, callback: ChangeCallback) {
        if let Ok(mut slot) = self.callback.write() {
            *slot = callback;
        }
    }

    pub async fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.release().await;
        self.reconcile().await;
    }

    pub async fn set_table(&mut self, table: impl Into<String>) {
        let table = table.into();
        if self.table == table {
            return;
        }
        self.release().await;
        self.table = table;
        self.reconcile().await;
    }

    /// Open or release the channel to match `enabled && connected`
    pub async fn reconcile(&mut self) {
        let wanted = self.enabled && self.connection.is_connected();
        let open = self.channel().is_some();

        if wanted && !open {
            self.handle = None;
            let callback = self.delivery_callback();
            self.handle = self.registry.subscribe(&self.table, callback).await;
        } else if !wanted && open {
            self.release().await;
        }
    }

    /// Wait for the connected flag to change, then reconcile. Returns
    /// `false` once the flag's owner is gone.
    pub async fn connection_changed(&mut self) -> bool {
        if self.connection_rx.changed().await.is_err() {
            return false;
        }
        self.reconcile().await;
        true
    }

    /// Release the channel
    pub async fn unmount(mut self) {
        self.release().await;
    }

    async fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.registry.unsubscribe(&handle).await;
        }
    }

    /// Callback registered with the channel: forwards to whatever callback
    /// is current at delivery time.
    fn delivery_callback(&self) -> ChangeCallback {
        let slot = Arc::clone(&self.callback);
        Arc::new(move |event| {
            let current = slot.read().ok().map(|cb| Arc::clone(&*cb));
            if let Some(callback) = current {
                callback(event);
            }
        })
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.registry.release_detached(handle);
        }
    }
}
