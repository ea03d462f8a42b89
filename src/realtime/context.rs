//! # Realtime Context
//!
//! Owns the pieces every live consumer shares: the store handle, the
//! connected flag, the probe and the default channel registry.

use std::sync::Arc;

use super::probe::{ConnectionProbe, ConnectionState};
use super::registry::ChannelRegistry;
use crate::config::RealtimeConfig;
use crate::store::BackingStore;

pub struct RealtimeContext {
    store: Arc<dyn BackingStore>,
    connection: ConnectionState,
    probe: ConnectionProbe,
    registry: Arc<ChannelRegistry>,
    capacity: usize,
}

impl RealtimeContext {
    /// Build a disconnected context; call [`RealtimeContext::start`] to probe.
    pub fn new(store: Arc<dyn BackingStore>, config: &RealtimeConfig) -> Self {
        let connection = ConnectionState::new();
        let probe = ConnectionProbe::new(
            config.probe_table.clone(),
            config.probe_limit,
            config.probe_timeout(),
        );
        let registry = Arc::new(ChannelRegistry::new(
            Arc::clone(&store),
            connection.clone(),
            config.channel_capacity,
        ));

        Self {
            store,
            connection,
            probe,
            registry,
            capacity: config.channel_capacity,
        }
    }

    /// Run the initial probe
    pub async fn start(&self) -> bool {
        self.probe.run(self.store.as_ref(), &self.connection).await
    }

    /// Probe again. Watchers of the connected flag see the new value.
    pub async fn reprobe(&self) -> bool {
        self.probe.run(self.store.as_ref(), &self.connection).await
    }

    /// Close every channel on the shared registry and mark disconnected
    pub async fn shutdown(&self) {
        self.registry.teardown().await;
        self.connection.set(false);
    }

    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn probe(&self) -> &ConnectionProbe {
        &self.probe
    }

    /// Registry shared by in-process consumers
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// A fresh registry for one client session, sharing the connected flag
    pub fn session_registry(&self) -> Arc<ChannelRegistry> {
        Arc::new(ChannelRegistry::new(
            Arc::clone(&self.store),
            self.connection.clone(),
            self.capacity,
        ))
    }
}
