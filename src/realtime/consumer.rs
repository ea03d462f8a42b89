//! # Live Collections
//!
//! A [`LiveList`] kept current by a [`LiveSubscription`]. This is what the
//! back office's product and message lists are built on: fetch once, then
//! merge every change the store pushes.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::context::RealtimeContext;
use super::hooks::LiveSubscription;
use super::merge::{DuplicatePolicy, LiveList, Record};
use super::registry::{ChangeCallback, ChannelRegistry};
use crate::catalog::{ContactMessage, Product};
use crate::store::tables;

/// Products, newest first
pub type ProductList = LiveCollection<Product>;

/// Contact messages, newest first
pub type MessageList = LiveCollection<ContactMessage>;

pub struct LiveCollection<T> {
    list: Arc<Mutex<LiveList<T>>>,
    processed: watch::Receiver<u64>,
    subscription: LiveSubscription,
}

impl<T> LiveCollection<T>
where
    T: Record + Send + 'static,
{
    /// Mount on `table`, seeded with `initial` (newest first)
    pub async fn mount(ctx: &RealtimeContext, table: &str, initial: Vec<T>) -> Self {
        Self::mount_with_policy(ctx, table, initial, DuplicatePolicy::default()).await
    }

    pub async fn mount_with_policy(
        ctx: &RealtimeContext,
        table: &str,
        initial: Vec<T>,
        policy: DuplicatePolicy,
    ) -> Self {
        Self::mount_on(Arc::clone(ctx.registry()), table, initial, policy).await
    }

    /// Mount against a specific registry
    pub async fn mount_on(
        registry: Arc<ChannelRegistry>,
        table: &str,
        initial: Vec<T>,
        policy: DuplicatePolicy,
    ) -> Self {
        let list = Arc::new(Mutex::new(LiveList::with_policy(initial, policy)));
        let (tx, processed) = watch::channel(0u64);

        let callback: ChangeCallback = {
            let list = Arc::clone(&list);
            Arc::new(move |event| {
                if let Ok(mut list) = list.lock() {
                    list.apply(&event);
                }
                tx.send_modify(|count| *count += 1);
            })
        };

        let subscription = LiveSubscription::mount_on(registry, table, true, callback).await;

        Self {
            list,
            processed,
            subscription,
        }
    }

    /// Copy of the current rows
    pub fn snapshot(&self) -> Vec<T> {
        self.list
            .lock()
            .map(|list| list.items().to_vec())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.list.lock().map(|list| list.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of change events handled so far, applied or not
    pub fn processed(&self) -> u64 {
        *self.processed.borrow()
    }

    /// Wait until another change event has been handled
    pub async fn changed(&mut self) -> bool {
        self.processed.changed().await.is_ok()
    }

    pub fn subscription(&self) -> &LiveSubscription {
        &self.subscription
    }

    pub fn subscription_mut(&mut self) -> &mut LiveSubscription {
        &mut self.subscription
    }

    /// Release the channel and hand back the final rows
    pub async fn unmount(self) -> Vec<T> {
        let rows = self.snapshot();
        self.subscription.unmount().await;
        rows
    }
}

impl ProductList {
    pub async fn products(ctx: &RealtimeContext, initial: Vec<Product>) -> Self {
        Self::mount(ctx, tables::PRODUCTS, initial).await
    }
}

impl MessageList {
    pub async fn messages(ctx: &RealtimeContext, initial: Vec<ContactMessage>) -> Self {
        Self::mount(ctx, tables::CONTACT_MESSAGES, initial).await
    }
}
