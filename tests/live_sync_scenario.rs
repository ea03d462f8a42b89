//! Live Sync Scenario Tests
//!
//! End-to-end: probe, mount a consumer, push changes through the store,
//! unmount. Covers the connection flag driving subscriptions and the
//! catalog service feeding a live product list.

use std::sync::Arc;
use std::time::Duration;

use medcatalog::catalog::{
    CatalogService, ContactQuery, InventoryAdjustment, MessageStatus, NewContactMessage, NewProduct,
    ProductQuery,
};
use medcatalog::config::RealtimeConfig;
use medcatalog::realtime::{
    ChangeCallback, LiveCollection, LiveSubscription, MessageList, ProductList, RealtimeContext,
};
use medcatalog::store::{BackingStore, MemoryStore, Row};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (Arc<MemoryStore>, RealtimeContext) {
    let store = Arc::new(MemoryStore::catalog());
    let ctx = RealtimeContext::new(store.clone(), &RealtimeConfig::default());
    (store, ctx)
}

async fn wait_processed<T>(list: &mut LiveCollection<T>, count: u64)
where
    T: medcatalog::realtime::Record + Send + 'static,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while list.processed() < count {
        if tokio::time::timeout_at(deadline, list.changed()).await.is_err() {
            break;
        }
    }
}

fn new_product(name: &str, stock: i64) -> NewProduct {
    serde_json::from_value(json!({"name": name, "stock_quantity": stock})).unwrap()
}

fn inquiry(name: &str, email: &str) -> NewContactMessage {
    serde_json::from_value(json!({"name": name, "email": email, "message": "Requesting a quote"})).unwrap()
}

// =============================================================================
// Scenario
// =============================================================================

/// Probe, subscribe, receive one INSERT, unmount.
#[tokio::test]
async fn test_products_round_trip() {
    let (store, ctx) = setup();

    assert!(ctx.start().await);
    assert!(ctx.is_connected());

    let mut list: LiveCollection<Value> = LiveCollection::mount(&ctx, "products", Vec::new()).await;
    let handle = list.subscription().channel().cloned().unwrap();
    assert!(!handle.is_closed());
    assert!(list.subscription().is_connected());

    store
        .insert("products", json!({"id": "p1", "name": "X"}))
        .await
        .unwrap();
    wait_processed(&mut list, 1).await;

    let rows = list.snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "p1");
    assert_eq!(rows[0]["name"], "X");

    list.unmount().await;
    assert!(handle.is_closed());
    assert!(!ctx.registry().contains("products").await);
    assert_eq!(store.channel_count_for("products"), 0);
}

/// Failed probe: consumers mount without a channel and see nothing.
#[tokio::test]
async fn test_unreachable_store_mounts_idle() {
    let (store, ctx) = setup();
    store.set_available(false);

    assert!(!ctx.start().await);

    let list: LiveCollection<Value> = LiveCollection::mount(&ctx, "products", Vec::new()).await;
    assert!(list.subscription().channel().is_none());
    assert!(!list.subscription().is_connected());
    assert!(ctx.registry().is_empty().await);
    assert_eq!(store.channel_count(), 0);
}

/// A successful re-probe lets a waiting subscription open its channel.
#[tokio::test]
async fn test_reprobe_opens_channel() {
    let (store, ctx) = setup();
    store.set_available(false);
    assert!(!ctx.start().await);

    let callback: ChangeCallback = Arc::new(|_| {});
    let mut sub = LiveSubscription::mount(&ctx, "categories", true, callback).await;
    assert!(sub.channel().is_none());

    store.set_available(true);
    assert!(ctx.reprobe().await);
    assert!(sub.connection_changed().await);

    assert!(sub.is_connected());
    assert_eq!(store.channel_count_for("categories"), 1);
    sub.unmount().await;
}

/// Disabling releases the channel; re-enabling opens a fresh one.
#[tokio::test]
async fn test_toggle_enabled() {
    let (store, ctx) = setup();
    assert!(ctx.start().await);

    let callback: ChangeCallback = Arc::new(|_| {});
    let mut sub = LiveSubscription::mount(&ctx, "products", true, callback).await;
    let first = sub.channel().cloned().unwrap();

    sub.set_enabled(false).await;
    assert!(first.is_closed());
    assert_eq!(store.channel_count(), 0);

    sub.set_enabled(true).await;
    let second = sub.channel().cloned().unwrap();
    assert!(!second.same_channel(&first));
    assert_eq!(store.channel_count_for("products"), 1);
}

/// Shutdown closes every consumer's channel.
#[tokio::test]
async fn test_shutdown_closes_consumers() {
    let (store, ctx) = setup();
    assert!(ctx.start().await);

    let products: LiveCollection<Value> = LiveCollection::mount(&ctx, "products", Vec::new()).await;
    let messages: LiveCollection<Value> = LiveCollection::mount(&ctx, "contact_messages", Vec::new()).await;

    ctx.shutdown().await;

    assert!(products.subscription().channel().is_none());
    assert!(messages.subscription().channel().is_none());
    assert!(!ctx.is_connected());
    assert!(ctx.registry().is_empty().await);
    assert_eq!(store.channel_count(), 0);
}

// =============================================================================
// Catalog + Live List
// =============================================================================

/// Service writes flow into a typed product list, newest first.
#[tokio::test]
async fn test_service_writes_reach_product_list() {
    let (store, ctx) = setup();
    assert!(ctx.start().await);
    let service = CatalogService::new(store.clone());

    let initial = service.list_products(&ProductQuery::default()).await.unwrap();
    let mut list = ProductList::products(&ctx, initial).await;

    let pump = service.create_product(new_product("Infusion Pump", 3)).await.unwrap();
    let monitor = service.create_product(new_product("Patient Monitor", 1)).await.unwrap();
    wait_processed(&mut list, 2).await;

    let names: Vec<String> = list.snapshot().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Patient Monitor", "Infusion Pump"]);

    let restock = InventoryAdjustment {
        change: 9,
        reason: Some("restock".into()),
    };
    service.adjust_inventory(&pump.id, restock, None).await.unwrap();
    service.delete_product(&monitor.id).await.unwrap();
    wait_processed(&mut list, 4).await;

    let rows = list.unmount().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, pump.id);
    assert_eq!(rows[0].stock_quantity, 12);
}

/// Submitted inquiries and status changes flow into the message list.
#[tokio::test]
async fn test_contact_writes_reach_message_list() {
    let (store, ctx) = setup();
    assert!(ctx.start().await);
    let service = CatalogService::new(store.clone());

    let first = service.submit_contact(inquiry("Dr. Rivera", "rivera@hospital.org")).await.unwrap();
    let initial = service.list_contact(&ContactQuery::default()).await.unwrap();
    let mut list = MessageList::messages(&ctx, initial).await;
    assert!(list.subscription().is_connected());
    assert_eq!(store.channel_count_for("contact_messages"), 1);

    let second = service.submit_contact(inquiry("Nurse Okafor", "okafor@clinic.org")).await.unwrap();
    service.set_contact_status(&first.id, MessageStatus::Replied).await.unwrap();
    wait_processed(&mut list, 2).await;

    let rows = list.unmount().await;
    let ids: Vec<&str> = rows.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
    assert_eq!(rows[0].status, MessageStatus::New);
    assert_eq!(rows[1].status, MessageStatus::Replied);
    assert_eq!(store.channel_count_for("contact_messages"), 0);
}

/// Rows written before mount come from the initial fetch only.
#[tokio::test]
async fn test_initial_rows_not_duplicated() {
    let (store, ctx) = setup();
    assert!(ctx.start().await);

    let existing: Row = store
        .insert("products", json!({"name": "Defibrillator", "slug": "defibrillator"}))
        .await
        .unwrap();

    let list: LiveCollection<Value> = LiveCollection::mount(&ctx, "products", vec![existing]).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(list.len(), 1);
    assert_eq!(list.processed(), 0);
}
