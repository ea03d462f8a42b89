//! Merge Semantics Tests
//!
//! How change events rewrite a newest-first list:
//! - INSERT prepends
//! - UPDATE replaces in place, or leaves the list alone when nothing matches
//! - DELETE removes by the old row's id
//! - Malformed events are dropped without touching the list

use medcatalog::catalog::Product;
use medcatalog::realtime::{
    apply_change, ChangeEvent, DuplicatePolicy, EventType, IgnoreReason, LiveList, MalformedEvent,
    MergeOutcome,
};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn rows(ids: &[&str]) -> Vec<Value> {
    ids.iter()
        .map(|id| json!({"id": id, "name": format!("Item {}", id)}))
        .collect()
}

fn ids(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .map(|row| row["id"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn product(id: &str, name: &str, stock: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "slug": name.to_lowercase().replace(' ', "-"),
        "stock_quantity": stock,
        "is_featured": false,
        "is_active": true,
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z"
    })
}

// =============================================================================
// INSERT
// =============================================================================

/// INSERT yields [r, ...L].
#[test]
fn test_insert_prepends() {
    let mut items = rows(&["a", "b", "c"]);
    let event = ChangeEvent::insert("products", json!({"id": "n", "name": "New"}));

    assert_eq!(apply_change(&mut items, &event, DuplicatePolicy::Allow), MergeOutcome::Inserted);
    assert_eq!(ids(&items), vec!["n", "a", "b", "c"]);
    assert_eq!(items[0]["name"], "New");
}

/// INSERT into an empty list.
#[test]
fn test_insert_into_empty() {
    let mut items: Vec<Value> = Vec::new();
    let event = ChangeEvent::insert("products", json!({"id": "p1", "name": "X"}));

    apply_change(&mut items, &event, DuplicatePolicy::Allow);
    assert_eq!(items, vec![json!({"id": "p1", "name": "X"})]);
}

/// Duplicate ids are kept twice under the default policy.
#[test]
fn test_duplicate_insert_default_policy() {
    let mut items = rows(&["a", "b"]);
    let event = ChangeEvent::insert("products", json!({"id": "a", "name": "Again"}));

    apply_change(&mut items, &event, DuplicatePolicy::default());
    assert_eq!(ids(&items), vec!["a", "a", "b"]);
}

/// ReplaceExisting turns a duplicate INSERT into an in-place replace.
#[test]
fn test_duplicate_insert_replace_policy() {
    let mut items = rows(&["a", "b"]);
    let event = ChangeEvent::insert("products", json!({"id": "b", "name": "Again"}));

    let outcome = apply_change(&mut items, &event, DuplicatePolicy::ReplaceExisting);
    assert_eq!(outcome, MergeOutcome::Replaced { index: 1 });
    assert_eq!(ids(&items), vec!["a", "b"]);
    assert_eq!(items[1]["name"], "Again");
}

// =============================================================================
// UPDATE
// =============================================================================

/// UPDATE with a match keeps position and order of everything else.
#[test]
fn test_update_replaces_in_place() {
    let mut items = rows(&["a", "b", "c"]);
    let event = ChangeEvent::update(
        "products",
        json!({"id": "b", "name": "Item b"}),
        json!({"id": "b", "name": "Renamed"}),
    );

    let outcome = apply_change(&mut items, &event, DuplicatePolicy::Allow);
    assert_eq!(outcome, MergeOutcome::Replaced { index: 1 });
    assert_eq!(ids(&items), vec!["a", "b", "c"]);
    assert_eq!(items[1]["name"], "Renamed");
    assert_eq!(items[0]["name"], "Item a");
    assert_eq!(items[2]["name"], "Item c");
}

/// UPDATE for an id the list lacks changes nothing.
#[test]
fn test_update_without_match_is_noop() {
    let mut items = rows(&["a", "b"]);
    let before = items.clone();
    let event = ChangeEvent::update("products", json!({"id": "z"}), json!({"id": "z", "name": "Z"}));

    let outcome = apply_change(&mut items, &event, DuplicatePolicy::Allow);
    assert_eq!(outcome, MergeOutcome::Ignored(IgnoreReason::NoMatch("z".into())));
    assert_eq!(items, before);
}

/// Numeric and string ids compare equal.
#[test]
fn test_update_matches_numeric_id() {
    let mut items = vec![json!({"id": 7, "name": "Imaging"})];
    let event = ChangeEvent::update("categories", json!({"id": 7}), json!({"id": 7, "name": "Radiology"}));

    apply_change(&mut items, &event, DuplicatePolicy::Allow);
    assert_eq!(items[0]["name"], "Radiology");
}

// =============================================================================
// DELETE
// =============================================================================

/// DELETE removes the matching row and preserves relative order.
#[test]
fn test_delete_removes_by_old_id() {
    let mut items = rows(&["a", "b", "c", "d"]);
    let event = ChangeEvent::delete("products", json!({"id": "c"}));

    let outcome = apply_change(&mut items, &event, DuplicatePolicy::Allow);
    assert_eq!(outcome, MergeOutcome::Removed { index: 2 });
    assert_eq!(ids(&items), vec!["a", "b", "d"]);
}

/// DELETE of an absent id is a no-op.
#[test]
fn test_delete_without_match_is_noop() {
    let mut items = rows(&["a"]);
    let event = ChangeEvent::delete("products", json!({"id": "q"}));

    assert!(!apply_change(&mut items, &event, DuplicatePolicy::Allow).is_applied());
    assert_eq!(ids(&items), vec!["a"]);
}

// =============================================================================
// Malformed Events
// =============================================================================

/// An event missing the image its type needs is dropped.
#[test]
fn test_missing_image_dropped() {
    let mut items = rows(&["a"]);
    let mut event = ChangeEvent::delete("products", json!({"id": "a"}));
    event.old = None;

    let outcome = apply_change(&mut items, &event, DuplicatePolicy::Allow);
    assert!(matches!(
        outcome,
        MergeOutcome::Ignored(IgnoreReason::Malformed(MalformedEvent::MissingImage {
            event_type: EventType::Delete,
            ..
        }))
    ));
    assert_eq!(ids(&items), vec!["a"]);
}

/// A row image without an id is dropped.
#[test]
fn test_missing_id_dropped() {
    let mut items = rows(&["a"]);
    let event = ChangeEvent::insert("products", json!({"name": "anonymous"}));

    assert!(!apply_change(&mut items, &event, DuplicatePolicy::Allow).is_applied());
    assert_eq!(items.len(), 1);
}

/// Typed lists drop rows that do not decode.
#[test]
fn test_typed_list_rejects_undecodable_row() {
    let mut list: LiveList<Product> = LiveList::new(Vec::new());
    let event = ChangeEvent::insert("products", json!({"id": "p1", "stock_quantity": "lots"}));

    assert!(matches!(list.apply(&event), MergeOutcome::Ignored(IgnoreReason::Undecodable(_))));
    assert!(list.is_empty());
}

// =============================================================================
// Sequences
// =============================================================================

/// A run of events against a typed product list.
#[test]
fn test_product_list_sequence() {
    let mut list: LiveList<Product> = LiveList::new(Vec::new());

    list.apply(&ChangeEvent::insert("products", product("p1", "Infusion Pump", 4)));
    list.apply(&ChangeEvent::insert("products", product("p2", "Patient Monitor", 2)));
    list.apply(&ChangeEvent::update(
        "products",
        product("p1", "Infusion Pump", 4),
        product("p1", "Infusion Pump", 9),
    ));
    list.apply(&ChangeEvent::delete("products", json!({"id": "p2"})));

    let items = list.into_vec();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "p1");
    assert_eq!(items[0].stock_quantity, 9);
}
