//! # Catalog Service
//!
//! Validated CRUD over the catalog tables. Every write goes through the
//! backing store, so open change channels see it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use super::errors::{CatalogError, CatalogResult};
use super::models::{
    Category, CategoryPatch, ContactMessage, ContactQuery, InventoryAdjustment, InventoryEntry,
    MessageStatus, NewCategory, NewContactMessage, NewProduct, Product, ProductPatch, ProductQuery,
};
use super::validation::{self, MAX_MESSAGE_LEN, MAX_NAME_LEN};
use crate::store::{tables, BackingStore, RecordId, Row, SelectQuery, SortOrder};

fn decode<T: DeserializeOwned>(row: Row) -> CatalogResult<T> {
    serde_json::from_value(row).map_err(|e| CatalogError::Storage(format!("unreadable row: {}", e)))
}

fn decode_all<T: DeserializeOwned>(rows: Vec<Row>) -> CatalogResult<Vec<T>> {
    rows.into_iter().map(decode).collect()
}

fn newest_first(table: &str) -> SelectQuery {
    SelectQuery::new(table).order_by("created_at", SortOrder::Descending)
}

/// One async lock per product id; adjustments on the same product run
/// read, write and history insert as a single step.
type AdjustmentLocks = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn BackingStore>,
    adjustment_locks: AdjustmentLocks,
}

impl CatalogService {
    pub fn new(store: Arc<dyn BackingStore>) -> Self {
        Self {
            store,
            adjustment_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn adjustment_lock(&self, id: &RecordId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .adjustment_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    // ==================
    // Products
    // ==================

    pub async fn list_products(&self, query: &ProductQuery) -> CatalogResult<Vec<Product>> {
        let mut select = newest_first(tables::PRODUCTS);
        if let Some(category_id) = query.category_id {
            select = select.eq("category_id", category_id);
        }
        if let Some(featured) = query.featured {
            select = select.eq("is_featured", featured);
        }
        if let Some(active) = query.active {
            select = select.eq("is_active", active);
        }
        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }
        if let Some(offset) = query.offset {
            select = select.offset(offset);
        }

        decode_all(self.store.select(select).await?)
    }

    /// Look a product up by id, falling back to its slug
    pub async fn get_product(&self, id_or_slug: &str) -> CatalogResult<Product> {
        if let Some(row) = self
            .store
            .get(tables::PRODUCTS, &RecordId::from(id_or_slug))
            .await?
        {
            return decode(row);
        }

        let rows = self
            .store
            .select(SelectQuery::new(tables::PRODUCTS).eq("slug", id_or_slug).limit(1))
            .await?;
        match rows.into_iter().next() {
            Some(row) => decode(row),
            None => Err(CatalogError::not_found("Product", id_or_slug)),
        }
    }

    pub async fn create_product(&self, input: NewProduct) -> CatalogResult<Product> {
        let name = validation::required("name", &input.name, MAX_NAME_LEN)?;
        let slug = validation::slug_for(input.slug.as_deref(), &name)?;
        let price = input.price.map(validation::price).transpose()?;
        let stock = validation::quantity(input.stock_quantity.unwrap_or(0))?;
        if let Some(category_id) = input.category_id {
            self.require_category(category_id).await?;
        }

        let row = json!({
            "name": name,
            "slug": slug,
            "description": validation::optional(input.description),
            "category_id": input.category_id,
            "price": price,
            "stock_quantity": stock,
            "image_url": validation::optional(input.image_url),
            "is_featured": input.is_featured.unwrap_or(false),
            "is_active": input.is_active.unwrap_or(true),
        });

        let product: Product = decode(self.store.insert(tables::PRODUCTS, row).await?)?;
        tracing::info!(product_id = %product.id, slug = %product.slug, "product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: &str, patch: ProductPatch) -> CatalogResult<Product> {
        let mut fields = Map::new();

        if let Some(name) = &patch.name {
            fields.insert("name".into(), json!(validation::required("name", name, MAX_NAME_LEN)?));
        }
        if let Some(slug) = &patch.slug {
            fields.insert("slug".into(), json!(validation::slug_for(Some(slug), "")?));
        }
        if let Some(description) = patch.description {
            fields.insert("description".into(), json!(validation::optional(Some(description))));
        }
        if let Some(category_id) = patch.category_id {
            self.require_category(category_id).await?;
            fields.insert("category_id".into(), json!(category_id));
        }
        if let Some(price) = patch.price {
            fields.insert("price".into(), json!(validation::price(price)?));
        }
        if let Some(image_url) = patch.image_url {
            fields.insert("image_url".into(), json!(validation::optional(Some(image_url))));
        }
        if let Some(featured) = patch.is_featured {
            fields.insert("is_featured".into(), json!(featured));
        }
        if let Some(active) = patch.is_active {
            fields.insert("is_active".into(), json!(active));
        }

        if fields.is_empty() {
            return Err(CatalogError::Validation("no fields to update".into()));
        }

        let row = self
            .store
            .update(tables::PRODUCTS, &RecordId::from(id), Value::Object(fields))
            .await?;
        decode(row)
    }

    pub async fn delete_product(&self, id: &str) -> CatalogResult<Product> {
        let row = self.store.delete(tables::PRODUCTS, &RecordId::from(id)).await?;
        tracing::info!(product_id = %id, "product deleted");
        decode(row)
    }

    /// Move stock and record the movement in `inventory_history`
    pub async fn adjust_inventory(
        &self,
        product_id: &str,
        adjustment: InventoryAdjustment,
        actor_id: Option<&str>,
    ) -> CatalogResult<InventoryEntry> {
        if adjustment.change == 0 {
            return Err(CatalogError::Validation("change must not be zero".into()));
        }

        let id = RecordId::from(product_id);
        let lock = self.adjustment_lock(&id);
        let _guard = lock.lock().await;

        let product: Product = match self.store.get(tables::PRODUCTS, &id).await? {
            Some(row) => decode(row)?,
            None => return Err(CatalogError::not_found("Product", product_id)),
        };

        let previous = product.stock_quantity;
        let new_quantity = previous
            .checked_add(adjustment.change)
            .ok_or_else(|| CatalogError::Validation("change is out of range".into()))?;
        if new_quantity < 0 {
            return Err(CatalogError::Validation(format!(
                "insufficient stock: {} on hand, change {}",
                previous, adjustment.change
            )));
        }

        self.store
            .update(tables::PRODUCTS, &id, json!({ "stock_quantity": new_quantity }))
            .await?;

        let entry = json!({
            "product_id": product.id,
            "change": adjustment.change,
            "previous_quantity": previous,
            "new_quantity": new_quantity,
            "reason": validation::optional(adjustment.reason),
            "actor_id": actor_id,
        });
        let entry: InventoryEntry = decode(self.store.insert(tables::INVENTORY_HISTORY, entry).await?)?;

        tracing::info!(
            product_id = %entry.product_id,
            change = entry.change,
            new_quantity = entry.new_quantity,
            "inventory adjusted"
        );
        Ok(entry)
    }

    pub async fn inventory_history(&self, product_id: &str) -> CatalogResult<Vec<InventoryEntry>> {
        let product = self.get_product(product_id).await?;
        let rows = self
            .store
            .select(
                SelectQuery::new(tables::INVENTORY_HISTORY)
                    .eq("product_id", product.id)
                    .order_by("id", SortOrder::Descending),
            )
            .await?;
        decode_all(rows)
    }

    // ==================
    // Categories
    // ==================

    pub async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        let rows = self
            .store
            .select(SelectQuery::new(tables::CATEGORIES).order_by("name", SortOrder::Ascending))
            .await?;
        decode_all(rows)
    }

    pub async fn create_category(&self, input: NewCategory) -> CatalogResult<Category> {
        let name = validation::required("name", &input.name, MAX_NAME_LEN)?;
        let slug = validation::slug_for(input.slug.as_deref(), &name)?;

        let row = json!({
            "name": name,
            "slug": slug,
            "description": validation::optional(input.description),
        });
        decode(self.store.insert(tables::CATEGORIES, row).await?)
    }

    pub async fn update_category(&self, id: &str, patch: CategoryPatch) -> CatalogResult<Category> {
        let mut fields = Map::new();
        if let Some(name) = &patch.name {
            fields.insert("name".into(), json!(validation::required("name", name, MAX_NAME_LEN)?));
        }
        if let Some(slug) = &patch.slug {
            fields.insert("slug".into(), json!(validation::slug_for(Some(slug), "")?));
        }
        if let Some(description) = patch.description {
            fields.insert("description".into(), json!(validation::optional(Some(description))));
        }
        if fields.is_empty() {
            return Err(CatalogError::Validation("no fields to update".into()));
        }

        let row = self
            .store
            .update(tables::CATEGORIES, &RecordId::from(id), Value::Object(fields))
            .await?;
        decode(row)
    }

    /// Delete a category no product refers to
    pub async fn delete_category(&self, id: &str) -> CatalogResult<Category> {
        let key = RecordId::from(id);
        let category: Category = match self.store.get(tables::CATEGORIES, &key).await? {
            Some(row) => decode(row)?,
            None => return Err(CatalogError::not_found("Category", id)),
        };

        let in_use = self
            .store
            .select(
                SelectQuery::new(tables::PRODUCTS)
                    .eq("category_id", category.id)
                    .limit(1),
            )
            .await?;
        if !in_use.is_empty() {
            return Err(CatalogError::Conflict(format!(
                "category '{}' still has products",
                category.slug
            )));
        }

        decode(self.store.delete(tables::CATEGORIES, &key).await?)
    }

    async fn require_category(&self, id: i64) -> CatalogResult<()> {
        match self.store.get(tables::CATEGORIES, &RecordId::from(id)).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::Validation(format!("category {} does not exist", id))),
        }
    }

    // ==================
    // Contact messages
    // ==================

    pub async fn submit_contact(&self, input: NewContactMessage) -> CatalogResult<ContactMessage> {
        let name = validation::required("name", &input.name, MAX_NAME_LEN)?;
        let email = validation::email(&input.email)?;
        let message = validation::required("message", &input.message, MAX_MESSAGE_LEN)?;
        let product_id = validation::optional(input.product_id);

        if let Some(product_id) = &product_id {
            if self
                .store
                .get(tables::PRODUCTS, &RecordId::from(product_id.as_str()))
                .await?
                .is_none()
            {
                return Err(CatalogError::Validation(format!(
                    "product {} does not exist",
                    product_id
                )));
            }
        }

        let row = json!({
            "name": name,
            "email": email,
            "phone": validation::optional(input.phone),
            "company": validation::optional(input.company),
            "subject": validation::optional(input.subject),
            "message": message,
            "product_id": product_id,
            "status": MessageStatus::New,
        });

        let stored: ContactMessage = decode(self.store.insert(tables::CONTACT_MESSAGES, row).await?)?;
        tracing::info!(message_id = %stored.id, "contact message received");
        Ok(stored)
    }

    pub async fn list_contact(&self, query: &ContactQuery) -> CatalogResult<Vec<ContactMessage>> {
        let mut select = newest_first(tables::CONTACT_MESSAGES);
        if let Some(status) = query.status {
            select = select.eq("status", status.as_str());
        }
        decode_all(self.store.select(select).await?)
    }

    pub async fn set_contact_status(&self, id: &str, status: MessageStatus) -> CatalogResult<ContactMessage> {
        let row = self
            .store
            .update(
                tables::CONTACT_MESSAGES,
                &RecordId::from(id),
                json!({ "status": status }),
            )
            .await?;
        decode(row)
    }

    pub async fn delete_contact(&self, id: &str) -> CatalogResult<ContactMessage> {
        decode(
            self.store
                .delete(tables::CONTACT_MESSAGES, &RecordId::from(id))
                .await?,
        )
    }
}
