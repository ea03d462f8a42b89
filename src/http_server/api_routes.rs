//! Catalog HTTP Routes
//!
//! Products, categories, inventory and contact messages. Reads of the
//! public catalog and contact submission are open; everything else needs
//! an admin session.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use super::errors::ApiResult;
use super::response::ApiResponse;
use super::state::{AdminSession, AppState};
use crate::catalog::{
    Category, CategoryPatch, ContactMessage, ContactQuery, InventoryAdjustment, InventoryEntry,
    MessageStatus, NewCategory, NewContactMessage, NewProduct, Product, ProductPatch, ProductQuery,
};

/// Routes nested under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products_handler).post(create_product_handler))
        .route(
            "/products/:id",
            get(get_product_handler)
                .patch(update_product_handler)
                .delete(delete_product_handler),
        )
        .route(
            "/products/:id/inventory",
            get(inventory_history_handler).post(adjust_inventory_handler),
        )
        .route("/categories", get(list_categories_handler).post(create_category_handler))
        .route(
            "/categories/:id",
            patch(update_category_handler).delete(delete_category_handler),
        )
        .route("/contact", post(submit_contact_handler).get(list_contact_handler))
        .route(
            "/contact/:id",
            patch(update_contact_handler).delete(delete_contact_handler),
        )
}

#[derive(Debug, Deserialize)]
pub struct ContactStatusRequest {
    pub status: MessageStatus,
}

// ==================
// Products
// ==================

async fn list_products_handler(
    State(state): State<AppState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<Product>>> {
    let Query(query) = query?;
    Ok(ApiResponse::ok(state.catalog.list_products(&query).await?))
}

async fn get_product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Product>> {
    Ok(ApiResponse::ok(state.catalog.get_product(&id).await?))
}

async fn create_product_handler(
    State(state): State<AppState>,
    _admin: AdminSession,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<ApiResponse<Product>> {
    let Json(input) = payload?;
    let product = state.catalog.create_product(input).await?;
    Ok(ApiResponse::created(product).with_message("Product created"))
}

async fn update_product_handler(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> ApiResult<ApiResponse<Product>> {
    let Json(patch) = payload?;
    let product = state.catalog.update_product(&id, patch).await?;
    Ok(ApiResponse::ok(product).with_message("Product updated"))
}

async fn delete_product_handler(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Product>> {
    let product = state.catalog.delete_product(&id).await?;
    Ok(ApiResponse::ok(product).with_message("Product deleted"))
}

async fn inventory_history_handler(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Vec<InventoryEntry>>> {
    Ok(ApiResponse::ok(state.catalog.inventory_history(&id).await?))
}

async fn adjust_inventory_handler(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    Path(id): Path<String>,
    payload: Result<Json<InventoryAdjustment>, JsonRejection>,
) -> ApiResult<ApiResponse<InventoryEntry>> {
    let Json(adjustment) = payload?;
    let entry = state
        .catalog
        .adjust_inventory(&id, adjustment, Some(&admin.id))
        .await?;
    Ok(ApiResponse::created(entry).with_message("Inventory adjusted"))
}

// ==================
// Categories
// ==================

async fn list_categories_handler(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<Category>>> {
    Ok(ApiResponse::ok(state.catalog.list_categories().await?))
}

async fn create_category_handler(
    State(state): State<AppState>,
    _admin: AdminSession,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<ApiResponse<Category>> {
    let Json(input) = payload?;
    let category = state.catalog.create_category(input).await?;
    Ok(ApiResponse::created(category).with_message("Category created"))
}

async fn update_category_handler(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    payload: Result<Json<CategoryPatch>, JsonRejection>,
) -> ApiResult<ApiResponse<Category>> {
    let Json(patch) = payload?;
    let category = state.catalog.update_category(&id, patch).await?;
    Ok(ApiResponse::ok(category).with_message("Category updated"))
}

async fn delete_category_handler(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Category>> {
    let category = state.catalog.delete_category(&id).await?;
    Ok(ApiResponse::ok(category).with_message("Category deleted"))
}

// ==================
// Contact messages
// ==================

async fn submit_contact_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewContactMessage>, JsonRejection>,
) -> ApiResult<ApiResponse<ContactMessage>> {
    let Json(input) = payload?;
    let message = state.catalog.submit_contact(input).await?;
    Ok(ApiResponse::created(message).with_message("Message received"))
}

async fn list_contact_handler(
    State(state): State<AppState>,
    _admin: AdminSession,
    query: Result<Query<ContactQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<ContactMessage>>> {
    let Query(query) = query?;
    Ok(ApiResponse::ok(state.catalog.list_contact(&query).await?))
}

async fn update_contact_handler(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    payload: Result<Json<ContactStatusRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<ContactMessage>> {
    let Json(request) = payload?;
    let message = state.catalog.set_contact_status(&id, request.status).await?;
    Ok(ApiResponse::ok(message).with_message("Message updated"))
}

async fn delete_contact_handler(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<ContactMessage>> {
    let message = state.catalog.delete_contact(&id).await?;
    Ok(ApiResponse::ok(message).with_message("Message deleted"))
}
