//! # Catalog
//!
//! Products, categories, inquiries and stock movements for the medical
//! equipment catalog and its back office.

pub mod errors;
pub mod models;
pub mod service;
pub mod validation;

pub use errors::{CatalogError, CatalogResult};
pub use models::{
    Category, CategoryPatch, ContactMessage, ContactQuery, InventoryAdjustment, InventoryEntry,
    MessageStatus, NewCategory, NewContactMessage, NewProduct, Product, ProductPatch, ProductQuery,
};
pub use service::CatalogService;
