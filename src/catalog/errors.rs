//! # Catalog Errors

use thiserror::Error;

use crate::store::StoreError;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    /// Input failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique column clash or a row still referenced elsewhere
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backing store unreachable
    #[error("Backing store unavailable")]
    Unavailable,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CatalogError::Validation(_) => 400,
            CatalogError::NotFound { .. } => 404,
            CatalogError::Conflict(_) => 409,
            CatalogError::Unavailable => 503,
            CatalogError::Storage(_) => 500,
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => CatalogError::Unavailable,
            StoreError::UniqueViolation { column, value, .. } => {
                CatalogError::Conflict(format!("{} '{}' is already taken", column, value))
            }
            StoreError::RowNotFound { table, id } => CatalogError::NotFound {
                entity: entity_name(&table),
                id,
            },
            StoreError::InvalidRow(msg) => CatalogError::Validation(msg),
            other => CatalogError::Storage(other.to_string()),
        }
    }
}

fn entity_name(table: &str) -> &'static str {
    match table {
        "products" => "Product",
        "categories" => "Category",
        "contact_messages" => "Message",
        "profiles" => "Profile",
        _ => "Row",
    }
}
