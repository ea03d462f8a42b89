//! # Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Backing store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store cannot be reached
    #[error("Backing store unavailable")]
    Unavailable,

    /// Table does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// No row with the given id
    #[error("Row {id} not found in {table}")]
    RowNotFound { table: String, id: String },

    /// Unique constraint violated
    #[error("Duplicate value for {column} in {table}: {value}")]
    UniqueViolation {
        table: String,
        column: String,
        value: String,
    },

    /// Row payload rejected
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// Store-side failure unrelated to the request
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether the error indicates a connectivity problem rather than a
    /// problem with the request
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Unavailable)
    }
}
