//! # Backing Store
//!
//! Client seam to the relational store that owns every persisted table,
//! plus an in-process implementation.
//!
//! The rest of the crate only ever runs a bounded select, mutates single
//! rows, and opens or closes change channels through [`BackingStore`].

mod client;
mod errors;
mod memory;
mod row;

pub use client::{BackingStore, ChangeStream, ChannelId, SelectQuery, SortOrder};
pub use errors::{StoreError, StoreResult};
pub use memory::{IdStrategy, MemoryStore, TableLayout};
pub use row::{RecordId, Row};

/// Tables known to the catalog
pub mod tables {
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "categories";
    pub const CONTACT_MESSAGES: &str = "contact_messages";
    pub const PROFILES: &str = "profiles";
    pub const WEBSITE_SETTINGS: &str = "website_settings";
    pub const INVENTORY_HISTORY: &str = "inventory_history";
}
