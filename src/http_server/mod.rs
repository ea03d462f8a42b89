//! # HTTP Server Module
//!
//! JSON API for the catalog and back office.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/api/auth/*` - Sign-in and current user
//! - `/api/products`, `/api/categories`, `/api/contact` - Catalog CRUD
//! - `/realtime/status`, `/realtime/ws` - Live change streams

pub mod api_routes;
pub mod auth_routes;
pub mod config;
pub mod errors;
pub mod realtime_routes;
pub mod response;
pub mod server;
pub mod state;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult};
pub use response::ApiResponse;
pub use server::{build_router, HttpServer};
pub use state::{AdminSession, AppState, Session};
