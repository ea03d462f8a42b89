//! medcatalog - medical equipment catalog and back office with live sync
//!
//! The backing store pushes row changes over bounded channels; the
//! realtime layer keeps consumer lists in step with it.

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod http_server;
pub mod observability;
pub mod realtime;
pub mod store;
