//! Shop backend service
//!
//! HTTP surface for users, the product catalog and shopping carts, backed by a single
//! partitioned `DynamoDB` table through `shop_storage`.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// HTTP routes
pub mod routes;

/// Server setup and lifecycle
pub mod server;

/// Application state
pub mod state;

/// Environment, errors and extractors
pub mod types;
