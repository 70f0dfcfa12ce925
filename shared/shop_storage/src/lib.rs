//! Storage layer for the shop backend
//!
//! Users, products and shopping carts live in a single partitioned key-value table.
//! Every write carries its own server-evaluated precondition (or is an atomic
//! increment), so nothing here takes an in-process lock.

pub mod cart;
mod error;
pub mod gateway;
pub mod key;
pub mod product;
pub mod scanner;
pub mod store;
pub mod user;

pub use error::{StorageError, StorageResult};
