//! Key-value store abstraction
//!
//! [`KeyValueStore`] is kept as close as possible to the DynamoDB item API so the
//! production implementation stays thin. Precondition failures are reported as
//! [`StoreError::ConditionFailed`] and interpreted by the gateway.

mod dynamo;
#[cfg(any(test, feature = "test-utils"))]
mod memory;

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use thiserror::Error;

pub use dynamo::DynamoDbStore;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;

use crate::key::ItemKey;

/// Attribute map of a stored item, key attributes included
pub type Item = HashMap<String, AttributeValue>;

/// Result type alias for raw store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write's precondition did not hold at write time
    #[error("Conditional check failed")]
    ConditionFailed,

    /// Transport or server fault
    #[error("{0}")]
    Unavailable(String),

    /// The call did not complete within the configured bound
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Server-evaluated precondition attached to a single-key write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Unconditional
    None,
    /// An item must already exist at the key
    Exists,
    /// No item may exist at the key
    NotExists,
}

/// Attribute-level change applied by [`KeyValueStore::update_item`]
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Overwrite the given attributes, leaving the rest untouched
    Set(Item),
    /// Add `delta` to a numeric attribute, treating a missing item or attribute as zero
    ///
    /// Fails with [`StoreError::ConditionFailed`] if the result would exceed `max`.
    Increment {
        /// Attribute to increment
        attribute: String,
        /// Signed amount to add
        delta: i64,
        /// Largest value the attribute may hold after the update
        max: i64,
    },
}

/// Single-table store addressed by (partition key, sort key)
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads one item
    async fn get_item(&self, key: &ItemKey) -> StoreResult<Option<Item>>;

    /// Writes a whole item; `attributes` must not contain the key attributes
    async fn put_item(
        &self,
        key: &ItemKey,
        attributes: Item,
        condition: WriteCondition,
    ) -> StoreResult<()>;

    /// Applies a mutation and returns the item as it is after the update
    async fn update_item(
        &self,
        key: &ItemKey,
        mutation: Mutation,
        condition: WriteCondition,
    ) -> StoreResult<Item>;

    /// Removes an item and returns it as it was before the delete, if it existed
    async fn delete_item(
        &self,
        key: &ItemKey,
        condition: WriteCondition,
    ) -> StoreResult<Option<Item>>;

    /// Every item in `partition_key` whose sort key starts with `sort_key_prefix`,
    /// in ascending sort-key order
    async fn query_prefix(
        &self,
        partition_key: &str,
        sort_key_prefix: &str,
    ) -> StoreResult<Vec<Item>>;

    /// Every item in the table whose partition key starts with `partition_key_prefix`
    /// and whose sort key equals `sort_key`, in no particular order
    ///
    /// Reads the whole table.
    async fn scan_matching(
        &self,
        partition_key_prefix: &str,
        sort_key: &str,
    ) -> StoreResult<Vec<Item>>;
}

/// Bounds a store call, turning an elapsed deadline into [`StoreError::Timeout`]
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(StoreError::Timeout(limit)))
}
