//! Prefix range scans within a partition, plus the one table-wide scan

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::StorageResult;
use crate::gateway::Record;
use crate::key::ItemKey;
use crate::store::{bounded, KeyValueStore};

/// Reads every item under a partition whose sort key starts with a prefix
///
/// Each call is a fresh snapshot read, returned in ascending sort-key order.
pub struct RangeScanner {
    store: Arc<dyn KeyValueStore>,
    call_timeout: Duration,
}

impl RangeScanner {
    /// Creates a new scanner
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, call_timeout: Duration) -> Self {
        Self {
            store,
            call_timeout,
        }
    }

    /// Scans `partition_key` for sort keys starting with `sort_key_prefix`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::StoreUnavailable` if the query fails or times out, or a
    /// decode error if a returned item does not fit `T`
    pub async fn scan<T: DeserializeOwned>(
        &self,
        partition_key: &str,
        sort_key_prefix: &str,
    ) -> StorageResult<Vec<Record<T>>> {
        let items = bounded(
            self.call_timeout,
            self.store.query_prefix(partition_key, sort_key_prefix),
        )
        .await?;

        tracing::debug!(
            pk = %partition_key,
            prefix = %sort_key_prefix,
            count = items.len(),
            "Scanned partition"
        );

        items.into_iter().map(Record::from_item).collect()
    }

    /// Every record whose partition key starts with `partition_key_prefix` and whose sort
    /// key is exactly `sort_key`, ordered by partition key
    ///
    /// This reads the whole table in one bounded call, so keep it off hot paths.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::StoreUnavailable` if the scan fails or times out, or a
    /// decode error if a returned item does not fit `T`
    pub async fn scan_all<T: DeserializeOwned>(
        &self,
        partition_key_prefix: &str,
        sort_key: &str,
    ) -> StorageResult<Vec<Record<T>>> {
        let items = bounded(
            self.call_timeout,
            self.store.scan_matching(partition_key_prefix, sort_key),
        )
        .await?;

        tracing::debug!(
            pk_prefix = %partition_key_prefix,
            sk = %sort_key,
            count = items.len(),
            "Scanned table"
        );

        let mut keyed = items
            .into_iter()
            .map(|item| Ok((ItemKey::from_item(&item)?, item)))
            .collect::<StorageResult<Vec<_>>>()?;
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        keyed
            .into_iter()
            .map(|(_, item)| Record::from_item(item))
            .collect()
    }
}
