//! Conditional write gateway
//!
//! Wraps a [`KeyValueStore`] with precondition-checked primitives. Every precondition
//! travels with the write it guards; nothing here reads before writing.
//! `ConditionFailed` from the store becomes `AlreadyExists` on create, `Validation` on a
//! capped increment and `NotFound` everywhere else. Every other store fault becomes
//! `StoreUnavailable`.
//!
//! Updates and deletes decode the item the store hands back. That happens after the write
//! has committed, so a decode failure there is logged at `error` with the key.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{StorageError, StorageResult};
use crate::key::{parse_key, EntityKind, EntityRef, ItemKey};
use crate::store::{bounded, Item, KeyValueStore, Mutation, StoreError, WriteCondition};

/// A stored item decoded into its entity reference and typed attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    /// Entity the item's key resolves to
    pub entity: EntityRef,
    /// Non-key attributes
    pub attributes: T,
}

impl<T: DeserializeOwned> Record<T> {
    /// Decodes a raw store item
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MalformedKey` if the item's key matches no entity layout, or
    /// `StorageError::Serialization` if the attributes do not fit `T`
    pub fn from_item(item: Item) -> StorageResult<Self> {
        let entity = parse_key(&ItemKey::from_item(&item)?)?;
        let attributes = serde_dynamo::from_item(item)?;
        Ok(Self { entity, attributes })
    }
}

/// Precondition-checked access to the store
pub struct ConditionalWriteGateway {
    store: Arc<dyn KeyValueStore>,
    call_timeout: Duration,
}

impl ConditionalWriteGateway {
    /// Creates a new gateway
    ///
    /// # Arguments
    ///
    /// * `store` - Store every call is issued against
    /// * `call_timeout` - Upper bound on a single store call
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, call_timeout: Duration) -> Self {
        Self {
            store,
            call_timeout,
        }
    }

    /// Writes `attributes` at `key` only if nothing is stored there
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if a record exists at `key`, or
    /// `StorageError::StoreUnavailable` on store faults
    pub async fn create_if_absent<T: Serialize>(
        &self,
        key: &ItemKey,
        attributes: T,
    ) -> StorageResult<Record<T>> {
        let entity = parse_key(key)?;
        let item: Item = serde_dynamo::to_item(&attributes)?;

        bounded(
            self.call_timeout,
            self.store.put_item(key, item, WriteCondition::NotExists),
        )
        .await
        .map_err(|err| precondition_error(err, StorageError::AlreadyExists(entity.kind())))?;

        tracing::debug!(pk = %key.partition_key, sk = %key.sort_key, "Created record");

        Ok(Record { entity, attributes })
    }

    /// Applies a partial attribute set at `key` only if a record exists there
    ///
    /// `mutation` is serialized and every present field is overwritten. Fields that
    /// serialize to nothing (e.g. `None` with `skip_serializing_if`) are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Validation` if the mutation sets no attribute,
    /// `StorageError::NotFound` if no record exists at `key`,
    /// `StorageError::StoreUnavailable` on store faults, or `StorageError::Serialization`
    /// if the updated item does not fit `T` (the update has been applied by then)
    pub async fn update_if_exists<M, T>(&self, key: &ItemKey, mutation: &M) -> StorageResult<Record<T>>
    where
        M: Serialize,
        T: DeserializeOwned,
    {
        let entity = parse_key(key)?;
        let attributes: Item = serde_dynamo::to_item(mutation)?;
        if attributes.is_empty() {
            return Err(StorageError::Validation(
                "update must set at least one attribute".to_string(),
            ));
        }

        let item = bounded(
            self.call_timeout,
            self.store
                .update_item(key, Mutation::Set(attributes), WriteCondition::Exists),
        )
        .await
        .map_err(|err| precondition_error(err, StorageError::NotFound(entity.kind())))?;

        tracing::debug!(pk = %key.partition_key, sk = %key.sort_key, "Updated record");

        decode_written(key, item)
    }

    /// Removes the record at `key` only if it exists, returning it as it was
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no record exists at `key`,
    /// `StorageError::StoreUnavailable` on store faults, or `StorageError::Serialization`
    /// if the removed item does not fit `T` (the delete has been applied by then)
    pub async fn delete_if_exists<T: DeserializeOwned>(
        &self,
        key: &ItemKey,
    ) -> StorageResult<Record<T>> {
        let kind = parse_key(key)?.kind();

        let item = bounded(
            self.call_timeout,
            self.store.delete_item(key, WriteCondition::Exists),
        )
        .await
        .map_err(|err| precondition_error(err, StorageError::NotFound(kind)))?
        // Only reachable if the store ignores the condition
        .ok_or(StorageError::NotFound(kind))?;

        tracing::debug!(pk = %key.partition_key, sk = %key.sort_key, "Deleted record");

        decode_written(key, item)
    }

    /// Reads the record at `key`
    ///
    /// For decisions only; never follow this with a write that assumes the result is
    /// still current.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no record exists at `key`, or
    /// `StorageError::StoreUnavailable` on store faults
    pub async fn get_by_key<T: DeserializeOwned>(&self, key: &ItemKey) -> StorageResult<Record<T>> {
        let kind = parse_key(key)?.kind();

        bounded(self.call_timeout, self.store.get_item(key))
            .await?
            .ok_or(StorageError::NotFound(kind))
            .and_then(Record::from_item)
    }

    /// Adds `delta` to a numeric attribute in one request, creating the record with the
    /// attribute at zero first if it is absent
    ///
    /// The store refuses the update if the attribute would end up above `max`, so a
    /// stored value never outgrows the type it is decoded into.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Validation` if the result would exceed `max`,
    /// `StorageError::StoreUnavailable` on store faults, or `StorageError::Serialization`
    /// if the updated item does not fit `T` (the increment has been applied by then)
    pub async fn increment<T: DeserializeOwned>(
        &self,
        key: &ItemKey,
        attribute: &str,
        delta: i64,
        max: i64,
    ) -> StorageResult<Record<T>> {
        parse_key(key)?;

        let over_limit = || StorageError::Validation(format!("{attribute} would exceed {max}"));
        if delta > max {
            return Err(over_limit());
        }

        let item = bounded(
            self.call_timeout,
            self.store.update_item(
                key,
                Mutation::Increment {
                    attribute: attribute.to_string(),
                    delta,
                    max,
                },
                WriteCondition::None,
            ),
        )
        .await
        .map_err(|err| precondition_error(err, over_limit()))?;

        tracing::debug!(pk = %key.partition_key, sk = %key.sort_key, attribute, delta, "Incremented record");

        decode_written(key, item)
    }
}

/// Maps a failed precondition to `on_condition_failed` and everything else to
/// `StoreUnavailable`
fn precondition_error(err: StoreError, on_condition_failed: StorageError) -> StorageError {
    match err {
        StoreError::ConditionFailed => on_condition_failed,
        other => other.into(),
    }
}

/// Decodes the item returned by a committed write
fn decode_written<T: DeserializeOwned>(key: &ItemKey, item: Item) -> StorageResult<Record<T>> {
    Record::from_item(item).inspect_err(|err| {
        tracing::error!(
            pk = %key.partition_key,
            sk = %key.sort_key,
            error = %err,
            "Write committed but the stored item could not be decoded"
        );
    })
}

/// Error for a decoded record whose key resolves to the wrong entity type
pub(crate) fn unexpected_entity(expected: EntityKind, found: &EntityRef) -> StorageError {
    StorageError::Serialization(format!("expected a {expected} record, found {found:?}"))
}
