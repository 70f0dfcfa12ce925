//! User account storage
//!
//! One `META` record per user under `USER#u<id>`. `name` is the only mutable field.
//! Users live in separate partitions, so listing them is a table scan.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};
use crate::gateway::{unexpected_entity, ConditionalWriteGateway, Record};
use crate::key::{key_of, prefix_of, EntityKind, EntityRef, USER_PARTITION_PREFIX};
use crate::scanner::RangeScanner;

/// User account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct User {
    /// Numeric user id
    pub id: String,
    /// Display name
    pub name: String,
}

/// Non-key attributes of a user record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserAttributes {
    pub name: String,
}

impl User {
    pub(crate) fn from_record(record: Record<UserAttributes>) -> StorageResult<Self> {
        match record.entity {
            EntityRef::User { id } => Ok(Self {
                id,
                name: record.attributes.name,
            }),
            other => Err(unexpected_entity(EntityKind::User, &other)),
        }
    }
}

/// Storage client for user operations
pub struct UserStorage {
    gateway: Arc<ConditionalWriteGateway>,
    scanner: Arc<RangeScanner>,
}

impl UserStorage {
    /// Creates a new storage instance
    #[must_use]
    pub const fn new(gateway: Arc<ConditionalWriteGateway>, scanner: Arc<RangeScanner>) -> Self {
        Self { gateway, scanner }
    }

    /// Creates a user, failing if the id is taken
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the user exists, `StorageError::Validation`
    /// for an empty name, or `StorageError::MalformedKey` for a non-numeric id
    pub async fn create(&self, id: &str, name: &str) -> StorageResult<User> {
        let key = key_of(EntityKind::User, id, None)?;
        let attributes = UserAttributes {
            name: non_empty_name(name)?,
        };

        let record = self.gateway.create_if_absent(&key, attributes).await?;
        tracing::info!(user_id = %id, "User created");

        User::from_record(record)
    }

    /// Gets a user by id
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist
    pub async fn get(&self, id: &str) -> StorageResult<User> {
        let key = key_of(EntityKind::User, id, None)?;
        User::from_record(self.gateway.get_by_key(&key).await?)
    }

    /// Every user, ordered by partition key
    ///
    /// # Errors
    ///
    /// Returns `StorageError::StoreUnavailable` if the table scan fails
    pub async fn list(&self) -> StorageResult<Vec<User>> {
        self.scanner
            .scan_all::<UserAttributes>(USER_PARTITION_PREFIX, prefix_of(EntityKind::User))
            .await?
            .into_iter()
            .map(User::from_record)
            .collect()
    }

    /// Renames an existing user
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist, or
    /// `StorageError::Validation` for an empty name
    pub async fn update_name(&self, id: &str, name: &str) -> StorageResult<User> {
        let key = key_of(EntityKind::User, id, None)?;
        let mutation = UserAttributes {
            name: non_empty_name(name)?,
        };

        User::from_record(self.gateway.update_if_exists(&key, &mutation).await?)
    }

    /// Deletes a user, returning the record as it was
    ///
    /// Cart items under the user's partition are left in place.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist
    pub async fn delete(&self, id: &str) -> StorageResult<User> {
        let key = key_of(EntityKind::User, id, None)?;
        let record = self.gateway.delete_if_exists(&key).await?;
        tracing::info!(user_id = %id, "User deleted");

        User::from_record(record)
    }
}

fn non_empty_name(name: &str) -> StorageResult<String> {
    if name.trim().is_empty() {
        return Err(StorageError::Validation("name must not be empty".to_string()));
    }
    Ok(name.to_string())
}
