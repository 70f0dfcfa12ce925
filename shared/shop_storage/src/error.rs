//! Error types for shop storage operations

use thiserror::Error;

use crate::key::{EntityKind, KeyError};
use crate::store::StoreError;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by the gateway, scanner and entity storages
#[derive(Debug, Error)]
pub enum StorageError {
    /// Input failed a shape or range constraint before reaching the store
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Existence precondition failed on read, update or delete
    #[error("{0} not found")]
    NotFound(EntityKind),

    /// Absence precondition failed on create
    #[error("{0} already exists")]
    AlreadyExists(EntityKind),

    /// Transport or server fault, including call timeouts
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A bulk operation removed fewer items than it found
    #[error("Bulk operation incomplete: removed {removed} of {requested}")]
    PartialFailure {
        /// Number of items the operation tried to remove
        requested: usize,
        /// Number of items actually removed
        removed: usize,
    },

    /// Entity reference outside the key scheme's domain
    #[error(transparent)]
    MalformedKey(#[from] KeyError),

    /// Stored item could not be converted to or from a record
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_dynamo::Error> for StorageError {
    fn from(err: serde_dynamo::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Store faults that survive the gateway's precondition mapping become `StoreUnavailable`
impl From<StoreError> for StorageError {
    fn from(err: StoreError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}
