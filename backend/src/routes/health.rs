use std::sync::Arc;

use axum::{http::StatusCode, Extension, Json};
use schemars::JsonSchema;
use serde::Serialize;
use shop_storage::{user::UserStorage, StorageError};

/// Whether the table answered a point read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    /// The read completed
    Reachable,
    /// The read failed or timed out
    Unreachable,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct HealthResponse {
    /// Table reachability
    store: StoreStatus,
    /// Current version of the application
    semver: String,
    /// Commit hash of the current build (if available)
    rev: Option<String>,
}

/// Health check endpoint
///
/// Reads one user key. Any answer from the table, a miss included, counts as reachable.
///
/// # Returns
///
/// `200 OK` when the store is reachable, `503 SERVICE_UNAVAILABLE` otherwise
pub async fn handler(
    Extension(users): Extension<Arc<UserStorage>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (status, store) = match users.get("0").await {
        Ok(_) | Err(StorageError::NotFound(_)) => (StatusCode::OK, StoreStatus::Reachable),
        Err(err) => {
            tracing::warn!(error = %err, "Store health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, StoreStatus::Unreachable)
        }
    };

    let body = HealthResponse {
        store,
        semver: env!("CARGO_PKG_VERSION").to_string(),
        rev: option_env!("GIT_REV").map(ToString::to_string),
    };

    (status, Json(body))
}
