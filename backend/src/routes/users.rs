use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shop_storage::user::{User, UserStorage};
use validator::Validate;

use crate::types::{AppError, ValidatedJson};

/// Request to create a new user
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    /// Numeric user id
    #[validate(custom(function = "validate_numeric_id"))]
    pub id: String,

    /// Display name
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
}

/// Request to rename a user
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    /// New display name
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
}

/// Ids are decimal digits only
pub(crate) fn validate_numeric_id(id: &str) -> Result<(), validator::ValidationError> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        let mut error = validator::ValidationError::new("invalid_id");
        error.message = Some(std::borrow::Cow::Borrowed("id must be a numeric string"));
        return Err(error);
    }
    Ok(())
}

/// Create a new user
///
/// # Returns
///
/// Returns `201 CREATED` with the created user
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Invalid id or name
/// - `409 CONFLICT` - A user with this id already exists
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn create_user(
    Extension(users): Extension<Arc<UserStorage>>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = users.create(&payload.id, &payload.name).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// List every user
///
/// Reads the whole table, so it is slower than the other user endpoints.
///
/// # Errors
///
/// Returns an error if:
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn list_users(
    Extension(users): Extension<Arc<UserStorage>>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(users.list().await?))
}

/// Get a user by id
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Non-numeric id
/// - `404 NOT_FOUND` - User does not exist
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn get_user(
    Path(id): Path<String>,
    Extension(users): Extension<Arc<UserStorage>>,
) -> Result<Json<User>, AppError> {
    Ok(Json(users.get(&id).await?))
}

/// Rename an existing user
///
/// Never creates the user.
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Invalid name
/// - `404 NOT_FOUND` - User does not exist
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn update_user(
    Path(id): Path<String>,
    Extension(users): Extension<Arc<UserStorage>>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    Ok(Json(users.update_name(&id, &payload.name).await?))
}

/// Delete a user
///
/// # Returns
///
/// Returns `200 OK` with the user as it was before deletion. Cart items are kept.
///
/// # Errors
///
/// Returns an error if:
/// - `404 NOT_FOUND` - User does not exist
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn delete_user(
    Path(id): Path<String>,
    Extension(users): Extension<Arc<UserStorage>>,
) -> Result<Json<User>, AppError> {
    Ok(Json(users.delete(&id).await?))
}
