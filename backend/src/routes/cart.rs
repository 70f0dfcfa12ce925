use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shop_storage::cart::{Cart, CartAggregator, CartItem, ClearOutcome, MAX_AMOUNT};
use validator::Validate;

use crate::routes::users::validate_numeric_id;
use crate::types::{AppError, ValidatedJson};

/// Path of a single cart line
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CartItemPath {
    /// Owner of the cart
    pub user_id: String,
    /// Product in the cart
    pub product_id: String,
}

/// Request to add units of a product to a cart
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddToCartRequest {
    /// Product to add
    #[validate(custom(function = "validate_numeric_id"))]
    pub product_id: String,

    /// Units to add on top of what is already in the cart
    #[validate(range(min = 1, max = MAX_AMOUNT, message = "amount must be between 1 and 1000000"))]
    pub amount: u32,
}

/// Request to overwrite the amount of a cart line
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct SetAmountRequest {
    /// New number of units
    #[validate(range(min = 1, max = MAX_AMOUNT, message = "amount must be between 1 and 1000000"))]
    pub amount: u32,
}

/// Get a user's cart
///
/// # Returns
///
/// Returns `200 OK` with the user's name and cart lines ordered by sort key
///
/// # Errors
///
/// Returns an error if:
/// - `404 NOT_FOUND` - User does not exist
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn get_cart(
    Path(user_id): Path<String>,
    Extension(cart): Extension<Arc<CartAggregator>>,
) -> Result<Json<Cart>, AppError> {
    Ok(Json(cart.get_cart(&user_id).await?))
}

/// Add units of a product to a user's cart
///
/// Concurrent adds for the same product accumulate; none are lost.
///
/// # Returns
///
/// Returns `200 OK` with the merged cart line
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Invalid ids or amount, or the line would exceed the maximum amount
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn add_to_cart(
    Path(user_id): Path<String>,
    Extension(cart): Extension<Arc<CartAggregator>>,
    ValidatedJson(payload): ValidatedJson<AddToCartRequest>,
) -> Result<Json<CartItem>, AppError> {
    let item = cart
        .add_or_increment(&user_id, &payload.product_id, payload.amount)
        .await?;

    Ok(Json(item))
}

/// Overwrite the amount of a cart line
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Invalid amount
/// - `404 NOT_FOUND` - Product is not in the cart
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn set_cart_item_amount(
    Path(path): Path<CartItemPath>,
    Extension(cart): Extension<Arc<CartAggregator>>,
    ValidatedJson(payload): ValidatedJson<SetAmountRequest>,
) -> Result<Json<CartItem>, AppError> {
    let item = cart
        .set_amount(&path.user_id, &path.product_id, payload.amount)
        .await?;

    Ok(Json(item))
}

/// Remove a line from a user's cart
///
/// # Returns
///
/// Returns `200 OK` with the line as it was before removal
///
/// # Errors
///
/// Returns an error if:
/// - `404 NOT_FOUND` - Product is not in the cart
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn remove_cart_item(
    Path(path): Path<CartItemPath>,
    Extension(cart): Extension<Arc<CartAggregator>>,
) -> Result<Json<CartItem>, AppError> {
    Ok(Json(
        cart.remove_one(&path.user_id, &path.product_id).await?,
    ))
}

/// Empty a user's cart
///
/// Lines are deleted one by one, so a fault can leave the cart partially cleared.
///
/// # Returns
///
/// Returns `200 OK` with `{requested, removed}` when every line was removed
///
/// # Errors
///
/// Returns an error if:
/// - `500 INTERNAL_SERVER_ERROR` - Some lines could not be removed; the body carries the counts
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn clear_cart(
    Path(user_id): Path<String>,
    Extension(cart): Extension<Arc<CartAggregator>>,
) -> Result<Json<ClearOutcome>, AppError> {
    let outcome = cart.clear_cart(&user_id).await?.into_result()?;

    Ok(Json(outcome))
}
