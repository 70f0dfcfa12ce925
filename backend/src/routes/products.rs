use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use axum_valid::Valid;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shop_storage::product::{Product, ProductStorage, ProductUpdate};
use validator::Validate;

use crate::routes::users::validate_numeric_id;
use crate::types::{AppError, ValidatedJson};

/// Request to add a product to the catalog
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProductRequest {
    /// Numeric product id
    #[validate(custom(function = "validate_numeric_id"))]
    pub id: String,

    /// Display name
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,

    /// Unit price
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: f64,

    /// Units in stock
    pub amount_stock: u32,

    /// Image reference
    pub image: String,
}

/// Request to change catalog fields of a product; omitted fields are kept
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "validate_update_not_empty"))]
pub struct UpdateProductRequest {
    /// New display name
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: Option<String>,

    /// New unit price
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: Option<f64>,

    /// New stock level
    pub amount_stock: Option<u32>,
}

/// Query parameters for listing products
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct ListProductsQuery {
    /// Case-insensitive substring the product name must contain
    #[validate(length(max = 200))]
    pub q: Option<String>,
}

fn validate_update_not_empty(
    update: &UpdateProductRequest,
) -> Result<(), validator::ValidationError> {
    if update.name.is_none() && update.price.is_none() && update.amount_stock.is_none() {
        let mut error = validator::ValidationError::new("empty_update");
        error.message = Some(std::borrow::Cow::Borrowed(
            "at least one of name, price or amountStock is required",
        ));
        return Err(error);
    }
    Ok(())
}

/// Create a product
///
/// # Returns
///
/// Returns `201 CREATED` with the created product
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Invalid product fields
/// - `409 CONFLICT` - A product with this id already exists
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn create_product(
    Extension(products): Extension<Arc<ProductStorage>>,
    ValidatedJson(payload): ValidatedJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = products
        .create(Product {
            id: payload.id,
            name: payload.name,
            price: payload.price,
            amount_stock: payload.amount_stock,
            image: payload.image,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// List the catalog
///
/// With `q` set, only products whose name contains `q` (ignoring case) are returned.
/// Results are ordered by sort key.
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Query too long
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn list_products(
    Extension(products): Extension<Arc<ProductStorage>>,
    Valid(Query(query)): Valid<Query<ListProductsQuery>>,
) -> Result<Json<Vec<Product>>, AppError> {
    let result = match query.q.as_deref() {
        Some(q) if !q.is_empty() => products.search(q).await?,
        _ => products.list().await?,
    };

    Ok(Json(result))
}

/// Get a product by id
///
/// # Errors
///
/// Returns an error if:
/// - `404 NOT_FOUND` - Product does not exist
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn get_product(
    Path(id): Path<String>,
    Extension(products): Extension<Arc<ProductStorage>>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(products.get(&id).await?))
}

/// Update an existing product
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Empty update or invalid fields
/// - `404 NOT_FOUND` - Product does not exist
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn update_product(
    Path(id): Path<String>,
    Extension(products): Extension<Arc<ProductStorage>>,
    ValidatedJson(payload): ValidatedJson<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    let update = ProductUpdate {
        name: payload.name,
        price: payload.price,
        amount_stock: payload.amount_stock,
    };

    Ok(Json(products.update(&id, update).await?))
}

/// Delete a product
///
/// # Returns
///
/// Returns `200 OK` with the product as it was before deletion
///
/// # Errors
///
/// Returns an error if:
/// - `404 NOT_FOUND` - Product does not exist
/// - `503 SERVICE_UNAVAILABLE` - Store connectivity issues
pub async fn delete_product(
    Path(id): Path<String>,
    Extension(products): Extension<Arc<ProductStorage>>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(products.delete(&id).await?))
}
