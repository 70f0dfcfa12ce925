//! Product catalog storage
//!
//! Every product lives in the `PRODUCTS` partition under `PRODUCT#p<id>`, so listing the
//! catalog is a single prefix scan.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};
use crate::gateway::{unexpected_entity, ConditionalWriteGateway, Record};
use crate::key::{key_of, prefix_of, EntityKind, EntityRef, PRODUCTS_PARTITION};
use crate::scanner::RangeScanner;

/// Catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Numeric product id
    pub id: String,
    /// Display name
    pub name: String,
    /// Unit price, never negative
    pub price: f64,
    /// Units in stock
    pub amount_stock: u32,
    /// Image reference
    pub image: String,
}

/// Fields changed by [`ProductStorage::update`]; `None` leaves a field as stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    /// New display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New unit price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// New stock level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_stock: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductAttributes {
    name: String,
    price: f64,
    amount_stock: u32,
    image: String,
}

impl Product {
    fn from_record(record: Record<ProductAttributes>) -> StorageResult<Self> {
        let Record { entity, attributes } = record;
        match entity {
            EntityRef::Product { id } => Ok(Self {
                id,
                name: attributes.name,
                price: attributes.price,
                amount_stock: attributes.amount_stock,
                image: attributes.image,
            }),
            other => Err(unexpected_entity(EntityKind::Product, &other)),
        }
    }
}

/// Storage client for catalog operations
pub struct ProductStorage {
    gateway: Arc<ConditionalWriteGateway>,
    scanner: Arc<RangeScanner>,
}

impl ProductStorage {
    /// Creates a new storage instance
    #[must_use]
    pub const fn new(gateway: Arc<ConditionalWriteGateway>, scanner: Arc<RangeScanner>) -> Self {
        Self { gateway, scanner }
    }

    /// Creates a product, failing if the id is taken
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the product exists, or
    /// `StorageError::Validation` for an empty name or a negative price
    pub async fn create(&self, product: Product) -> StorageResult<Product> {
        let key = key_of(EntityKind::Product, &product.id, None)?;
        validate_name(&product.name)?;
        validate_price(product.price)?;

        let attributes = ProductAttributes {
            name: product.name,
            price: product.price,
            amount_stock: product.amount_stock,
            image: product.image,
        };

        let record = self.gateway.create_if_absent(&key, attributes).await?;
        tracing::info!(product_id = %product.id, "Product created");

        Product::from_record(record)
    }

    /// Gets a product by id
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the product does not exist
    pub async fn get(&self, id: &str) -> StorageResult<Product> {
        let key = key_of(EntityKind::Product, id, None)?;
        Product::from_record(self.gateway.get_by_key(&key).await?)
    }

    /// Every product, ordered by sort key
    ///
    /// # Errors
    ///
    /// Returns `StorageError::StoreUnavailable` if the scan fails
    pub async fn list(&self) -> StorageResult<Vec<Product>> {
        self.scanner
            .scan(PRODUCTS_PARTITION, prefix_of(EntityKind::Product))
            .await?
            .into_iter()
            .map(Product::from_record)
            .collect()
    }

    /// Products whose name contains `query`, ignoring case
    ///
    /// There is no text index: this scans the whole catalog and filters in memory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::StoreUnavailable` if the scan fails
    pub async fn search(&self, query: &str) -> StorageResult<Vec<Product>> {
        let needle = query.to_lowercase();
        let mut products = self.list().await?;
        products.retain(|product| product.name.to_lowercase().contains(&needle));
        Ok(products)
    }

    /// Applies `update` to an existing product
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the product does not exist, or
    /// `StorageError::Validation` if the update is empty or carries invalid values
    pub async fn update(&self, id: &str, update: ProductUpdate) -> StorageResult<Product> {
        let key = key_of(EntityKind::Product, id, None)?;
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(price) = update.price {
            validate_price(price)?;
        }

        let record = self.gateway.update_if_exists(&key, &update).await?;
        tracing::info!(product_id = %id, "Product updated");

        Product::from_record(record)
    }

    /// Deletes a product, returning the record as it was
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the product does not exist
    pub async fn delete(&self, id: &str) -> StorageResult<Product> {
        let key = key_of(EntityKind::Product, id, None)?;
        let record = self.gateway.delete_if_exists(&key).await?;
        tracing::info!(product_id = %id, "Product deleted");

        Product::from_record(record)
    }
}

fn validate_name(name: &str) -> StorageResult<()> {
    if name.trim().is_empty() {
        return Err(StorageError::Validation("name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_price(price: f64) -> StorageResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(StorageError::Validation(
            "price must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}
