//! Shopping cart aggregation
//!
//! A cart is the set of `CART#p<productId>` records under the user's partition. A
//! missing record means the product is not in the cart; amounts stay within
//! `1..=MAX_AMOUNT`.
//!
//! ```text
//! Absent --add_or_increment(k)--> Present(k)
//! Present(a) --add_or_increment(k)--> Present(a + k)
//! Present(a) --set_amount(v)--> Present(v)
//! Present(a) --remove_one--> Absent
//! ```

use std::sync::Arc;

use futures::future::join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{StorageError, StorageResult};
use crate::gateway::{unexpected_entity, ConditionalWriteGateway, Record};
use crate::key::{key_of, prefix_of, user_partition, EntityKind, EntityRef};
use crate::scanner::RangeScanner;
use crate::user::{User, UserAttributes};

/// Largest number of units one cart line may hold
pub const MAX_AMOUNT: u32 = 1_000_000;

/// Non-key attribute names of a cart item record
#[derive(Debug, Clone, Copy, Display)]
#[strum(serialize_all = "camelCase")]
pub enum CartItemAttribute {
    /// Number of units, at least 1
    Amount,
}

/// One product line in a user's cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Owner of the cart
    pub user_id: String,
    /// Product in the cart
    pub product_id: String,
    /// Number of units, at least 1
    pub amount: u32,
}

/// A user together with the contents of their cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Owner of the cart
    pub user_id: String,
    /// Owner's display name
    pub name: String,
    /// Cart lines ordered by sort key
    pub items: Vec<CartItem>,
}

/// Result of [`CartAggregator::clear_cart`]
///
/// Clearing is one delete per item, not a transaction, so `removed` can fall short of
/// `requested`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClearOutcome {
    /// Items found in the cart when clearing started
    pub requested: usize,
    /// Items this call actually deleted
    pub removed: usize,
}

impl ClearOutcome {
    /// Whether every item found was deleted
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.removed == self.requested
    }

    /// Turns an incomplete outcome into `StorageError::PartialFailure`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PartialFailure` if fewer items were removed than requested
    pub fn into_result(self) -> StorageResult<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(StorageError::PartialFailure {
                requested: self.requested,
                removed: self.removed,
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CartItemAttributes {
    amount: u32,
}

impl CartItem {
    fn from_record(record: Record<CartItemAttributes>) -> StorageResult<Self> {
        match record.entity {
            EntityRef::CartItem {
                user_id,
                product_id,
            } => Ok(Self {
                user_id,
                product_id,
                amount: record.attributes.amount,
            }),
            other => Err(unexpected_entity(EntityKind::CartItem, &other)),
        }
    }
}

/// Cart operations built on the conditional write gateway
pub struct CartAggregator {
    gateway: Arc<ConditionalWriteGateway>,
    scanner: Arc<RangeScanner>,
}

impl CartAggregator {
    /// Creates a new aggregator
    #[must_use]
    pub const fn new(gateway: Arc<ConditionalWriteGateway>, scanner: Arc<RangeScanner>) -> Self {
        Self { gateway, scanner }
    }

    /// Adds `amount` units of a product to the cart in one atomic update
    ///
    /// A missing line starts at zero, so concurrent callers never lose each other's units.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Validation` if `amount` is zero or the line would end up
    /// above [`MAX_AMOUNT`], or `StorageError::StoreUnavailable` on store faults
    pub async fn add_or_increment(
        &self,
        user_id: &str,
        product_id: &str,
        amount: u32,
    ) -> StorageResult<CartItem> {
        let key = key_of(EntityKind::CartItem, user_id, Some(product_id))?;
        ensure_amount(amount)?;

        let record = self
            .gateway
            .increment(
                &key,
                &CartItemAttribute::Amount.to_string(),
                i64::from(amount),
                i64::from(MAX_AMOUNT),
            )
            .await?;

        CartItem::from_record(record)
    }

    /// Overwrites the amount of an existing cart line (last writer wins)
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the product is not in the cart, or
    /// `StorageError::Validation` if `amount` is outside `1..=MAX_AMOUNT`
    pub async fn set_amount(
        &self,
        user_id: &str,
        product_id: &str,
        amount: u32,
    ) -> StorageResult<CartItem> {
        let key = key_of(EntityKind::CartItem, user_id, Some(product_id))?;
        ensure_amount(amount)?;

        let record = self
            .gateway
            .update_if_exists(&key, &CartItemAttributes { amount })
            .await?;

        CartItem::from_record(record)
    }

    /// Removes one line from the cart, returning it as it was
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the product is not in the cart
    pub async fn remove_one(&self, user_id: &str, product_id: &str) -> StorageResult<CartItem> {
        let key = key_of(EntityKind::CartItem, user_id, Some(product_id))?;
        CartItem::from_record(self.gateway.delete_if_exists(&key).await?)
    }

    /// Every line in the user's cart, ordered by sort key
    ///
    /// # Errors
    ///
    /// Returns `StorageError::StoreUnavailable` if the scan fails
    pub async fn list_items(&self, user_id: &str) -> StorageResult<Vec<CartItem>> {
        let partition = user_partition(user_id)?;

        self.scanner
            .scan(&partition, prefix_of(EntityKind::CartItem))
            .await?
            .into_iter()
            .map(CartItem::from_record)
            .collect()
    }

    /// The user's record and cart lines
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist
    pub async fn get_cart(&self, user_id: &str) -> StorageResult<Cart> {
        let user_key = key_of(EntityKind::User, user_id, None)?;
        let user = User::from_record(self.gateway.get_by_key::<UserAttributes>(&user_key).await?)?;
        let items = self.list_items(user_id).await?;

        Ok(Cart {
            user_id: user.id,
            name: user.name,
            items,
        })
    }

    /// Deletes every line in the user's cart
    ///
    /// The deletes are issued concurrently and independently. A failure on one line does
    /// not stop the others; it shows up as `removed < requested`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::StoreUnavailable` only if listing the cart fails
    pub async fn clear_cart(&self, user_id: &str) -> StorageResult<ClearOutcome> {
        let partition = user_partition(user_id)?;
        let records: Vec<Record<CartItemAttributes>> = self
            .scanner
            .scan(&partition, prefix_of(EntityKind::CartItem))
            .await?;

        let requested = records.len();
        let deletions = records.into_iter().map(|record| async move {
            let key = record.entity.key();
            let result = self
                .gateway
                .delete_if_exists::<CartItemAttributes>(&key)
                .await;
            result.map_err(|err| (key, err))
        });

        let mut removed = 0;
        for result in join_all(deletions).await {
            match result {
                Ok(_) => removed += 1,
                Err((key, err)) => {
                    tracing::warn!(pk = %key.partition_key, sk = %key.sort_key, error = %err, "Failed to delete cart item");
                }
            }
        }

        let outcome = ClearOutcome { requested, removed };
        if outcome.is_complete() {
            tracing::info!(user_id = %user_id, removed, "Cart cleared");
        } else {
            tracing::warn!(user_id = %user_id, requested, removed, "Cart partially cleared");
        }

        Ok(outcome)
    }
}

fn ensure_amount(amount: u32) -> StorageResult<()> {
    if !(1..=MAX_AMOUNT).contains(&amount) {
        return Err(StorageError::Validation(format!(
            "amount must be between 1 and {MAX_AMOUNT}"
        )));
    }
    Ok(())
}
