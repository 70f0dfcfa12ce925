//! Key scheme for the single-table layout
//!
//! | Entity   | Partition key  | Sort key            |
//! |----------|----------------|---------------------|
//! | User     | `USER#u<id>`   | `META`              |
//! | Product  | `PRODUCTS`     | `PRODUCT#p<id>`     |
//! | CartItem | `USER#u<id>`   | `CART#p<productId>` |
//!
//! Ids are non-empty strings of ASCII digits. Anything else is a [`KeyError`].

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use strum::Display;
use thiserror::Error;

/// Partition holding every product record
pub const PRODUCTS_PARTITION: &str = "PRODUCTS";

/// Prefix of every user partition key
pub const USER_PARTITION_PREFIX: &str = "USER#u";

const USER_META_SORT_KEY: &str = "META";
const PRODUCT_SORT_KEY_PREFIX: &str = "PRODUCT#p";
const CART_SORT_KEY_PREFIX: &str = "CART#";
const CART_ITEM_SORT_KEY_PREFIX: &str = "CART#p";

/// Result type alias for key scheme operations
pub type KeyResult<T> = Result<T, KeyError>;

/// Entity reference outside the documented key domain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Id is empty or not purely numeric
    #[error("Malformed id {0:?}: expected a non-empty string of digits")]
    MalformedId(String),

    /// Cart item keys need both a user id and a product id
    #[error("{0} key requires a sub-id")]
    MissingSubId(EntityKind),

    /// User and product keys take a single id
    #[error("{0} key does not take a sub-id")]
    UnexpectedSubId(EntityKind),

    /// The (partition, sort) pair matches no entity layout
    #[error("Unrecognized key ({partition_key}, {sort_key})")]
    Unrecognized {
        /// Partition key as stored
        partition_key: String,
        /// Sort key as stored
        sort_key: String,
    },

    /// A stored item lacks its `pk` or `sk` string attribute
    #[error("Item is missing key attribute `{0}`")]
    MissingAttribute(KeyAttribute),
}

/// Entity types addressable through the key scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EntityKind {
    /// Account record
    User,
    /// Catalog record
    Product,
    /// One (user, product) line of a shopping cart
    #[strum(serialize = "Cart item")]
    CartItem,
}

/// Key attribute names of the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum KeyAttribute {
    /// Partition key
    Pk,
    /// Sort key
    Sk,
}

/// Composite primary key of a stored item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    /// Groups records
    pub partition_key: String,
    /// Orders and distinguishes records within a partition
    pub sort_key: String,
}

impl ItemKey {
    /// Creates a key from its two parts
    #[must_use]
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }

    /// Key attributes as they appear on a stored item
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            (
                KeyAttribute::Pk.to_string(),
                AttributeValue::S(self.partition_key.clone()),
            ),
            (
                KeyAttribute::Sk.to_string(),
                AttributeValue::S(self.sort_key.clone()),
            ),
        ])
    }

    /// Reads the key back out of a stored item
    ///
    /// # Errors
    ///
    /// Returns `KeyError::MissingAttribute` if `pk` or `sk` is absent or not a string
    pub fn from_item(item: &HashMap<String, AttributeValue>) -> KeyResult<Self> {
        let read = |attribute: KeyAttribute| {
            item.get(&attribute.to_string())
                .and_then(|value| value.as_s().ok())
                .cloned()
                .ok_or(KeyError::MissingAttribute(attribute))
        };

        Ok(Self {
            partition_key: read(KeyAttribute::Pk)?,
            sort_key: read(KeyAttribute::Sk)?,
        })
    }
}

/// Entity reference recovered from, or turned into, an [`ItemKey`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    /// `USER#u<id>` / `META`
    User {
        /// Numeric user id
        id: String,
    },
    /// `PRODUCTS` / `PRODUCT#p<id>`
    Product {
        /// Numeric product id
        id: String,
    },
    /// `USER#u<user_id>` / `CART#p<product_id>`
    CartItem {
        /// Numeric user id
        user_id: String,
        /// Numeric product id
        product_id: String,
    },
}

impl EntityRef {
    /// Entity type of this reference
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::User { .. } => EntityKind::User,
            Self::Product { .. } => EntityKind::Product,
            Self::CartItem { .. } => EntityKind::CartItem,
        }
    }

    /// Table key of the referenced record
    #[must_use]
    pub fn key(&self) -> ItemKey {
        match self {
            Self::User { id } => {
                ItemKey::new(format!("{USER_PARTITION_PREFIX}{id}"), USER_META_SORT_KEY)
            }
            Self::Product { id } => {
                ItemKey::new(PRODUCTS_PARTITION, format!("{PRODUCT_SORT_KEY_PREFIX}{id}"))
            }
            Self::CartItem {
                user_id,
                product_id,
            } => ItemKey::new(
                format!("{USER_PARTITION_PREFIX}{user_id}"),
                format!("{CART_ITEM_SORT_KEY_PREFIX}{product_id}"),
            ),
        }
    }
}

/// Derives the table key for an entity
///
/// # Errors
///
/// Returns `KeyError` if an id is not numeric, or if `sub_id` is missing for a cart item
/// or present for a user or product
pub fn key_of(kind: EntityKind, id: &str, sub_id: Option<&str>) -> KeyResult<ItemKey> {
    let id = numeric_id(id)?;
    let entity = match (kind, sub_id) {
        (EntityKind::User, None) => EntityRef::User { id },
        (EntityKind::Product, None) => EntityRef::Product { id },
        (EntityKind::CartItem, Some(product_id)) => EntityRef::CartItem {
            user_id: id,
            product_id: numeric_id(product_id)?,
        },
        (EntityKind::CartItem, None) => return Err(KeyError::MissingSubId(kind)),
        (EntityKind::User | EntityKind::Product, Some(_)) => {
            return Err(KeyError::UnexpectedSubId(kind))
        }
    };

    Ok(entity.key())
}

/// Sort-key prefix selecting every record of an entity type within its partition
#[must_use]
pub const fn prefix_of(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::User => USER_META_SORT_KEY,
        EntityKind::Product => PRODUCT_SORT_KEY_PREFIX,
        EntityKind::CartItem => CART_SORT_KEY_PREFIX,
    }
}

/// Partition key shared by a user's record and their cart items
///
/// # Errors
///
/// Returns `KeyError::MalformedId` if `user_id` is not numeric
pub fn user_partition(user_id: &str) -> KeyResult<String> {
    Ok(format!("{USER_PARTITION_PREFIX}{}", numeric_id(user_id)?))
}

/// Inverse of [`key_of`]
///
/// # Errors
///
/// Returns `KeyError` if the pair matches no entity layout or embeds a malformed id
pub fn parse_key(key: &ItemKey) -> KeyResult<EntityRef> {
    let unrecognized = || KeyError::Unrecognized {
        partition_key: key.partition_key.clone(),
        sort_key: key.sort_key.clone(),
    };

    if key.partition_key == PRODUCTS_PARTITION {
        let id = key
            .sort_key
            .strip_prefix(PRODUCT_SORT_KEY_PREFIX)
            .ok_or_else(unrecognized)?;
        return Ok(EntityRef::Product {
            id: numeric_id(id)?,
        });
    }

    let user_id = key
        .partition_key
        .strip_prefix(USER_PARTITION_PREFIX)
        .ok_or_else(unrecognized)?;
    let user_id = numeric_id(user_id)?;

    if key.sort_key == USER_META_SORT_KEY {
        return Ok(EntityRef::User { id: user_id });
    }

    let product_id = key
        .sort_key
        .strip_prefix(CART_ITEM_SORT_KEY_PREFIX)
        .ok_or_else(unrecognized)?;

    Ok(EntityRef::CartItem {
        user_id,
        product_id: numeric_id(product_id)?,
    })
}

fn numeric_id(id: &str) -> KeyResult<String> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(KeyError::MalformedId(id.to_string()));
    }
    Ok(id.to_string())
}
