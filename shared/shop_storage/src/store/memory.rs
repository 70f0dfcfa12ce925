//! In-memory [`KeyValueStore`] for tests
//!
//! A single mutex serializes every call, which gives the same per-key write ordering the
//! real table provides. Items are kept in a `BTreeMap` so prefix queries come back in
//! sort-key order.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use tokio::sync::Mutex;

use super::{Item, KeyValueStore, Mutation, StoreError, StoreResult, WriteCondition};
use crate::key::ItemKey;

/// Process-local table keyed by (partition key, sort key)
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<ItemKey, Item>>,
}

impl MemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items across all partitions
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Whether the store holds no items
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    fn check(condition: WriteCondition, exists: bool) -> StoreResult<()> {
        match (condition, exists) {
            (WriteCondition::Exists, false) | (WriteCondition::NotExists, true) => {
                Err(StoreError::ConditionFailed)
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &ItemKey) -> StoreResult<Option<Item>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn put_item(
        &self,
        key: &ItemKey,
        attributes: Item,
        condition: WriteCondition,
    ) -> StoreResult<()> {
        let mut items = self.items.lock().await;
        Self::check(condition, items.contains_key(key))?;

        let mut item = attributes;
        item.extend(key.to_attributes());
        items.insert(key.clone(), item);

        Ok(())
    }

    async fn update_item(
        &self,
        key: &ItemKey,
        mutation: Mutation,
        condition: WriteCondition,
    ) -> StoreResult<Item> {
        let mut items = self.items.lock().await;
        Self::check(condition, items.contains_key(key))?;

        let mut item = items.get(key).cloned().unwrap_or_else(|| key.to_attributes());

        match mutation {
            Mutation::Set(attributes) => item.extend(attributes),
            Mutation::Increment {
                attribute,
                delta,
                max,
            } => {
                let current = match item.get(&attribute) {
                    None => 0,
                    Some(AttributeValue::N(n)) => n.parse::<i64>().map_err(|e| {
                        StoreError::Unavailable(format!("attribute `{attribute}` is not an integer: {e}"))
                    })?,
                    Some(_) => {
                        return Err(StoreError::Unavailable(format!(
                            "attribute `{attribute}` is not a number"
                        )))
                    }
                };
                let next = current
                    .checked_add(delta)
                    .filter(|next| *next <= max)
                    .ok_or(StoreError::ConditionFailed)?;
                item.insert(attribute, AttributeValue::N(next.to_string()));
            }
        }

        items.insert(key.clone(), item.clone());
        Ok(item)
    }

    async fn delete_item(
        &self,
        key: &ItemKey,
        condition: WriteCondition,
    ) -> StoreResult<Option<Item>> {
        let mut items = self.items.lock().await;
        Self::check(condition, items.contains_key(key))?;

        Ok(items.remove(key))
    }

    async fn query_prefix(
        &self,
        partition_key: &str,
        sort_key_prefix: &str,
    ) -> StoreResult<Vec<Item>> {
        let items = self.items.lock().await;
        let start = ItemKey::new(partition_key, sort_key_prefix);

        Ok(items
            .range(start..)
            .take_while(|(key, _)| {
                key.partition_key == partition_key && key.sort_key.starts_with(sort_key_prefix)
            })
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn scan_matching(
        &self,
        partition_key_prefix: &str,
        sort_key: &str,
    ) -> StoreResult<Vec<Item>> {
        let items = self.items.lock().await;

        Ok(items
            .iter()
            .filter(|(key, _)| {
                key.partition_key.starts_with(partition_key_prefix) && key.sort_key == sort_key
            })
            .map(|(_, item)| item.clone())
            .collect())
    }
}
