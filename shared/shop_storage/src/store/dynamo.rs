//! `DynamoDB` implementation of [`KeyValueStore`]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::{ProvideErrorMetadata, SdkError},
    types::{AttributeValue, ReturnValue},
    Client as DynamoDbClient,
};
use tracing::debug;

use super::{Item, KeyValueStore, Mutation, StoreError, StoreResult, WriteCondition};
use crate::key::{ItemKey, KeyAttribute};

/// Store client for the shop's single `DynamoDB` table
pub struct DynamoDbStore {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
}

/// Expression pieces for an `UpdateItem` request
#[derive(Debug, Default)]
struct UpdatePlan {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
    condition: Option<String>,
}

impl UpdatePlan {
    fn from_mutation(mutation: Mutation) -> Self {
        let mut plan = Self::default();

        match mutation {
            Mutation::Set(attributes) => {
                // Sorted so the same mutation always renders the same expression
                let mut attributes: Vec<_> = attributes.into_iter().collect();
                attributes.sort_by(|a, b| a.0.cmp(&b.0));

                let clauses: Vec<String> = attributes
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, value))| {
                        plan.names.insert(format!("#a{i}"), name);
                        plan.values.insert(format!(":v{i}"), value);
                        format!("#a{i} = :v{i}")
                    })
                    .collect();

                plan.expression = format!("SET {}", clauses.join(", "));
            }
            Mutation::Increment {
                attribute,
                delta,
                max,
            } => {
                plan.expression = "SET #attr = if_not_exists(#attr, :zero) + :delta".to_string();
                // Checked against the value before the update
                plan.condition =
                    Some("(attribute_not_exists(#attr) OR #attr <= :ceiling)".to_string());
                plan.names.insert("#attr".to_string(), attribute);
                plan.values
                    .insert(":zero".to_string(), AttributeValue::N("0".to_string()));
                plan.values
                    .insert(":delta".to_string(), AttributeValue::N(delta.to_string()));
                plan.values.insert(
                    ":ceiling".to_string(),
                    AttributeValue::N(max.saturating_sub(delta).to_string()),
                );
            }
        }

        plan
    }
}

impl DynamoDbStore {
    /// Creates a new store client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured `DynamoDB` client
    /// * `table_name` - Table with string `pk` (hash) and `sk` (range) keys
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>, table_name: String) -> Self {
        Self {
            dynamodb_client,
            table_name,
        }
    }

    /// Condition expression for a precondition, referencing `#pk`
    const fn condition_expression(condition: WriteCondition) -> Option<&'static str> {
        match condition {
            WriteCondition::None => None,
            WriteCondition::Exists => Some("attribute_exists(#pk)"),
            WriteCondition::NotExists => Some("attribute_not_exists(#pk)"),
        }
    }
}

fn unavailable<E: std::fmt::Debug>(err: E) -> StoreError {
    StoreError::Unavailable(format!("{err:?}"))
}

/// Maps a conditional write's SDK error, keeping a failed precondition distinct
fn write_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::fmt::Debug,
    R: std::fmt::Debug,
{
    if err.code() == Some("ConditionalCheckFailedException") {
        StoreError::ConditionFailed
    } else {
        unavailable(err)
    }
}

#[async_trait]
impl KeyValueStore for DynamoDbStore {
    async fn get_item(&self, key: &ItemKey) -> StoreResult<Option<Item>> {
        debug!(table = %self.table_name, pk = %key.partition_key, sk = %key.sort_key, "get_item");

        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(key.to_attributes()))
            .consistent_read(true)
            .send()
            .await
            .map_err(unavailable)?;

        Ok(response.item)
    }

    async fn put_item(
        &self,
        key: &ItemKey,
        attributes: Item,
        condition: WriteCondition,
    ) -> StoreResult<()> {
        debug!(table = %self.table_name, pk = %key.partition_key, sk = %key.sort_key, ?condition, "put_item");

        let mut item = attributes;
        item.extend(key.to_attributes());

        let mut request = self
            .dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item));

        if let Some(expression) = Self::condition_expression(condition) {
            request = request
                .condition_expression(expression)
                .expression_attribute_names("#pk", KeyAttribute::Pk.to_string());
        }

        request.send().await.map_err(write_error)?;

        Ok(())
    }

    async fn update_item(
        &self,
        key: &ItemKey,
        mutation: Mutation,
        condition: WriteCondition,
    ) -> StoreResult<Item> {
        debug!(table = %self.table_name, pk = %key.partition_key, sk = %key.sort_key, ?condition, "update_item");

        let mut plan = UpdatePlan::from_mutation(mutation);
        let key_condition = Self::condition_expression(condition);
        if key_condition.is_some() {
            plan.names
                .insert("#pk".to_string(), KeyAttribute::Pk.to_string());
        }
        let condition_expression = match (key_condition, plan.condition.take()) {
            (Some(key), Some(attribute)) => Some(format!("{key} AND {attribute}")),
            (Some(key), None) => Some(key.to_string()),
            (None, attribute) => attribute,
        };

        let response = self
            .dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(key.to_attributes()))
            .update_expression(plan.expression)
            .set_condition_expression(condition_expression)
            .set_expression_attribute_names(Some(plan.names))
            .set_expression_attribute_values(Some(plan.values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(write_error)?;

        response
            .attributes
            .ok_or_else(|| StoreError::Unavailable("UpdateItem returned no attributes".to_string()))
    }

    async fn delete_item(
        &self,
        key: &ItemKey,
        condition: WriteCondition,
    ) -> StoreResult<Option<Item>> {
        debug!(table = %self.table_name, pk = %key.partition_key, sk = %key.sort_key, ?condition, "delete_item");

        let mut request = self
            .dynamodb_client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(key.to_attributes()))
            .return_values(ReturnValue::AllOld);

        if let Some(expression) = Self::condition_expression(condition) {
            request = request
                .condition_expression(expression)
                .expression_attribute_names("#pk", KeyAttribute::Pk.to_string());
        }

        let response = request.send().await.map_err(write_error)?;

        Ok(response.attributes)
    }

    async fn query_prefix(
        &self,
        partition_key: &str,
        sort_key_prefix: &str,
    ) -> StoreResult<Vec<Item>> {
        debug!(table = %self.table_name, pk = %partition_key, prefix = %sort_key_prefix, "query_prefix");

        // begins_with rejects an empty operand, so an empty prefix queries the whole partition
        let key_condition = if sort_key_prefix.is_empty() {
            "#pk = :pk"
        } else {
            "#pk = :pk AND begins_with(#sk, :prefix)"
        };

        let mut items = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let mut request = self
                .dynamodb_client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression(key_condition)
                .expression_attribute_names("#pk", KeyAttribute::Pk.to_string())
                .expression_attribute_values(":pk", AttributeValue::S(partition_key.to_string()))
                .scan_index_forward(true)
                .consistent_read(true)
                .set_exclusive_start_key(exclusive_start_key.take());

            if !sort_key_prefix.is_empty() {
                request = request
                    .expression_attribute_names("#sk", KeyAttribute::Sk.to_string())
                    .expression_attribute_values(
                        ":prefix",
                        AttributeValue::S(sort_key_prefix.to_string()),
                    );
            }

            let response = request.send().await.map_err(unavailable)?;

            items.extend(response.items.unwrap_or_default());

            match response.last_evaluated_key {
                Some(last_key) if !last_key.is_empty() => exclusive_start_key = Some(last_key),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn scan_matching(
        &self,
        partition_key_prefix: &str,
        sort_key: &str,
    ) -> StoreResult<Vec<Item>> {
        debug!(table = %self.table_name, pk_prefix = %partition_key_prefix, sk = %sort_key, "scan_matching");

        let mut items = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let response = self
                .dynamodb_client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("begins_with(#pk, :pk_prefix) AND #sk = :sk")
                .expression_attribute_names("#pk", KeyAttribute::Pk.to_string())
                .expression_attribute_names("#sk", KeyAttribute::Sk.to_string())
                .expression_attribute_values(
                    ":pk_prefix",
                    AttributeValue::S(partition_key_prefix.to_string()),
                )
                .expression_attribute_values(":sk", AttributeValue::S(sort_key.to_string()))
                .consistent_read(true)
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await
                .map_err(unavailable)?;

            items.extend(response.items.unwrap_or_default());

            match response.last_evaluated_key {
                Some(last_key) if !last_key.is_empty() => exclusive_start_key = Some(last_key),
                _ => break,
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_plan_is_deterministic() {
        let attributes = HashMap::from([
            ("price".to_string(), AttributeValue::N("10".to_string())),
            ("name".to_string(), AttributeValue::S("Mug".to_string())),
        ]);

        let plan = UpdatePlan::from_mutation(Mutation::Set(attributes));

        assert_eq!(plan.expression, "SET #a0 = :v0, #a1 = :v1");
        assert_eq!(plan.names.get("#a0").map(String::as_str), Some("name"));
        assert_eq!(plan.names.get("#a1").map(String::as_str), Some("price"));
        assert_eq!(
            plan.values.get(":v0"),
            Some(&AttributeValue::S("Mug".to_string()))
        );
    }

    #[test]
    fn test_increment_plan_defaults_to_zero() {
        let plan = UpdatePlan::from_mutation(Mutation::Increment {
            attribute: "amount".to_string(),
            delta: 3,
            max: 10,
        });

        assert_eq!(
            plan.expression,
            "SET #attr = if_not_exists(#attr, :zero) + :delta"
        );
        assert_eq!(plan.names.get("#attr").map(String::as_str), Some("amount"));
        assert_eq!(
            plan.values.get(":delta"),
            Some(&AttributeValue::N("3".to_string()))
        );
    }

    #[test]
    fn test_increment_plan_caps_the_previous_value() {
        let plan = UpdatePlan::from_mutation(Mutation::Increment {
            attribute: "amount".to_string(),
            delta: 3,
            max: 10,
        });

        assert_eq!(
            plan.condition.as_deref(),
            Some("(attribute_not_exists(#attr) OR #attr <= :ceiling)")
        );
        assert_eq!(
            plan.values.get(":ceiling"),
            Some(&AttributeValue::N("7".to_string()))
        );
        assert_eq!(UpdatePlan::from_mutation(Mutation::Set(Item::new())).condition, None);
    }

    #[test]
    fn test_condition_expressions() {
        assert_eq!(DynamoDbStore::condition_expression(WriteCondition::None), None);
        assert_eq!(
            DynamoDbStore::condition_expression(WriteCondition::Exists),
            Some("attribute_exists(#pk)")
        );
        assert_eq!(
            DynamoDbStore::condition_expression(WriteCondition::NotExists),
            Some("attribute_not_exists(#pk)")
        );
    }
}
