//! Shared test setup for storage integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use shop_storage::cart::CartAggregator;
use shop_storage::gateway::ConditionalWriteGateway;
use shop_storage::key::KeyAttribute;
use shop_storage::product::ProductStorage;
use shop_storage::scanner::RangeScanner;
use shop_storage::store::{DynamoDbStore, KeyValueStore};
use shop_storage::user::UserStorage;
use tokio::time::sleep;
use uuid::Uuid;

/// Test configuration for LocalStack
const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";
const TEST_REGION: &str = "us-east-1";

pub const CALL_TIMEOUT: Duration = Duration::from_secs(3);

/// Every storage client wired to one store
pub struct Shop {
    pub users: UserStorage,
    pub products: ProductStorage,
    pub cart: Arc<CartAggregator>,
}

impl Shop {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let gateway = Arc::new(ConditionalWriteGateway::new(store.clone(), CALL_TIMEOUT));
        let scanner = Arc::new(RangeScanner::new(store, CALL_TIMEOUT));

        Self {
            users: UserStorage::new(gateway.clone(), scanner.clone()),
            products: ProductStorage::new(gateway.clone(), scanner.clone()),
            cart: Arc::new(CartAggregator::new(gateway, scanner)),
        }
    }
}

/// Test context that automatically cleans up the table on drop
pub struct TestContext {
    pub shop: Shop,
    pub table_name: String,
    pub dynamodb_client: Arc<DynamoDbClient>,
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let client = self.dynamodb_client.clone();
        let table = self.table_name.clone();

        let handle = tokio::runtime::Handle::try_current();
        if let Ok(handle) = handle {
            handle.spawn(async move {
                let _ = client.delete_table().table_name(&table).send().await;
            });
        }
    }
}

/// Creates a unique `pk`/`sk` table in LocalStack
pub async fn setup_dynamodb() -> TestContext {
    let table_name = format!("test-shop-{}", Uuid::new_v4());

    let credentials = Credentials::from_keys(
        "test", // AWS_ACCESS_KEY_ID
        "test", // AWS_SECRET_ACCESS_KEY
        None,   // no session token
    );
    let config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(LOCALSTACK_ENDPOINT)
        .region(Region::new(TEST_REGION))
        .credentials_provider(credentials)
        .load()
        .await;

    let dynamodb_client = Arc::new(DynamoDbClient::new(&config));

    let mut request = dynamodb_client
        .create_table()
        .table_name(&table_name)
        .billing_mode(BillingMode::PayPerRequest);

    for (attribute, key_type) in [
        (KeyAttribute::Pk, KeyType::Hash),
        (KeyAttribute::Sk, KeyType::Range),
    ] {
        request = request
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(attribute.to_string())
                    .key_type(key_type)
                    .build()
                    .expect("Failed to build key schema"),
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(attribute.to_string())
                    .attribute_type(ScalarAttributeType::S)
                    .build()
                    .expect("Failed to build attribute definition"),
            );
    }

    request.send().await.expect("Failed to create test table");

    // Wait for table to be ready
    sleep(Duration::from_millis(100)).await;

    let store = DynamoDbStore::new(dynamodb_client.clone(), table_name.clone());

    TestContext {
        shop: Shop::new(Arc::new(store)),
        table_name,
        dynamodb_client,
    }
}
