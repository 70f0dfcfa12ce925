use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;

use backend::{server, state::AppState, types::Environment};
use shop_storage::store::DynamoDbStore;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env();

    // Configure logging format based on environment
    // Use JSON format for staging/production, regular format for development
    match environment {
        Environment::Production | Environment::Staging => {
            fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
        }
        Environment::Development => {
            fmt().with_env_filter(EnvFilter::from_default_env()).init();
        }
    }

    let dynamodb_client = Arc::new(DynamoDbClient::new(&environment.aws_config().await));
    let table_name = environment.dynamodb_table_name();
    let call_timeout = environment.store_call_timeout();
    tracing::info!(table = %table_name, ?call_timeout, ?environment, "Using DynamoDB store");

    let store = Arc::new(DynamoDbStore::new(dynamodb_client, table_name));
    let state = AppState::new(store, call_timeout);

    server::start(environment, state).await
}
