// Not every helper is used in every test, so we allow dead code
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use backend::{server, state::AppState, types::Environment};
use http_body_util::BodyExt;
use serde_json::Value;
use shop_storage::key::ItemKey;
use shop_storage::store::{
    Item, KeyValueStore, MemoryStore, Mutation, StoreError, StoreResult, WriteCondition,
};
use tower::ServiceExt;

/// Setup test environment variables and tracing
pub fn setup_test_env() {
    dotenvy::from_path(".env.example").ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Router backed by an in-memory store
pub struct TestSetup {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self::with_dyn_store(store.clone() as Arc<dyn KeyValueStore>, store)
    }

    /// Serves from `serving` while exposing `store` for direct inspection
    pub fn with_dyn_store(serving: Arc<dyn KeyValueStore>, store: Arc<MemoryStore>) -> Self {
        Self::with_call_timeout(serving, store, Duration::from_secs(1))
    }

    pub fn with_call_timeout(
        serving: Arc<dyn KeyValueStore>,
        store: Arc<MemoryStore>,
        call_timeout: Duration,
    ) -> Self {
        setup_test_env();

        let state = AppState::new(serving, call_timeout);
        let router = server::router(Environment::Development, state);

        Self { router, store }
    }

    pub async fn send(&self, method: Method, route: &str, payload: Option<Value>) -> Response {
        let builder = Request::builder().uri(route).method(method);
        let request = match payload {
            Some(payload) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(payload.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, route: &str) -> Response {
        self.send(Method::GET, route, None).await
    }

    pub async fn post(&self, route: &str, payload: Value) -> Response {
        self.send(Method::POST, route, Some(payload)).await
    }

    pub async fn put(&self, route: &str, payload: Value) -> Response {
        self.send(Method::PUT, route, Some(payload)).await
    }

    pub async fn delete(&self, route: &str) -> Response {
        self.send(Method::DELETE, route, None).await
    }

    /// Sends a request and returns its status with the parsed JSON body
    pub async fn json(
        &self,
        method: Method,
        route: &str,
        payload: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.send(method, route, payload).await;
        let status = response.status();
        (status, parse_response_body(response).await)
    }
}

/// Parse response body to JSON
pub async fn parse_response_body(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Error code of an API error envelope
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap()
}

/// Store that fails every call
pub struct UnreachableStore;

fn unreachable_error<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl KeyValueStore for UnreachableStore {
    async fn get_item(&self, _: &ItemKey) -> StoreResult<Option<Item>> {
        unreachable_error()
    }

    async fn put_item(&self, _: &ItemKey, _: Item, _: WriteCondition) -> StoreResult<()> {
        unreachable_error()
    }

    async fn update_item(
        &self,
        _: &ItemKey,
        _: Mutation,
        _: WriteCondition,
    ) -> StoreResult<Item> {
        unreachable_error()
    }

    async fn delete_item(&self, _: &ItemKey, _: WriteCondition) -> StoreResult<Option<Item>> {
        unreachable_error()
    }

    async fn query_prefix(&self, _: &str, _: &str) -> StoreResult<Vec<Item>> {
        unreachable_error()
    }

    async fn scan_matching(&self, _: &str, _: &str) -> StoreResult<Vec<Item>> {
        unreachable_error()
    }
}
