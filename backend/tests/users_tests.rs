mod common;

use axum::http::{Method, StatusCode};
use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_create_and_get_user() {
    let setup = TestSetup::new();

    let (status, body) = setup
        .json(Method::POST, "/users", Some(json!({"id": "1", "name": "Ada"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"id": "1", "name": "Ada"}));

    let (status, body) = setup.json(Method::GET, "/users/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": "1", "name": "Ada"}));
}

#[tokio::test]
async fn test_list_users() {
    let setup = TestSetup::new();

    let (status, body) = setup.json(Method::GET, "/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    setup.post("/users", json!({"id": "2", "name": "Grace"})).await;
    setup.post("/users", json!({"id": "1", "name": "Ada"})).await;
    // Cart lines share the user partition but are not users
    setup
        .post("/cart/1", json!({"productId": "7", "amount": 1}))
        .await;

    let (status, body) = setup.json(Method::GET, "/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{"id": "1", "name": "Ada"}, {"id": "2", "name": "Grace"}])
    );
}

#[tokio::test]
async fn test_duplicate_user_conflicts() {
    let setup = TestSetup::new();
    setup.post("/users", json!({"id": "1", "name": "Ada"})).await;

    let (status, body) = setup
        .json(Method::POST, "/users", Some(json!({"id": "1", "name": "Grace"})))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "already_exists");
    assert_eq!(body["allowRetry"], false);

    let (_, stored) = setup.json(Method::GET, "/users/1", None).await;
    assert_eq!(stored["name"], "Ada");
}

#[tokio::test]
async fn test_invalid_user_payloads() {
    let setup = TestSetup::new();

    for payload in [
        json!({"id": "u1", "name": "Ada"}),
        json!({"id": "1", "name": ""}),
        json!({"id": "1"}),
        json!({"id": "1", "name": "Ada", "email": "ada@example.com"}),
    ] {
        let response = setup.post("/users", payload.clone()).await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "payload {payload} should be rejected"
        );
    }

    assert!(setup.store.is_empty().await);
}

#[tokio::test]
async fn test_update_user_never_creates() {
    let setup = TestSetup::new();

    let (status, body) = setup
        .json(Method::PUT, "/users/9", Some(json!({"name": "Ada"})))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "not_found");
    assert_eq!(setup.get("/users/9").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rename_and_delete_user() {
    let setup = TestSetup::new();
    setup.post("/users", json!({"id": "3", "name": "Ada"})).await;

    let (status, body) = setup
        .json(Method::PUT, "/users/3", Some(json!({"name": "Ada Lovelace"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada Lovelace");

    let (status, body) = setup.json(Method::DELETE, "/users/3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": "3", "name": "Ada Lovelace"}));

    assert_eq!(setup.delete("/users/3").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_path_id_is_bad_request() {
    let setup = TestSetup::new();

    let (status, body) = setup.json(Method::GET, "/users/abc", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_id");
}

#[tokio::test]
async fn test_health_and_docs() {
    let setup = TestSetup::new();

    let (status, body) = setup.json(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "reachable");

    let (status, body) = setup.json(Method::GET, "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/cart/{user_id}/{product_id}"].is_object());
}

#[tokio::test]
async fn test_health_reports_unreachable_store() {
    let setup = TestSetup::with_dyn_store(
        std::sync::Arc::new(UnreachableStore),
        std::sync::Arc::new(shop_storage::store::MemoryStore::new()),
    );

    let (status, body) = setup.json(Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["store"], "unreachable");
}

#[tokio::test]
async fn test_list_users_with_unreachable_store() {
    let setup = TestSetup::with_dyn_store(
        std::sync::Arc::new(UnreachableStore),
        std::sync::Arc::new(shop_storage::store::MemoryStore::new()),
    );

    let (status, body) = setup.json(Method::GET, "/users", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "store_unavailable");
    assert_eq!(body["allowRetry"], true);
}
