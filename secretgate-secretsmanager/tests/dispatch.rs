//! Integration tests for the secret task handler
//!
//! These drive the axum handler end to end with an in-memory store behind it.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use secretgate_core::{ErrorCode, StoreError};
use secretgate_secretsmanager::memory::StoreOp;
use secretgate_secretsmanager::{
    handle_request, AwsStoreFactory, MemorySecretStore, SecretsDefaults, SecretsProxyState,
    StoreFactory,
};

fn router(factory: Arc<dyn StoreFactory>) -> Router {
    let state = Arc::new(SecretsProxyState::new(factory, SecretsDefaults::default()));
    Router::new().route("/", post(handle_request)).with_state(state)
}

async fn send(router: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn task(operation: &str, secret: Value) -> String {
    json!({
        "secret_params": {
            "secret_operation": operation,
            "store_config": { "region": "us-east-1", "access_key": "test", "secret_key": "test" },
            "secret": secret
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_fetch_json_key() {
    let store = MemorySecretStore::new().with_secret("mysecret", r#"{"k1":{"k2":"hello"}}"#);

    let (status, body) = send(
        router(Arc::new(store)),
        task("fetch", json!({"name": "mysecret#k1.k2"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"value": "hello"}));
}

#[tokio::test]
async fn test_fetch_failure_is_error_envelope() {
    let store = MemorySecretStore::new();

    let (status, body) = send(router(Arc::new(store)), task("fetch", json!({"name": "absent"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to fetch secret");
    assert_eq!(body["status"], 500);
    assert!(body["error"].as_str().unwrap().contains("absent"));
}

#[tokio::test]
async fn test_delete() {
    let store = MemorySecretStore::new().with_secret("mysecret", "v");

    let (status, body) =
        send(router(Arc::new(store.clone())), task("delete", json!({"name": "mysecret"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "mysecret");
    assert_eq!(body["status"], "SUCCESS");
    assert!(body["error"].is_null());
    assert!(!store.contains("mysecret"));
}

#[tokio::test]
async fn test_connect_case_insensitive_action() {
    let store = MemorySecretStore::new();

    let (status, body) = send(router(Arc::new(store)), task("CONNECT", json!({"name": "probe"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"valid": true, "error": null}));
}

#[tokio::test]
async fn test_create_routes_through_upsert() {
    let store = MemorySecretStore::new().with_secret("harness/db", "old");

    let (status, body) = send(
        router(Arc::new(store.clone())),
        task("create", json!({"name": "db", "plaintext": "new"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SUCCESS");
    assert_eq!(store.calls_of(StoreOp::Update), vec!["harness/db"]);
    assert!(store.calls_of(StoreOp::Create).is_empty());
}

#[tokio::test]
async fn test_update_with_moved_secret() {
    let store = MemorySecretStore::new().with_secret("team/old", "pw");
    let body = json!({
        "secret_params": {
            "secret_operation": "update",
            "store_config": { "access_key": "test", "secret_key": "test", "prefix": "team" },
            "secret": { "name": "new", "plaintext": "pw" },
            "existing_secret": { "name": "team/old" }
        }
    });

    let (status, body) = send(router(Arc::new(store.clone())), body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "team/new");
    assert_eq!(body["status"], "SUCCESS");
    assert_eq!(store.calls_of(StoreOp::Delete), vec!["team/old"]);
}

#[tokio::test]
async fn test_operation_failure_is_embedded() {
    let store = MemorySecretStore::new().with_secret("locked", "v");
    store.fail(
        StoreOp::Delete,
        StoreError::with_code(ErrorCode::InvalidRequestException, "secret is marked for deletion"),
    );

    let (status, body) = send(router(Arc::new(store)), task("delete", json!({"name": "locked"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "FAILURE");
    assert_eq!(body["error"]["type"], "InvalidRequestException");
    assert_eq!(body["error"]["reason"], "secret is marked for deletion");
}

#[tokio::test]
async fn test_malformed_body() {
    let store = MemorySecretStore::new();

    let (status, body) = send(router(Arc::new(store.clone())), "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Failed to decode request body");
    assert_eq!(body["status"], 400);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_missing_config() {
    let store = MemorySecretStore::new();
    let body = json!({"secret_params": {"secret_operation": "fetch", "secret": {"name": "x"}}});

    let (status, body) = send(router(Arc::new(store)), body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Configuration is missing");
    assert_eq!(body["error"], "empty config");
}

#[tokio::test]
async fn test_unknown_action() {
    let store = MemorySecretStore::new();

    let (status, body) = send(router(Arc::new(store.clone())), task("list", json!({"name": "x"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "The specified action list is not supported");
    assert_eq!(body["error"], "invalid action");
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_rename_requires_existing_secret() {
    let store = MemorySecretStore::new();

    let (status, body) = send(router(Arc::new(store.clone())), task("rename", json!({"name": "x"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing required field: existing_secret");
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_static_keys_missing_is_setup_failure() {
    let body = json!({
        "secret_params": {
            "secret_operation": "connect",
            "store_config": { "region": "us-east-1" },
            "secret": { "name": "probe" }
        }
    });

    let (status, body) = send(router(Arc::new(AwsStoreFactory::new("us-east-1"))), body.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to create AWS Secret Manager client");
    assert_eq!(body["error"], "AccessKey not provided");
}

#[tokio::test]
async fn test_rename_from_key_reference_keeps_source() {
    let store = MemorySecretStore::new().with_secret("team/creds", r#"{"pw":"hunter2","user":"admin"}"#);
    let body = json!({
        "secret_params": {
            "secret_operation": "rename",
            "store_config": { "access_key": "test", "secret_key": "test", "prefix": "team" },
            "secret": { "name": "newpw" },
            "existing_secret": { "name": "team/creds#pw" }
        }
    });

    let (status, body) = send(router(Arc::new(store.clone())), body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "team/newpw");
    assert_eq!(body["status"], "SUCCESS");
    assert_eq!(store.secret("team/newpw").unwrap().value.as_deref(), Some("hunter2"));
    assert!(store.calls_of(StoreOp::Delete).is_empty());
    assert!(store.contains("team/creds"));
}
