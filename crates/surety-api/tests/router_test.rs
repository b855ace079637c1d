//! Router-level tests: routing, middleware, and read-only endpoints.
//!
//! Workflow scenarios live in the workspace-level integration tests; these
//! cover the surface the router itself is responsible for.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use surety_api::{create_router, AppState, Config};
use surety_core::{seed::seed_catalog, MemoryStore, RecordStore, TestClock};
use surety_inspection::InspectionClient;
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        provider_api_key: "sk_test".to_string(),
        provider_webhook_secret: "whsec_test".to_string(),
        goods_template_id: "tpl_goods".to_string(),
        callback_token_secret: "cbsec_test".to_string(),
        ..Config::default()
    }
}

async fn test_router(store: Arc<MemoryStore>) -> Router {
    let config = Arc::new(test_config());
    let inspector =
        Arc::new(InspectionClient::new(config.to_client_config()).expect("client must build"));
    let state = AppState::new(
        store as Arc<dyn RecordStore>,
        inspector,
        Arc::new(TestClock::new()),
        config,
    );
    create_router(state)
}

async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let router = test_router(Arc::new(MemoryStore::new())).await;

    let response =
        router.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn catalog_endpoints_list_seeded_rows() {
    let store = Arc::new(MemoryStore::new());
    seed_catalog(&*store).await.unwrap();
    let router = test_router(store).await;

    let response = router
        .clone()
        .oneshot(Request::get("/available-goods").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let goods = body_json(response).await;
    assert_eq!(goods.as_array().unwrap().len(), 4);
    assert!(goods[0]["category"].is_string());

    let response = router
        .oneshot(Request::get("/available-policies").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let templates = body_json(response).await;
    assert_eq!(templates.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_policy_returns_structured_404() {
    let router = test_router(Arc::new(MemoryStore::new())).await;

    let response = router
        .oneshot(
            Request::post(format!("/policy/{}/inspection/finish", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn webhook_without_signature_is_rejected() {
    let router = test_router(Arc::new(MemoryStore::new())).await;

    let response = router
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "invalid_webhook");
}

#[tokio::test]
async fn request_id_is_echoed_and_generated() {
    let router = test_router(Arc::new(MemoryStore::new())).await;

    // Caller-provided ID comes back untouched
    let response = router
        .clone()
        .oneshot(
            Request::get("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");

    // Absent ID gets generated
    let response =
        router.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert!(!response.headers()["x-request-id"].is_empty());
}

#[tokio::test]
async fn registration_page_serves_html() {
    let router = test_router(Arc::new(MemoryStore::new())).await;

    let response = router.oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("/auth/register"));
}
