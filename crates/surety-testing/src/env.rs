//! Fully wired in-process test environment.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use surety_api::{create_router, AppState, Config};
use surety_core::{seed::seed_catalog, MemoryStore, RecordStore, TestClock};
use surety_inspection::InspectionClient;
use tower::ServiceExt;
use wiremock::MockServer;

/// Webhook secret the environment's provider signs deliveries with.
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// Secret the environment mints callback tokens with.
pub const CALLBACK_SECRET: &str = "cbsec_test";

/// An in-process service instance for integration tests.
///
/// The store is in-memory, the clock is controllable, and the inspection
/// provider is a [`wiremock::MockServer`] tests mount expectations on.
/// Requests go straight through the router, no sockets involved.
pub struct TestEnv {
    /// Direct handle to the backing store for seeding and assertions.
    pub store: Arc<MemoryStore>,
    /// Controllable clock shared with the service.
    pub clock: Arc<TestClock>,
    /// Mocked inspection provider.
    pub provider: MockServer,
    /// The configuration the service was built with.
    pub config: Arc<Config>,
    router: Router,
}

impl TestEnv {
    /// Builds an environment with an empty store.
    pub async fn new() -> Self {
        Self::with_store(|store| store as Arc<dyn RecordStore>).await
    }

    /// Builds an environment whose router runs on a wrapped store.
    ///
    /// The wrapper receives the environment's [`MemoryStore`], so the
    /// `store` handle kept on the environment still observes every record
    /// the wrapped store writes through to it. Used to interpose failure
    /// injection between the handlers and persistence.
    pub async fn with_store<F>(wrap: F) -> Self
    where
        F: FnOnce(Arc<MemoryStore>) -> Arc<dyn RecordStore>,
    {
        let provider = MockServer::start().await;

        let config = Arc::new(Config {
            public_base_url: "http://surety.test".to_string(),
            provider_base_url: provider.uri(),
            provider_api_key: "sk_test".to_string(),
            provider_webhook_secret: WEBHOOK_SECRET.to_string(),
            goods_template_id: "tpl_goods".to_string(),
            callback_token_secret: CALLBACK_SECRET.to_string(),
            ..Config::default()
        });

        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(TestClock::new());
        let inspector = Arc::new(
            InspectionClient::new(config.to_client_config())
                .expect("test client config must build"),
        );

        let state = AppState::new(wrap(store.clone()), inspector, clock.clone(), config.clone());
        let router = create_router(state);

        Self { store, clock, provider, config, router }
    }

    /// Builds an environment with the catalog seeded.
    pub async fn seeded() -> Self {
        let env = Self::new().await;
        seed_catalog(&*env.store).await.expect("seeding an empty in-memory store cannot fail");
        env
    }

    /// Sends a GET request through the router.
    pub async fn get(&self, path: &str) -> Response<Body> {
        let request = Request::get(path).body(Body::empty()).expect("valid test request");
        self.send(request).await
    }

    /// Sends a POST request with a JSON body through the router.
    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> Response<Body> {
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid test request");
        self.send(request).await
    }

    /// Sends a POST request with a form-encoded body through the router.
    pub async fn post_form(&self, path: &str, body: &str) -> Response<Body> {
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("valid test request");
        self.send(request).await
    }

    /// Delivers a webhook body with the given signature header value.
    pub async fn post_webhook(&self, body: Vec<u8>, signature: &str) -> Response<Body> {
        let request = Request::post("/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-inspection-signature", signature)
            .body(Body::from(body))
            .expect("valid test request");
        self.send(request).await
    }

    /// Delivers a webhook body with no signature header at all.
    pub async fn post_unsigned_webhook(&self, body: Vec<u8>) -> Response<Body> {
        let request = Request::post("/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("valid test request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("router is infallible")
    }

    /// Reads a response body as JSON.
    pub async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body must be readable");
        serde_json::from_slice(&bytes).expect("response body must be JSON")
    }

    /// Asserts a response carries the expected status and error code.
    pub async fn assert_error(response: Response<Body>, status: StatusCode, code: &str) {
        assert_eq!(response.status(), status);
        let body = Self::body_json(response).await;
        assert_eq!(body["error"]["code"], code);
    }
}
