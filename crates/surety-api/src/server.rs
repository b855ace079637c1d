//! HTTP server setup and lifecycle management.
//!
//! Wires the handlers into an axum router with request-ID injection,
//! tracing, and a request timeout, and runs the server with graceful
//! shutdown on SIGINT/SIGTERM.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::{handlers, state::AppState};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builds the application router with all routes and middleware.
///
/// All `/policy` routes share the `{id}` parameter name for the policy
/// segment; the router rejects conflicting names on a shared prefix.
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout);

    Router::new()
        .route("/", get(handlers::index))
        .route("/auth/register", post(handlers::register))
        .route("/identity/verification", get(handlers::verification_callback))
        .route("/policy/{id}", post(handlers::initiate_policy))
        .route("/policy/{id}/items", post(handlers::add_goods))
        .route(
            "/policy/{id}/goods/{good_id}/inspection/image",
            post(handlers::generate_image_token),
        )
        .route("/policy/{id}/inspection/finish", post(handlers::finish_inspection))
        .route("/webhook", post(handlers::receive_webhook))
        .route("/available-goods", get(handlers::list_available_goods))
        .route("/available-policies", get(handlers::list_available_policies))
        .route("/health", get(handlers::health_check))
        .layer(middleware::from_fn(inject_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .with_state(state)
}

/// Ensures every request carries a request ID and echoes it on the response.
async fn inject_request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
        response
    } else {
        next.run(request).await
    }
}

/// Starts the HTTP server and blocks until shutdown.
///
/// # Errors
///
/// Returns an error when the bind address is invalid, the listener cannot
/// bind, or the server fails while running.
pub async fn start_server(state: AppState) -> Result<()> {
    let addr = state.config.parse_server_addr()?;
    let router = create_router(state);

    let listener = TcpListener::bind(addr).await.context("Failed to bind server address")?;
    info!(%addr, "Server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
