//! Health check endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::instrument;

use crate::state::AppState;

/// Health check response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "unhealthy".
    pub status: &'static str,
    /// Service version from the build.
    pub version: &'static str,
    /// Seconds since the service started.
    pub uptime_seconds: u64,
}

/// Reports service health, probing the backing store.
///
/// Responds 200 when the store answers, 503 when it does not; the body is
/// the same shape either way so probes can always parse it.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let uptime_seconds = state.clock.now().duration_since(state.started_at).as_secs();

    let (status, code) = match state.store.health_check().await {
        Ok(()) => ("healthy", StatusCode::OK),
        Err(error) => {
            tracing::error!(%error, "Store health check failed");
            ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
        },
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            uptime_seconds,
        }),
    )
}
