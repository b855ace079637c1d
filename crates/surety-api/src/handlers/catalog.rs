//! Read-only catalog listings.

use axum::{extract::State, Json};
use surety_core::models::{AvailableGood, AvailablePolicy};
use tracing::instrument;

use crate::{error::ApiError, state::AppState};

/// Lists the insurable-goods catalog.
#[instrument(name = "list_available_goods", skip(state))]
pub async fn list_available_goods(
    State(state): State<AppState>,
) -> Result<Json<Vec<AvailableGood>>, ApiError> {
    let goods = state.store.list_available_goods().await?;
    Ok(Json(goods))
}

/// Lists the policy-template catalog.
#[instrument(name = "list_available_policies", skip(state))]
pub async fn list_available_policies(
    State(state): State<AppState>,
) -> Result<Json<Vec<AvailablePolicy>>, ApiError> {
    let templates = state.store.list_available_policies().await?;
    Ok(Json(templates))
}
