//! Policy initiation, goods, and inspection-lifecycle handlers.
//!
//! Policy creation is a small saga: the local records are written first in
//! `pending_inspection`, then the provider call either promotes the policy
//! to `waiting_verification` or leaves it in a recorded `inspection_failed`
//! state. Goods are merged against the catalog by ID, never by position.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use surety_core::models::{
    AvailableGoodId, AvailablePolicyId, Customer, CustomerId, Policy, PolicyGood, PolicyId,
};
use surety_inspection::client::{
    Consumer, GoodsInspectionParams, ImageTokenParams, InspectionGood,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// Customer fields captured at policy initiation.
#[derive(Debug, Deserialize)]
pub struct CustomerFields {
    /// Stated occupation, optional.
    pub occupation: Option<String>,
    /// Given name.
    pub firstname: String,
    /// Family name, optional.
    pub lastname: Option<String>,
    /// Contact email.
    pub email: String,
    /// National identification number.
    pub identification: String,
}

/// Request body for policy initiation.
#[derive(Debug, Deserialize)]
pub struct InitiatePolicyRequest {
    /// The customer the policy is for.
    pub customer: CustomerFields,
}

/// Response from successful policy initiation.
#[derive(Debug, Serialize)]
pub struct InitiatePolicyResponse {
    /// ID of the new policy.
    pub policy_id: PolicyId,
    /// Provider-assigned inspection ID.
    pub inspection_id: String,
}

/// Initiates a policy from a catalog template.
///
/// Creates the customer and the policy, then asks the provider for a goods
/// inspection carrying the policy ID as metadata. A provider failure is
/// recorded on the policy (`inspection_failed`) and surfaced as 502 instead
/// of leaving a policy silently referencing no inspection.
///
/// # Errors
///
/// - 404 when the policy template does not exist
/// - 502 when the inspection provider call fails
#[instrument(name = "initiate_policy", skip(state, body), fields(available_policy_id = %available_policy_id))]
pub async fn initiate_policy(
    Path(available_policy_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<InitiatePolicyRequest>,
) -> Result<(StatusCode, Json<InitiatePolicyResponse>), ApiError> {
    let template_id = AvailablePolicyId::from(available_policy_id);
    let template = state
        .store
        .find_available_policy(template_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("available policy {available_policy_id}")))?;

    let now = state.clock.now_utc();
    let customer = Customer {
        id: CustomerId::new(),
        occupation: body.customer.occupation,
        firstname: body.customer.firstname,
        lastname: body.customer.lastname,
        email: body.customer.email,
        identification: body.customer.identification,
        created_at: now,
    };
    let consumer = Consumer {
        email: customer.email.clone(),
        first_name: customer.firstname.clone(),
        last_name: customer.lastname.clone(),
        identification: customer.identification.clone(),
    };

    let customer_id = state.store.create_customer(customer).await?;
    let policy = Policy::new(customer_id, template.id, now);
    let policy_id = state.store.create_policy(policy).await?;

    info!(%policy_id, %customer_id, "Policy created, requesting inspection");

    let created = match state
        .inspector
        .create_goods_inspection(GoodsInspectionParams {
            policy_id: policy_id.to_string(),
            producer_internal_id: customer_id.to_string(),
            consumer,
            template_id: state.config.goods_template_id.clone(),
        })
        .await
    {
        Ok(created) => created,
        Err(provider_err) => {
            warn!(%policy_id, error = %provider_err, "Inspection creation failed, recording on policy");
            if let Err(store_err) = state.store.mark_inspection_failed(policy_id).await {
                tracing::error!(%policy_id, error = %store_err, "Could not record inspection failure");
            }
            return Err(provider_err.into());
        },
    };

    let promoted = state
        .store
        .attach_inspection(policy_id, created.inspection_id.clone().into())
        .await?;
    if !promoted {
        // Only possible if something else moved the policy mid-request
        warn!(%policy_id, "Policy left pending_inspection before inspection attach");
    }

    info!(%policy_id, inspection_id = %created.inspection_id, "Policy initiated");

    Ok((
        StatusCode::CREATED,
        Json(InitiatePolicyResponse { policy_id, inspection_id: created.inspection_id }),
    ))
}

/// One good in an add-goods request.
#[derive(Debug, Deserialize)]
pub struct GoodInput {
    /// Catalog entry being insured.
    pub available_good_id: Uuid,
    /// Manufacturer, optional.
    pub make: Option<String>,
    /// Model, optional.
    pub model: Option<String>,
    /// Declared value in minor currency units, optional.
    pub price: Option<i64>,
}

/// Request body for adding goods to a policy.
#[derive(Debug, Deserialize)]
pub struct AddGoodsRequest {
    /// Goods to insure, in the order they should be recorded.
    pub goods: Vec<GoodInput>,
}

/// Adds goods to a policy and registers them with its inspection.
///
/// Catalog fields are resolved per good by ID; an unknown catalog reference
/// fails the whole request before any provider call. The provider returns
/// one product ID per good in submission order, which is zipped back onto
/// the submitted list.
///
/// # Errors
///
/// - 400 when the goods list is empty
/// - 404 when the policy or a referenced catalog good does not exist
/// - 409 when the policy has no inspection to attach goods to
/// - 502 when the provider call fails
#[instrument(name = "add_goods", skip(state, body), fields(policy_id = %policy_id, goods = body.goods.len()))]
pub async fn add_goods(
    Path(policy_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<AddGoodsRequest>,
) -> Result<(StatusCode, Json<Vec<PolicyGood>>), ApiError> {
    if body.goods.is_empty() {
        return Err(ApiError::Validation("goods list must not be empty".to_string()));
    }

    let policy_id = PolicyId::from(policy_id);
    let policy = state
        .store
        .find_policy(policy_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("policy {policy_id}")))?;

    let inspection_id = policy
        .inspection_id
        .clone()
        .ok_or_else(|| ApiError::Conflict("policy has no inspection".to_string()))?;

    // Resolve catalog entries by ID; result order from the store is
    // unspecified, so never line rows up positionally
    let ids: Vec<AvailableGoodId> =
        body.goods.iter().map(|good| AvailableGoodId::from(good.available_good_id)).collect();
    let catalog: HashMap<AvailableGoodId, _> = state
        .store
        .find_available_goods(ids)
        .await?
        .into_iter()
        .map(|entry| (entry.id, entry))
        .collect();

    let mut merged = Vec::with_capacity(body.goods.len());
    for good in &body.goods {
        let id = AvailableGoodId::from(good.available_good_id);
        let entry = catalog.get(&id).ok_or_else(|| {
            ApiError::not_found(format!("available good {}", good.available_good_id))
        })?;

        merged.push(InspectionGood {
            category: entry.category.clone(),
            kind: entry.kind.clone(),
            make: good.make.clone(),
            model: good.model.clone(),
            price: good.price.or(entry.price),
        });
    }

    let product_ids = state.inspector.add_goods(inspection_id.as_str(), &merged).await?;

    let goods_to_append: Vec<PolicyGood> = body
        .goods
        .iter()
        .zip(&merged)
        .zip(product_ids)
        .map(|((input, inspection_good), product_inspection_id)| PolicyGood {
            id: Uuid::new_v4(),
            available_good_id: AvailableGoodId::from(input.available_good_id),
            category: inspection_good.category.clone(),
            kind: inspection_good.kind.clone(),
            make: inspection_good.make.clone(),
            model: inspection_good.model.clone(),
            price: inspection_good.price,
            product_inspection_id,
        })
        .collect();

    let updated = state.store.append_goods(policy_id, goods_to_append).await?;

    info!(%policy_id, total = updated.goods().len(), "Goods added to policy");

    Ok((StatusCode::CREATED, Json(updated.goods().to_vec())))
}

/// Request body for an image-upload token.
#[derive(Debug, Deserialize)]
pub struct ImageTokenRequest {
    /// Capture side (e.g. "front").
    pub side: String,
    /// Crop coordinates, forwarded to the provider untouched.
    #[serde(default)]
    pub coordinates: Value,
}

/// Response carrying an image-upload token.
#[derive(Debug, Serialize)]
pub struct ImageTokenResponse {
    /// Single-use upload token scoped to one product.
    pub image_token: String,
}

/// Issues an image-upload token for one good on a policy.
///
/// # Errors
///
/// - 404 when the policy does not exist or the good is not on it
/// - 502 when the provider call fails
#[instrument(name = "generate_image_token", skip(state, body), fields(policy_id = %policy_id, good_id = %good_id))]
pub async fn generate_image_token(
    Path((policy_id, good_id)): Path<(Uuid, Uuid)>,
    State(state): State<AppState>,
    Json(body): Json<ImageTokenRequest>,
) -> Result<(StatusCode, Json<ImageTokenResponse>), ApiError> {
    let policy_id = PolicyId::from(policy_id);
    let policy = state
        .store
        .find_policy(policy_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("policy {policy_id}")))?;

    let good = policy
        .find_good(good_id)
        .ok_or_else(|| ApiError::not_found(format!("good {good_id} on policy {policy_id}")))?;

    let token = state
        .inspector
        .generate_image_token(ImageTokenParams {
            product_id: good.product_inspection_id.clone(),
            side: body.side,
            coordinates: body.coordinates,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ImageTokenResponse { image_token: token })))
}

/// Response from finishing an inspection.
#[derive(Debug, Serialize)]
pub struct FinishResponse {
    /// Always true; the verdict arrives later by webhook.
    pub finished: bool,
}

/// Signals the provider that image capture for a policy's inspection is done.
///
/// No local status change happens here; the policy stays in
/// `waiting_verification` until the completion webhook lands.
///
/// # Errors
///
/// - 404 when the policy does not exist
/// - 409 when the policy has no inspection
/// - 502 when the provider call fails
#[instrument(name = "finish_inspection", skip(state), fields(policy_id = %policy_id))]
pub async fn finish_inspection(
    Path(policy_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<FinishResponse>, ApiError> {
    let policy_id = PolicyId::from(policy_id);
    let policy = state
        .store
        .find_policy(policy_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("policy {policy_id}")))?;

    let inspection_id = policy
        .inspection_id
        .ok_or_else(|| ApiError::Conflict("policy has no inspection".to_string()))?;

    state.inspector.finish_inspection(inspection_id.as_str()).await?;

    info!(%policy_id, inspection_id = %inspection_id, "Inspection finish requested");

    Ok(Json(FinishResponse { finished: true }))
}
