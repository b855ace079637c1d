//! Inspection-provider webhook receiver.
//!
//! Verifies the HMAC signature over the raw body before parsing anything,
//! dedupes on the envelope event ID, and applies the verdict transition
//! guarded on `waiting_verification`. Replays and late deliveries are
//! acknowledged without reapplying, so the provider stops retrying.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Serialize;
use surety_core::models::{PolicyId, PolicyStatus};
use surety_inspection::webhook::{construct_event, WebhookEvent};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

const SIGNATURE_HEADER: &str = "x-inspection-signature";

/// Acknowledgement body returned for every accepted delivery.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Always true; the provider only needs a 2xx.
    pub received: bool,
}

/// Receives a signed webhook delivery from the inspection provider.
///
/// The signature covers the exact raw body bytes, so this handler takes the
/// body as [`Bytes`] and never lets the framework deserialize it first.
/// Redelivered events are acknowledged without effect: the status-guarded
/// transition is a no-op the second time, and the idempotency ledger flags
/// the replay for the logs.
///
/// # Errors
///
/// Returns 400 when the signature header is missing, the signature does not
/// verify, or the verified body is not a valid envelope.
#[instrument(name = "receive_webhook", skip(state, headers, body))]
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::InvalidWebhook("missing signature header".to_string()))?;

    let event = construct_event(&body, signature, &state.config.provider_webhook_secret)?;

    match event.event.as_str() {
        "inspection_completed" => apply_completion(&state, &event).await?,
        other => {
            // Unknown event types are acknowledged so the provider stops
            // retrying; there is nothing to apply
            info!(event_id = %event.id, event = other, "Ignoring unhandled webhook event type");
        },
    }

    // Ledger the event only once its transition has applied. A transition
    // that errors out propagates a 500 with the ID unrecorded, so the
    // provider's retry of the same delivery is applied, not dismissed as a
    // replay. Replays of ledgered events re-run the transition, where the
    // status guard makes them no-ops.
    let first_delivery =
        state.store.record_processed_event(event.id.clone(), state.clock.now_utc()).await?;
    if !first_delivery {
        warn!(event_id = %event.id, "Webhook event already processed, acknowledging replay");
    }

    Ok(Json(WebhookAck { received: true }))
}

/// Applies an `inspection_completed` event to the policy it correlates to.
async fn apply_completion(state: &AppState, event: &WebhookEvent) -> Result<(), ApiError> {
    let Some(policy_id) = correlated_policy_id(event) else {
        warn!(
            event_id = %event.id,
            inspection_id = %event.payload.inspection_id,
            "Completion event carries no policy correlation, acknowledging"
        );
        return Ok(());
    };

    let (status, start_date) = if event.payload.is_approved() {
        (PolicyStatus::Issued, Some(state.clock.now_utc()))
    } else {
        (PolicyStatus::Declined, None)
    };

    let applied = state.store.complete_verification(policy_id, status, start_date).await?;
    if applied {
        info!(%policy_id, %status, "Policy verification completed");
    } else {
        // Policy missing, still pending, or already closed out; nothing to do
        warn!(%policy_id, %status, "Verification transition not applicable, acknowledging");
    }

    Ok(())
}

/// Extracts the policy ID echoed back in the event metadata.
fn correlated_policy_id(event: &WebhookEvent) -> Option<PolicyId> {
    event
        .payload
        .metadata
        .get("policy_id")
        .and_then(|value| value.as_str())
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .map(PolicyId::from)
}
