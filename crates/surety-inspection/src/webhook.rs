//! Signed webhook envelopes from the inspection provider.
//!
//! The provider signs every delivery with HMAC-SHA256 over the exact raw
//! body bytes. [`construct_event`] verifies that signature first and only
//! then deserializes the envelope, so handlers never see unauthenticated
//! payload data. Accepted signature header formats are `sha256=<hex>`,
//! `v1=<hex>`, and bare hex.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::error::{InspectionError, Result};

type HmacSha256 = Hmac<Sha256>;

/// A verified webhook event from the inspection provider.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Provider-assigned event ID, unique per delivery attempt group.
    ///
    /// Delivery is at-least-once; consumers deduplicate on this value.
    pub id: String,
    /// Event type, e.g. `inspection_completed`.
    pub event: String,
    /// Event payload.
    pub payload: WebhookPayload,
}

/// Payload of an inspection webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Inspection the event refers to.
    pub inspection_id: String,
    /// Pass/fail determination, present on completion events.
    pub verdict: Option<String>,
    /// Metadata echoed back from inspection creation.
    #[serde(default)]
    pub metadata: Value,
}

impl WebhookPayload {
    /// Whether the provider approved the inspection.
    pub fn is_approved(&self) -> bool {
        self.verdict.as_deref() == Some("approved")
    }
}

/// Verifies a webhook delivery and parses its envelope.
///
/// `payload` must be the exact raw request body bytes; re-serialized JSON
/// will not reproduce the signature. Verification runs before any parsing,
/// and the comparison is constant-time.
///
/// # Errors
///
/// Returns `InspectionError::InvalidSignature` when the header is missing,
/// malformed, or does not match, and `InspectionError::InvalidPayload` when
/// the verified body is not a valid event envelope.
pub fn construct_event(payload: &[u8], signature: &str, secret: &str) -> Result<WebhookEvent> {
    if signature.is_empty() {
        return Err(InspectionError::invalid_signature("signature header is empty"));
    }
    if secret.is_empty() {
        return Err(InspectionError::invalid_signature("webhook secret is empty"));
    }

    let provided = parse_signature_format(signature)?;
    let expected = sign_payload(payload, secret);

    if !timing_safe_eq(&provided, &expected) {
        return Err(InspectionError::invalid_signature("signature mismatch"));
    }

    serde_json::from_slice(payload)
        .map_err(|e| InspectionError::invalid_payload(e.to_string()))
}

/// Computes the HMAC-SHA256 signature of a payload as lowercase hex.
///
/// This is what the provider puts in the signature header; exposed so tests
/// and fixtures can sign payloads the same way.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Extracts the hex digest from the accepted signature header formats.
fn parse_signature_format(signature: &str) -> Result<String> {
    if let Some(hex) = signature.strip_prefix("sha256=") {
        return Ok(hex.to_string());
    }

    if let Some(hex) = signature.strip_prefix("v1=") {
        return Ok(hex.to_string());
    }

    // Bare hex: must be a full SHA-256 digest
    if signature.len() == 64 && signature.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(signature.to_string());
    }

    Err(InspectionError::invalid_signature(
        "expected 'sha256=<hex>', 'v1=<hex>', or raw hex",
    ))
}

/// Constant-time string comparison.
fn timing_safe_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (a_byte, b_byte) in a.as_bytes().iter().zip(b.as_bytes()) {
        result |= a_byte ^ b_byte;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    fn signed_body() -> (Vec<u8>, String) {
        let body = serde_json::json!({
            "id": "evt_1",
            "event": "inspection_completed",
            "payload": {
                "inspection_id": "ins_1",
                "verdict": "approved",
                "metadata": { "policy_id": "11111111-1111-1111-1111-111111111111" }
            }
        })
        .to_string()
        .into_bytes();
        let signature = sign_payload(&body, SECRET);
        (body, signature)
    }

    #[test]
    fn construct_event_accepts_all_signature_formats() {
        let (body, hex) = signed_body();

        for header in [format!("sha256={hex}"), format!("v1={hex}"), hex] {
            let event = construct_event(&body, &header, SECRET).unwrap();
            assert_eq!(event.id, "evt_1");
            assert_eq!(event.event, "inspection_completed");
            assert!(event.payload.is_approved());
        }
    }

    #[test]
    fn construct_event_rejects_wrong_secret() {
        let (body, hex) = signed_body();
        let result = construct_event(&body, &format!("sha256={hex}"), "whsec_other");

        assert!(matches!(result, Err(InspectionError::InvalidSignature { .. })));
    }

    #[test]
    fn construct_event_rejects_tampered_body() {
        let (body, hex) = signed_body();
        let mut tampered = body.clone();
        let pos = tampered
            .windows(8)
            .position(|w| w == b"approved")
            .unwrap();
        tampered[pos..pos + 8].copy_from_slice(b"declined");

        let result = construct_event(&tampered, &format!("sha256={hex}"), SECRET);
        assert!(matches!(result, Err(InspectionError::InvalidSignature { .. })));
    }

    #[test]
    fn construct_event_rejects_missing_or_malformed_header() {
        let (body, _) = signed_body();

        assert!(construct_event(&body, "", SECRET).is_err());
        assert!(construct_event(&body, "not-a-signature", SECRET).is_err());
        assert!(construct_event(&body, "sha1=abc", SECRET).is_err());
    }

    #[test]
    fn verified_but_malformed_body_is_invalid_payload() {
        let body = b"{\"not\": \"an envelope\"}";
        let signature = format!("sha256={}", sign_payload(body, SECRET));

        let result = construct_event(body, &signature, SECRET);
        assert!(matches!(result, Err(InspectionError::InvalidPayload { .. })));
    }

    #[test]
    fn declined_verdict_is_not_approved() {
        let payload = WebhookPayload {
            inspection_id: "ins_1".to_string(),
            verdict: Some("declined".to_string()),
            metadata: Value::Null,
        };
        assert!(!payload.is_approved());

        let payload = WebhookPayload {
            inspection_id: "ins_1".to_string(),
            verdict: None,
            metadata: Value::Null,
        };
        assert!(!payload.is_approved());
    }

    #[test]
    fn timing_safe_eq_basic_properties() {
        assert!(timing_safe_eq("abc", "abc"));
        assert!(!timing_safe_eq("abc", "abd"));
        assert!(!timing_safe_eq("abc", "abcd"));
    }
}
