//! Webhook receiver behavior: signature enforcement, verdict transitions,
//! and the idempotency ledger.

use std::sync::Arc;

use axum::http::StatusCode;
use surety_core::{PolicyStatus, RecordStore};
use surety_testing::{
    env::WEBHOOK_SECRET, fixtures, FlakyStore, PolicyBuilder, TestEnv, WebhookEventBuilder,
};
use wiremock::{matchers, Mock, ResponseTemplate};

/// Inserts a policy waiting for its verification webhook.
async fn waiting_policy(env: &TestEnv) -> surety_core::PolicyId {
    let customer = fixtures::customer();
    let customer_id = env.store.create_customer(customer).await.unwrap();
    let policy = PolicyBuilder::new()
        .customer(customer_id)
        .waiting_verification("ins_1")
        .with_good("prd_1")
        .build();
    env.store.create_policy(policy).await.unwrap()
}

#[tokio::test]
async fn approved_completion_issues_policy_with_start_date() {
    let env = TestEnv::new().await;
    let policy_id = waiting_policy(&env).await;

    let event = WebhookEventBuilder::completed("ins_1").approved().for_policy(policy_id);
    let response = env.post_webhook(event.body(), &event.signature(WEBHOOK_SECRET)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = TestEnv::body_json(response).await;
    assert_eq!(body["received"], true);

    let policy = env.store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(policy.status, PolicyStatus::Issued);
    assert!(policy.start_date.is_some());
}

#[tokio::test]
async fn declined_completion_declines_policy_without_start_date() {
    let env = TestEnv::new().await;
    let policy_id = waiting_policy(&env).await;

    let event = WebhookEventBuilder::completed("ins_1").declined().for_policy(policy_id);
    let response = env.post_webhook(event.body(), &event.signature(WEBHOOK_SECRET)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let policy = env.store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(policy.status, PolicyStatus::Declined);
    assert!(policy.start_date.is_none());
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_mutation() {
    let env = TestEnv::new().await;
    let policy_id = waiting_policy(&env).await;

    let event = WebhookEventBuilder::completed("ins_1").approved().for_policy(policy_id);

    // Signed with the wrong secret
    let response = env.post_webhook(event.body(), &event.signature("whsec_wrong")).await;
    TestEnv::assert_error(response, StatusCode::BAD_REQUEST, "invalid_webhook").await;

    // No header at all
    let response = env.post_unsigned_webhook(event.body()).await;
    TestEnv::assert_error(response, StatusCode::BAD_REQUEST, "invalid_webhook").await;

    let policy = env.store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(policy.status, PolicyStatus::WaitingVerification);
}

#[tokio::test]
async fn replayed_event_id_is_acknowledged_without_reapplying() {
    let env = TestEnv::new().await;
    let policy_id = waiting_policy(&env).await;

    let declined =
        WebhookEventBuilder::completed("ins_1").event_id("evt_dup").declined().for_policy(policy_id);
    let response = env.post_webhook(declined.body(), &declined.signature(WEBHOOK_SECRET)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Same envelope ID, contradictory verdict; the ledger wins
    let approved =
        WebhookEventBuilder::completed("ins_1").event_id("evt_dup").approved().for_policy(policy_id);
    let response = env.post_webhook(approved.body(), &approved.signature(WEBHOOK_SECRET)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let policy = env.store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(policy.status, PolicyStatus::Declined);
    assert!(policy.start_date.is_none());
}

#[tokio::test]
async fn retry_after_failed_transition_still_applies_verdict() {
    // A storage failure during the transition must not ledger the event;
    // the provider's redelivery of the same envelope has to get through.
    let env =
        TestEnv::with_store(|inner| Arc::new(FlakyStore::new(inner).fail_completions(1))).await;
    let policy_id = waiting_policy(&env).await;

    let event = WebhookEventBuilder::completed("ins_1")
        .event_id("evt_retry")
        .approved()
        .for_policy(policy_id);

    let response = env.post_webhook(event.body(), &event.signature(WEBHOOK_SECRET)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let policy = env.store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(policy.status, PolicyStatus::WaitingVerification);

    let response = env.post_webhook(event.body(), &event.signature(WEBHOOK_SECRET)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let policy = env.store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(policy.status, PolicyStatus::Issued);
    assert!(policy.start_date.is_some());
}

#[tokio::test]
async fn late_webhook_for_closed_policy_is_acknowledged() {
    let env = TestEnv::new().await;
    let policy_id = waiting_policy(&env).await;

    let approved = WebhookEventBuilder::completed("ins_1").approved().for_policy(policy_id);
    env.post_webhook(approved.body(), &approved.signature(WEBHOOK_SECRET)).await;

    // A fresh event ID for an already-issued policy: acknowledged, no change
    let declined = WebhookEventBuilder::completed("ins_1").declined().for_policy(policy_id);
    let response = env.post_webhook(declined.body(), &declined.signature(WEBHOOK_SECRET)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let policy = env.store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(policy.status, PolicyStatus::Issued);
}

#[tokio::test]
async fn event_without_policy_correlation_is_acknowledged() {
    let env = TestEnv::new().await;

    let event = WebhookEventBuilder::completed("ins_orphan").approved();
    let response = env.post_webhook(event.body(), &event.signature(WEBHOOK_SECRET)).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_event_type_is_acknowledged_without_effect() {
    let env = TestEnv::new().await;
    let policy_id = waiting_policy(&env).await;

    let event = WebhookEventBuilder::completed("ins_1")
        .event("inspection_started")
        .approved()
        .for_policy(policy_id);
    let response = env.post_webhook(event.body(), &event.signature(WEBHOOK_SECRET)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let policy = env.store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(policy.status, PolicyStatus::WaitingVerification);
}

#[tokio::test]
async fn full_lifecycle_through_webhook() {
    // Initiate through the API, finish, then complete via webhook
    let env = TestEnv::seeded().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/v1/inspections/goods"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "inspection_id": "ins_life"
        })))
        .mount(&env.provider)
        .await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/v1/inspections/ins_life/finish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&env.provider)
        .await;

    let templates = TestEnv::body_json(env.get("/available-policies").await).await;
    let template = templates[0]["id"].as_str().unwrap();
    let body = serde_json::json!({
        "customer": {
            "firstname": "Ana",
            "email": "ana@example.com",
            "identification": "30123456"
        }
    });
    let response = env.post_json(&format!("/policy/{template}"), &body).await;
    let policy_id = TestEnv::body_json(response).await["policy_id"]
        .as_str()
        .unwrap()
        .parse::<uuid::Uuid>()
        .unwrap();

    env.post_json(&format!("/policy/{policy_id}/inspection/finish"), &serde_json::json!({}))
        .await;

    let event = WebhookEventBuilder::completed("ins_life").approved().for_policy(policy_id);
    let response = env.post_webhook(event.body(), &event.signature(WEBHOOK_SECRET)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let policy = env.store.find_policy(policy_id.into()).await.unwrap().unwrap();
    assert_eq!(policy.status, PolicyStatus::Issued);
}
