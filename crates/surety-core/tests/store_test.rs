//! Integration tests for the in-memory record store.
//!
//! Exercises the transition guards every workflow depends on: the policy
//! creation saga, the webhook verdict transition, the verified-once user
//! flag, and the idempotency ledger. The PostgreSQL implementation encodes
//! the same guards in SQL and is covered behind a live database.

use chrono::{TimeZone, Utc};
use surety_core::{
    models::{AvailableGood, AvailableGoodId, Customer, CustomerId, PolicyGood, User, UserId},
    AvailablePolicyId, InspectionRef, MemoryStore, Policy, PolicyId, PolicyStatus, RecordStore,
};
use uuid::Uuid;

fn sample_policy() -> Policy {
    let created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Policy::new(CustomerId::new(), AvailablePolicyId::new(), created)
}

fn sample_good(available_good_id: AvailableGoodId) -> PolicyGood {
    PolicyGood {
        id: Uuid::new_v4(),
        available_good_id,
        category: "electronics".to_string(),
        kind: "mobile".to_string(),
        make: Some("Apple".to_string()),
        model: Some("iPhone 12".to_string()),
        price: Some(100),
        product_inspection_id: "prd_1".to_string(),
    }
}

/// A created policy is pending until the inspection is attached, then waits
/// for verification.
#[tokio::test]
async fn attach_inspection_promotes_pending_policy() {
    let store = MemoryStore::new();
    let policy = sample_policy();
    let policy_id = store.create_policy(policy).await.unwrap();

    let promoted =
        store.attach_inspection(policy_id, InspectionRef::from("insp_1")).await.unwrap();
    assert!(promoted);

    let stored = store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PolicyStatus::WaitingVerification);
    assert_eq!(stored.inspection_id, Some(InspectionRef::from("insp_1")));

    // A second attach must not fire: the policy already left pending
    let again = store.attach_inspection(policy_id, InspectionRef::from("insp_2")).await.unwrap();
    assert!(!again);
    let stored = store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(stored.inspection_id, Some(InspectionRef::from("insp_1")));
}

/// A failed provider call during initiation is recorded, not silently lost.
#[tokio::test]
async fn mark_inspection_failed_records_terminal_state() {
    let store = MemoryStore::new();
    let policy_id = store.create_policy(sample_policy()).await.unwrap();

    assert!(store.mark_inspection_failed(policy_id).await.unwrap());

    let stored = store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PolicyStatus::InspectionFailed);
    assert!(stored.inspection_id.is_none());

    // Terminal: neither attach nor verdict can move it
    assert!(!store.attach_inspection(policy_id, InspectionRef::from("insp_1")).await.unwrap());
    assert!(!store
        .complete_verification(policy_id, PolicyStatus::Issued, Some(Utc::now()))
        .await
        .unwrap());
}

/// The verdict transition fires only from waiting_verification and only
/// once.
#[tokio::test]
async fn complete_verification_is_guarded() {
    let store = MemoryStore::new();
    let policy_id = store.create_policy(sample_policy()).await.unwrap();

    // Still pending: the guard refuses
    assert!(!store
        .complete_verification(policy_id, PolicyStatus::Issued, Some(Utc::now()))
        .await
        .unwrap());

    store.attach_inspection(policy_id, InspectionRef::from("insp_1")).await.unwrap();

    let issued_at = Utc.with_ymd_and_hms(2024, 6, 2, 9, 30, 0).unwrap();
    assert!(store
        .complete_verification(policy_id, PolicyStatus::Issued, Some(issued_at))
        .await
        .unwrap());

    let stored = store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PolicyStatus::Issued);
    assert_eq!(stored.start_date, Some(issued_at));

    // Replay: the policy is already issued, nothing changes
    assert!(!store
        .complete_verification(policy_id, PolicyStatus::Declined, None)
        .await
        .unwrap());
    let stored = store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PolicyStatus::Issued);
    assert_eq!(stored.start_date, Some(issued_at));
}

/// Declined verdicts never record a start date.
#[tokio::test]
async fn declined_policy_has_no_start_date() {
    let store = MemoryStore::new();
    let policy_id = store.create_policy(sample_policy()).await.unwrap();
    store.attach_inspection(policy_id, InspectionRef::from("insp_1")).await.unwrap();

    assert!(store
        .complete_verification(policy_id, PolicyStatus::Declined, None)
        .await
        .unwrap());

    let stored = store.find_policy(policy_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PolicyStatus::Declined);
    assert!(stored.start_date.is_none());
}

/// Goods append in order and survive a later status transition.
#[tokio::test]
async fn append_goods_preserves_submission_order() {
    let store = MemoryStore::new();
    let policy_id = store.create_policy(sample_policy()).await.unwrap();

    let first = sample_good(AvailableGoodId::new());
    let second = PolicyGood { product_inspection_id: "prd_2".to_string(), ..sample_good(AvailableGoodId::new()) };

    let updated = store.append_goods(policy_id, vec![first.clone()]).await.unwrap();
    assert_eq!(updated.goods(), [first.clone()]);

    let updated = store.append_goods(policy_id, vec![second.clone()]).await.unwrap();
    assert_eq!(updated.goods(), [first, second]);
}

/// Appending to a missing policy is a not-found error, not a silent create.
#[tokio::test]
async fn append_goods_to_missing_policy_fails() {
    let store = MemoryStore::new();
    let result = store.append_goods(PolicyId::new(), vec![sample_good(AvailableGoodId::new())]).await;

    assert!(matches!(result, Err(surety_core::CoreError::NotFound(_))));
}

/// Catalog bulk reads match by ID, skipping unknown entries.
#[tokio::test]
async fn find_available_goods_matches_by_id() {
    let store = MemoryStore::new();
    let golf = AvailableGood {
        id: AvailableGoodId::new(),
        category: "sports".to_string(),
        kind: "golf_set".to_string(),
        price: None,
    };
    let tv = AvailableGood {
        id: AvailableGoodId::new(),
        category: "home".to_string(),
        kind: "tv".to_string(),
        price: Some(50_000),
    };
    store.create_available_good(golf.clone()).await.unwrap();
    store.create_available_good(tv.clone()).await.unwrap();

    let found = store.find_available_goods(vec![tv.id, AvailableGoodId::new()]).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, tv.id);
    assert_eq!(found[0].kind, "tv");
}

/// The verified flag flips at most once.
#[tokio::test]
async fn mark_user_verified_flips_once() {
    let store = MemoryStore::new();
    let user = User {
        id: UserId::new(),
        firstname: "Ana".to_string(),
        lastname: "Gomez".to_string(),
        username: "anag".to_string(),
        email: "a@x.com".to_string(),
        identification: "123".to_string(),
        password_hash: "deadbeef".to_string(),
        verified: false,
        inspection_id: None,
        created_at: Utc::now(),
    };
    let user_id = store.create_user(user).await.unwrap();

    assert!(store.mark_user_verified(user_id).await.unwrap());
    assert!(!store.mark_user_verified(user_id).await.unwrap());

    let stored = store.find_user(user_id).await.unwrap().unwrap();
    assert!(stored.verified);
}

/// The idempotency ledger admits each event ID exactly once.
#[tokio::test]
async fn processed_event_ledger_deduplicates() {
    let store = MemoryStore::new();
    let now = Utc::now();

    assert!(store.record_processed_event("evt_1".to_string(), now).await.unwrap());
    assert!(!store.record_processed_event("evt_1".to_string(), now).await.unwrap());
    assert!(store.record_processed_event("evt_2".to_string(), now).await.unwrap());
}

/// Customers persist with the attributes captured at initiation.
#[tokio::test]
async fn create_customer_stores_identity_fields() {
    let store = MemoryStore::new();
    let customer = Customer {
        id: CustomerId::new(),
        occupation: Some("engineer".to_string()),
        firstname: "Ana".to_string(),
        lastname: None,
        email: "a@x.com".to_string(),
        identification: "123".to_string(),
        created_at: Utc::now(),
    };

    let id = store.create_customer(customer.clone()).await.unwrap();
    assert_eq!(id, customer.id);
}
