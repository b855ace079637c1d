//! Builder-style fixtures for domain records and webhook envelopes.

use chrono::Utc;
use surety_core::models::{
    AvailableGoodId, AvailablePolicyId, Customer, CustomerId, Policy, PolicyGood, PolicyStatus,
    User, UserId,
};
use surety_inspection::webhook::sign_payload;
use uuid::Uuid;

/// Builds a [`Policy`] in a chosen lifecycle state.
#[derive(Debug)]
pub struct PolicyBuilder {
    customer_id: CustomerId,
    available_policy_id: AvailablePolicyId,
    status: PolicyStatus,
    inspection_id: Option<String>,
    goods: Vec<PolicyGood>,
}

impl PolicyBuilder {
    /// Starts a builder for a policy in `pending_inspection`.
    pub fn new() -> Self {
        Self {
            customer_id: CustomerId::new(),
            available_policy_id: AvailablePolicyId::new(),
            status: PolicyStatus::PendingInspection,
            inspection_id: None,
            goods: Vec::new(),
        }
    }

    /// Puts the policy in `waiting_verification` with the given inspection.
    #[must_use]
    pub fn waiting_verification(mut self, inspection_id: &str) -> Self {
        self.status = PolicyStatus::WaitingVerification;
        self.inspection_id = Some(inspection_id.to_string());
        self
    }

    /// Overrides the lifecycle status.
    #[must_use]
    pub fn status(mut self, status: PolicyStatus) -> Self {
        self.status = status;
        self
    }

    /// Overrides the customer reference.
    #[must_use]
    pub fn customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = customer_id;
        self
    }

    /// Overrides the template reference.
    #[must_use]
    pub fn template(mut self, available_policy_id: AvailablePolicyId) -> Self {
        self.available_policy_id = available_policy_id;
        self
    }

    /// Embeds a good with the given provider product ID.
    #[must_use]
    pub fn with_good(mut self, product_inspection_id: &str) -> Self {
        self.goods.push(PolicyGood {
            id: Uuid::new_v4(),
            available_good_id: AvailableGoodId::new(),
            category: "electronics".to_string(),
            kind: "mobile".to_string(),
            make: Some("Apple".to_string()),
            model: Some("iPhone 12".to_string()),
            price: Some(100_000),
            product_inspection_id: product_inspection_id.to_string(),
        });
        self
    }

    /// Builds the policy.
    pub fn build(self) -> Policy {
        let now = Utc::now();
        let mut policy = Policy::new(self.customer_id, self.available_policy_id, now);
        policy.status = self.status;
        policy.inspection_id = self.inspection_id.map(Into::into);
        policy.goods.0 = self.goods;
        policy
    }
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a [`User`] for the identity-verification flow.
#[derive(Debug)]
pub struct UserBuilder {
    username: String,
    email: String,
    verified: bool,
    inspection_id: Option<String>,
}

impl UserBuilder {
    /// Starts a builder for an unverified user.
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            verified: false,
            inspection_id: None,
        }
    }

    /// Overrides the email address.
    #[must_use]
    pub fn email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    /// Marks the user already verified.
    #[must_use]
    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    /// Attaches a people inspection reference.
    #[must_use]
    pub fn with_inspection(mut self, inspection_id: &str) -> Self {
        self.inspection_id = Some(inspection_id.to_string());
        self
    }

    /// Builds the user.
    pub fn build(self) -> User {
        User {
            id: UserId::new(),
            firstname: "Ana".to_string(),
            lastname: "Gomez".to_string(),
            username: self.username,
            email: self.email,
            identification: "30123456".to_string(),
            password_hash: sha256::digest("hunter2"),
            verified: self.verified,
            inspection_id: self.inspection_id.map(Into::into),
            created_at: Utc::now(),
        }
    }
}

/// A customer fixture with plausible field values.
pub fn customer() -> Customer {
    Customer {
        id: CustomerId::new(),
        occupation: Some("engineer".to_string()),
        firstname: "Ana".to_string(),
        lastname: Some("Gomez".to_string()),
        email: "ana@example.com".to_string(),
        identification: "30123456".to_string(),
        created_at: Utc::now(),
    }
}

/// Builds signed webhook envelopes the way the provider delivers them.
#[derive(Debug)]
pub struct WebhookEventBuilder {
    event_id: String,
    event: String,
    inspection_id: String,
    verdict: Option<String>,
    metadata: serde_json::Value,
}

impl WebhookEventBuilder {
    /// Starts an `inspection_completed` envelope for the given inspection.
    pub fn completed(inspection_id: &str) -> Self {
        Self {
            event_id: format!("evt_{}", Uuid::new_v4().simple()),
            event: "inspection_completed".to_string(),
            inspection_id: inspection_id.to_string(),
            verdict: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Overrides the envelope event ID.
    #[must_use]
    pub fn event_id(mut self, event_id: &str) -> Self {
        self.event_id = event_id.to_string();
        self
    }

    /// Overrides the event type.
    #[must_use]
    pub fn event(mut self, event: &str) -> Self {
        self.event = event.to_string();
        self
    }

    /// Sets an approved verdict.
    #[must_use]
    pub fn approved(mut self) -> Self {
        self.verdict = Some("approved".to_string());
        self
    }

    /// Sets a declined verdict.
    #[must_use]
    pub fn declined(mut self) -> Self {
        self.verdict = Some("declined".to_string());
        self
    }

    /// Correlates the event back to a policy via metadata.
    #[must_use]
    pub fn for_policy(mut self, policy_id: impl std::fmt::Display) -> Self {
        self.metadata = serde_json::json!({ "policy_id": policy_id.to_string() });
        self
    }

    /// Serializes the envelope to the raw bytes the provider would send.
    pub fn body(&self) -> Vec<u8> {
        serde_json::json!({
            "id": self.event_id,
            "event": self.event,
            "payload": {
                "inspection_id": self.inspection_id,
                "verdict": self.verdict,
                "metadata": self.metadata,
            }
        })
        .to_string()
        .into_bytes()
    }

    /// Signs the serialized body with the given webhook secret.
    pub fn signature(&self, secret: &str) -> String {
        format!("sha256={}", sign_payload(&self.body(), secret))
    }
}
