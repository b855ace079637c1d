//! Core domain models and strongly-typed identifiers.
//!
//! Defines policies, customers, catalog entries, users, and newtype ID
//! wrappers for compile-time type safety. Includes database serialization
//! traits and the policy verification state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

type PgDb = sqlx::Postgres;
type PgValueRef<'r> = sqlx::postgres::PgValueRef<'r>;
type PgTypeInfo = sqlx::postgres::PgTypeInfo;
type PgArgumentBuffer = sqlx::postgres::PgArgumentBuffer;
type EncodeResult =
    Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync + 'static>>;
type BoxDynError = sqlx::error::BoxDynError;

/// Strongly-typed policy identifier.
///
/// Wraps a UUID to prevent mixing with other ID types. A policy keeps this
/// ID through its entire verification lifecycle, and the same value travels
/// to the inspection provider as correlation metadata.
///
/// # Example
///
/// ```
/// use surety_core::models::PolicyId;
/// let policy_id = PolicyId::new();
/// println!("Tracking policy: {}", policy_id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub Uuid);

impl PolicyId {
    /// Creates a new random policy ID.
    ///
    /// Uses UUID v4 for globally unique identifiers without coordination.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PolicyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PolicyId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl sqlx::Type<PgDb> for PolicyId {
    fn type_info() -> PgTypeInfo {
        <Uuid as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for PolicyId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let uuid = <Uuid as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(uuid))
    }
}

impl sqlx::Encode<'_, PgDb> for PolicyId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <Uuid as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Strongly-typed customer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
    /// Creates a new random customer ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CustomerId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl sqlx::Type<PgDb> for CustomerId {
    fn type_info() -> PgTypeInfo {
        <Uuid as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for CustomerId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let uuid = <Uuid as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(uuid))
    }
}

impl sqlx::Encode<'_, PgDb> for CustomerId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <Uuid as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Strongly-typed identifier for a catalog good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailableGoodId(pub Uuid);

impl AvailableGoodId {
    /// Creates a new random catalog-good ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AvailableGoodId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AvailableGoodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AvailableGoodId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl sqlx::Type<PgDb> for AvailableGoodId {
    fn type_info() -> PgTypeInfo {
        <Uuid as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for AvailableGoodId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let uuid = <Uuid as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(uuid))
    }
}

impl sqlx::Encode<'_, PgDb> for AvailableGoodId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <Uuid as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Strongly-typed identifier for a catalog policy template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailablePolicyId(pub Uuid);

impl AvailablePolicyId {
    /// Creates a new random policy-template ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AvailablePolicyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AvailablePolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AvailablePolicyId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl sqlx::Type<PgDb> for AvailablePolicyId {
    fn type_info() -> PgTypeInfo {
        <Uuid as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for AvailablePolicyId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let uuid = <Uuid as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(uuid))
    }
}

impl sqlx::Encode<'_, PgDb> for AvailablePolicyId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <Uuid as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Strongly-typed user identifier for the identity-verification flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Creates a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl sqlx::Type<PgDb> for UserId {
    fn type_info() -> PgTypeInfo {
        <Uuid as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for UserId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let uuid = <Uuid as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(uuid))
    }
}

impl sqlx::Encode<'_, PgDb> for UserId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <Uuid as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Opaque inspection reference assigned by the inspection provider.
///
/// Stored on a policy or user to correlate a later webhook or verification
/// callback back to the local record. The application treats it as valid for
/// the lifetime of the owning record; no uniqueness or expiry is enforced
/// locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InspectionRef(pub String);

impl InspectionRef {
    /// The reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InspectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for InspectionRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for InspectionRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl sqlx::Type<PgDb> for InspectionRef {
    fn type_info() -> PgTypeInfo {
        <str as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for InspectionRef {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(s.to_string()))
    }
}

impl sqlx::Encode<'_, PgDb> for InspectionRef {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <String as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Policy verification lifecycle status.
///
/// Policies progress through these states. Transitions are strictly
/// controlled so that webhook replays and races resolve to no-ops:
///
/// ```text
/// PendingInspection -> WaitingVerification -> Issued
///                  |                      -> Declined
///                  `-> InspectionFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    /// Local records written, inspection not yet created at the provider.
    ///
    /// A policy stays here only for the duration of the provider call made
    /// during initiation.
    PendingInspection,

    /// Inspection created; waiting for the provider's completion webhook.
    WaitingVerification,

    /// Verification passed. Terminal state; a start date is recorded.
    Issued,

    /// Verification failed or was rejected. Terminal state.
    Declined,

    /// The provider call during initiation failed.
    ///
    /// Terminal state recording that the policy never obtained an
    /// inspection. Kept for audit rather than silently deleting the rows
    /// already written.
    InspectionFailed,
}

impl PolicyStatus {
    /// Whether this status accepts no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Issued | Self::Declined | Self::InspectionFailed)
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingInspection => write!(f, "pending_inspection"),
            Self::WaitingVerification => write!(f, "waiting_verification"),
            Self::Issued => write!(f, "issued"),
            Self::Declined => write!(f, "declined"),
            Self::InspectionFailed => write!(f, "inspection_failed"),
        }
    }
}

impl sqlx::Type<PgDb> for PolicyStatus {
    fn type_info() -> PgTypeInfo {
        <str as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for PolicyStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as sqlx::Decode<PgDb>>::decode(value)?;
        match s {
            "pending_inspection" => Ok(Self::PendingInspection),
            "waiting_verification" => Ok(Self::WaitingVerification),
            "issued" => Ok(Self::Issued),
            "declined" => Ok(Self::Declined),
            "inspection_failed" => Ok(Self::InspectionFailed),
            _ => Err(format!("invalid policy status: {s}").into()),
        }
    }
}

impl sqlx::Encode<'_, PgDb> for PolicyStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <String as sqlx::Encode<PgDb>>::encode_by_ref(&self.to_string(), buf)
    }
}

/// An insured-goods contract tracked through the verification lifecycle.
///
/// Created at policy initiation with status `pending_inspection`, promoted
/// to `waiting_verification` once the provider inspection exists, and closed
/// out by the completion webhook. Goods are embedded in creation order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Policy {
    /// Unique identifier for this policy.
    pub id: PolicyId,

    /// Customer the policy was initiated for.
    pub customer_id: CustomerId,

    /// Catalog template this policy was created from.
    pub available_policy_id: AvailablePolicyId,

    /// Current verification status.
    pub status: PolicyStatus,

    /// Inspection assigned by the provider during initiation.
    ///
    /// None only while `pending_inspection` or after `inspection_failed`.
    pub inspection_id: Option<InspectionRef>,

    /// Coverage start, recorded when the policy is issued.
    pub start_date: Option<DateTime<Utc>>,

    /// Coverage end. Not set by any flow in this service.
    pub end_date: Option<DateTime<Utc>>,

    /// Insured goods, in the order they were added.
    pub goods: sqlx::types::Json<Vec<PolicyGood>>,

    /// When this policy was created.
    pub created_at: DateTime<Utc>,

    /// When this policy was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Policy {
    /// Creates a policy in its initial saga state with no goods attached.
    pub fn new(
        customer_id: CustomerId,
        available_policy_id: AvailablePolicyId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PolicyId::new(),
            customer_id,
            available_policy_id,
            status: PolicyStatus::PendingInspection,
            inspection_id: None,
            start_date: None,
            end_date: None,
            goods: sqlx::types::Json(Vec::new()),
            created_at,
            updated_at: created_at,
        }
    }

    /// Goods as a regular slice for easy access.
    pub fn goods(&self) -> &[PolicyGood] {
        &self.goods.0
    }

    /// Looks up an embedded good by its local ID.
    pub fn find_good(&self, good_id: Uuid) -> Option<&PolicyGood> {
        self.goods.0.iter().find(|good| good.id == good_id)
    }
}

/// A single insured good embedded in a policy.
///
/// Combines catalog fields resolved at add time with the caller-supplied
/// details and the provider's per-item inspection ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyGood {
    /// Local identifier, assigned when the good is added to the policy.
    pub id: Uuid,

    /// Catalog entry this good was selected from.
    pub available_good_id: AvailableGoodId,

    /// Catalog category (e.g. "electronics").
    pub category: String,

    /// Catalog kind within the category (e.g. "mobile").
    pub kind: String,

    /// Manufacturer, as supplied by the caller.
    pub make: Option<String>,

    /// Model, as supplied by the caller.
    pub model: Option<String>,

    /// Declared value in minor currency units.
    pub price: Option<i64>,

    /// Provider-assigned ID for this item inside the inspection.
    ///
    /// Image upload tokens are scoped to this value.
    pub product_inspection_id: String,
}

/// Identity attributes captured at policy initiation.
///
/// Created once per initiation request and immutable thereafter. The same
/// fields are forwarded to the provider as the inspection consumer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    /// Unique identifier for this customer.
    pub id: CustomerId,

    /// Stated occupation, if provided.
    pub occupation: Option<String>,

    /// Given name.
    pub firstname: String,

    /// Family name, if provided.
    pub lastname: Option<String>,

    /// Contact email, also used by the provider to address the consumer.
    pub email: String,

    /// National identification number.
    pub identification: String,

    /// When this customer was created.
    pub created_at: DateTime<Utc>,
}

/// Read-only catalog entry describing an insurable good.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AvailableGood {
    /// Unique identifier for this catalog entry.
    pub id: AvailableGoodId,

    /// Category (e.g. "sports", "electronics").
    pub category: String,

    /// Kind within the category (e.g. "golf_set", "mobile").
    pub kind: String,

    /// Reference price in minor currency units, when the catalog fixes one.
    ///
    /// Used as a default when the caller declares no price of their own.
    pub price: Option<i64>,
}

/// Read-only catalog entry describing a policy template.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AvailablePolicy {
    /// Unique identifier for this template.
    pub id: AvailablePolicyId,

    /// Display name.
    pub name: String,

    /// Coverage names included in the template.
    pub coverages: sqlx::types::Json<Vec<String>>,
}

impl AvailablePolicy {
    /// Coverages as a regular slice for easy access.
    pub fn coverages(&self) -> &[String] {
        &self.coverages.0
    }
}

/// An account in the identity-verification flow.
///
/// Created unverified at registration; the verified flag flips to true at
/// most once, when an approved inspection verdict is observed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique identifier for this user.
    pub id: UserId,

    /// Given name.
    pub firstname: String,

    /// Family name.
    pub lastname: String,

    /// Login name.
    pub username: String,

    /// Contact email, forwarded to the provider as the consumer address.
    pub email: String,

    /// National identification number.
    pub identification: String,

    /// SHA-256 digest of the password. Plaintext is never stored.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Whether an approved identity inspection has been observed.
    pub verified: bool,

    /// People inspection created for this user at registration.
    pub inspection_id: Option<InspectionRef>,

    /// When this user registered.
    pub created_at: DateTime<Utc>,
}

/// Ledger row marking a provider webhook event as already applied.
///
/// Webhook delivery is at-least-once; an event ID present here is
/// acknowledged without reapplying its transition.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProcessedWebhookEvent {
    /// Provider-assigned event ID from the webhook envelope.
    pub event_id: String,

    /// When the event was first applied.
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_status_display_format() {
        // All variants must format to their database representation
        assert_eq!(PolicyStatus::PendingInspection.to_string(), "pending_inspection");
        assert_eq!(PolicyStatus::WaitingVerification.to_string(), "waiting_verification");
        assert_eq!(PolicyStatus::Issued.to_string(), "issued");
        assert_eq!(PolicyStatus::Declined.to_string(), "declined");
        assert_eq!(PolicyStatus::InspectionFailed.to_string(), "inspection_failed");
    }

    #[test]
    fn policy_status_terminal_states() {
        assert!(!PolicyStatus::PendingInspection.is_terminal());
        assert!(!PolicyStatus::WaitingVerification.is_terminal());
        assert!(PolicyStatus::Issued.is_terminal());
        assert!(PolicyStatus::Declined.is_terminal());
        assert!(PolicyStatus::InspectionFailed.is_terminal());
    }

    #[test]
    fn new_policy_starts_pending_with_no_goods() {
        let now = chrono::Utc::now();
        let policy = Policy::new(CustomerId::new(), AvailablePolicyId::new(), now);

        assert_eq!(policy.status, PolicyStatus::PendingInspection);
        assert!(policy.inspection_id.is_none());
        assert!(policy.start_date.is_none());
        assert!(policy.goods().is_empty());
        assert_eq!(policy.created_at, policy.updated_at);
    }

    #[test]
    fn find_good_matches_on_local_id() {
        let now = chrono::Utc::now();
        let mut policy = Policy::new(CustomerId::new(), AvailablePolicyId::new(), now);
        let good = PolicyGood {
            id: Uuid::new_v4(),
            available_good_id: AvailableGoodId::new(),
            category: "electronics".to_string(),
            kind: "mobile".to_string(),
            make: Some("Apple".to_string()),
            model: Some("iPhone 12".to_string()),
            price: Some(100_000),
            product_inspection_id: "prd_123".to_string(),
        };
        policy.goods.0.push(good.clone());

        assert_eq!(policy.find_good(good.id), Some(&good));
        assert_eq!(policy.find_good(Uuid::new_v4()), None);
    }
}
