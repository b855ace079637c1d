//! Repository for policy database operations.
//!
//! Handles policy creation and every status transition. Transitions are
//! guarded on the current status so webhook replays and races resolve to
//! no-ops instead of double application.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::Result,
    models::{InspectionRef, Policy, PolicyGood, PolicyId, PolicyStatus},
};

const POLICY_COLUMNS: &str = "id, customer_id, available_policy_id, status, inspection_id, \
                              start_date, end_date, goods, created_at, updated_at";

/// Repository for policy database operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Inserts a new policy.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails or constraints are violated.
    pub async fn create(&self, policy: &Policy) -> Result<PolicyId> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO policies (
                id, customer_id, available_policy_id, status, inspection_id,
                start_date, end_date, goods, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
            )
            RETURNING id
            "#,
        )
        .bind(policy.id.0)
        .bind(policy.customer_id.0)
        .bind(policy.available_policy_id.0)
        .bind(policy.status.to_string())
        .bind(policy.inspection_id.as_ref().map(InspectionRef::as_str))
        .bind(policy.start_date)
        .bind(policy.end_date)
        .bind(&policy.goods)
        .bind(policy.created_at)
        .bind(policy.updated_at)
        .fetch_one(&*self.pool)
        .await?;

        Ok(PolicyId(id))
    }

    /// Finds a policy by ID.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_id(&self, policy_id: PolicyId) -> Result<Option<Policy>> {
        let policy = sqlx::query_as::<_, Policy>(&format!(
            "SELECT {POLICY_COLUMNS} FROM policies WHERE id = $1"
        ))
        .bind(policy_id.0)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(policy)
    }

    /// Attaches the provider inspection and promotes the policy to
    /// `waiting_verification`.
    ///
    /// Guarded on `pending_inspection` so the promotion applies at most
    /// once. Returns whether a row was updated.
    ///
    /// # Errors
    ///
    /// Returns error if update fails.
    pub async fn attach_inspection(
        &self,
        policy_id: PolicyId,
        inspection_id: &InspectionRef,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE policies
            SET status = 'waiting_verification', inspection_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending_inspection'
            "#,
        )
        .bind(policy_id.0)
        .bind(inspection_id.as_str())
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records that the provider call during initiation failed.
    ///
    /// Guarded on `pending_inspection`. Returns whether a row was updated.
    ///
    /// # Errors
    ///
    /// Returns error if update fails.
    pub async fn mark_inspection_failed(&self, policy_id: PolicyId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE policies
            SET status = 'inspection_failed', updated_at = NOW()
            WHERE id = $1 AND status = 'pending_inspection'
            "#,
        )
        .bind(policy_id.0)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Appends goods to the policy's embedded list and returns the updated
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the policy does not exist.
    pub async fn append_goods(&self, policy_id: PolicyId, goods: Vec<PolicyGood>) -> Result<Policy> {
        let policy = sqlx::query_as::<_, Policy>(&format!(
            r#"
            UPDATE policies
            SET goods = goods || $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {POLICY_COLUMNS}
            "#
        ))
        .bind(policy_id.0)
        .bind(sqlx::types::Json(goods))
        .fetch_one(&*self.pool)
        .await?;

        Ok(policy)
    }

    /// Applies the webhook verdict transition.
    ///
    /// Guarded on `waiting_verification`: a policy already closed out (or a
    /// replayed webhook racing past the ledger) leaves the row untouched.
    /// Returns whether the transition was applied.
    ///
    /// # Errors
    ///
    /// Returns error if update fails.
    pub async fn complete_verification(
        &self,
        policy_id: PolicyId,
        status: PolicyStatus,
        start_date: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE policies
            SET status = $2, start_date = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'waiting_verification'
            "#,
        )
        .bind(policy_id.0)
        .bind(status.to_string())
        .bind(start_date)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
