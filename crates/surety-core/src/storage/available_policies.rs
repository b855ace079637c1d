//! Repository for the policy-template catalog.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{AvailablePolicy, AvailablePolicyId},
};

/// Repository for policy-template database operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Inserts a policy template.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn create(&self, template: &AvailablePolicy) -> Result<AvailablePolicyId> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO available_policies (id, name, coverages)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(template.id.0)
        .bind(&template.name)
        .bind(&template.coverages)
        .fetch_one(&*self.pool)
        .await?;

        Ok(AvailablePolicyId(id))
    }

    /// Finds a template by ID.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_id(&self, id: AvailablePolicyId) -> Result<Option<AvailablePolicy>> {
        let template = sqlx::query_as::<_, AvailablePolicy>(
            r#"
            SELECT id, name, coverages
            FROM available_policies
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(template)
    }

    /// Lists all templates.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list(&self) -> Result<Vec<AvailablePolicy>> {
        let templates = sqlx::query_as::<_, AvailablePolicy>(
            r#"
            SELECT id, name, coverages
            FROM available_policies
            ORDER BY name
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(templates)
    }

    /// Counts templates. Used to decide whether seeding is needed.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM available_policies")
            .fetch_one(&*self.pool)
            .await?;

        Ok(count.0)
    }
}
