//! Repository for the insurable-goods catalog.
//!
//! Catalog rows are read-only from the workflow's perspective; inserts
//! happen only through startup seeding and test fixtures.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{AvailableGood, AvailableGoodId},
};

/// Repository for catalog-good database operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Inserts a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn create(&self, good: &AvailableGood) -> Result<AvailableGoodId> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO available_goods (id, category, kind, price)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(good.id.0)
        .bind(&good.category)
        .bind(&good.kind)
        .bind(good.price)
        .fetch_one(&*self.pool)
        .await?;

        Ok(AvailableGoodId(id))
    }

    /// Bulk-reads catalog entries by ID.
    ///
    /// Result order is unspecified; callers must match rows back to their
    /// input by ID, never by position.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_ids(&self, ids: &[AvailableGoodId]) -> Result<Vec<AvailableGood>> {
        let raw_ids: Vec<uuid::Uuid> = ids.iter().map(|id| id.0).collect();
        let goods = sqlx::query_as::<_, AvailableGood>(
            r#"
            SELECT id, category, kind, price
            FROM available_goods
            WHERE id = ANY($1)
            "#,
        )
        .bind(&raw_ids)
        .fetch_all(&*self.pool)
        .await?;

        Ok(goods)
    }

    /// Lists the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list(&self) -> Result<Vec<AvailableGood>> {
        let goods = sqlx::query_as::<_, AvailableGood>(
            r#"
            SELECT id, category, kind, price
            FROM available_goods
            ORDER BY category, kind
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(goods)
    }

    /// Counts catalog entries. Used to decide whether seeding is needed.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM available_goods")
            .fetch_one(&*self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repository_can_be_created() {
        let pool = sqlx::PgPool::connect_lazy("postgresql://test").unwrap();
        let _repo = Repository::new(Arc::new(pool));
    }
}
