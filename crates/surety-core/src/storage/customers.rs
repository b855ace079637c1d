//! Repository for customer database operations.
//!
//! Customers are written once at policy initiation and never modified, so
//! this repository stays small.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{Customer, CustomerId},
};

/// Repository for customer database operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Inserts a new customer.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn create(&self, customer: &Customer) -> Result<CustomerId> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO customers (
                id, occupation, firstname, lastname, email, identification, created_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7
            )
            RETURNING id
            "#,
        )
        .bind(customer.id.0)
        .bind(&customer.occupation)
        .bind(&customer.firstname)
        .bind(&customer.lastname)
        .bind(&customer.email)
        .bind(&customer.identification)
        .bind(customer.created_at)
        .fetch_one(&*self.pool)
        .await?;

        Ok(CustomerId(id))
    }
}
