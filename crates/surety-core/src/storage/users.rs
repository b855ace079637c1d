//! Repository for identity-flow user accounts.
//!
//! The verified flag is flipped with a guarded update so an approved verdict
//! observed twice (or two racing callbacks) applies exactly once.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{InspectionRef, User, UserId},
};

const USER_COLUMNS: &str = "id, firstname, lastname, username, email, identification, \
                            password_hash, verified, inspection_id, created_at";

/// Repository for user database operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails or the username is taken.
    pub async fn create(&self, user: &User) -> Result<UserId> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO users (
                id, firstname, lastname, username, email, identification,
                password_hash, verified, inspection_id, created_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
            )
            RETURNING id
            "#,
        )
        .bind(user.id.0)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.identification)
        .bind(&user.password_hash)
        .bind(user.verified)
        .bind(user.inspection_id.as_ref().map(InspectionRef::as_str))
        .bind(user.created_at)
        .fetch_one(&*self.pool)
        .await?;

        Ok(UserId(id))
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id.0)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(user)
    }

    /// Stores the people inspection created for this user at registration.
    ///
    /// # Errors
    ///
    /// Returns error if update fails.
    pub async fn attach_inspection(
        &self,
        user_id: UserId,
        inspection_id: &InspectionRef,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET inspection_id = $2
            WHERE id = $1
            "#,
        )
        .bind(user_id.0)
        .bind(inspection_id.as_str())
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks a user as verified.
    ///
    /// Guarded on `verified = FALSE`: the flag flips at most once. Returns
    /// whether this call performed the flip.
    ///
    /// # Errors
    ///
    /// Returns error if update fails.
    pub async fn mark_verified(&self, user_id: UserId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET verified = TRUE
            WHERE id = $1 AND verified = FALSE
            "#,
        )
        .bind(user_id.0)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
