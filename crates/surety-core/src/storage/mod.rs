//! Database access layer implementing the repository pattern for workflow
//! persistence.
//!
//! The repository layer acts as an anti-corruption layer, translating between
//! domain models and database schemas. This isolation allows schema evolution
//! without breaking domain logic.
//!
//! All database operations MUST go through these repositories. Direct SQL
//! queries outside this module are forbidden to maintain consistency.

use std::sync::Arc;

use sqlx::PgPool;

pub mod available_goods;
pub mod available_policies;
pub mod customers;
pub mod policies;
pub mod processed_events;
pub mod users;

use crate::error::Result;

/// Container for all repository instances providing unified database access.
///
/// The `Storage` struct is the entry point for all database operations. It
/// manages a shared connection pool and provides type-safe access to each
/// domain repository.
#[derive(Clone)]
pub struct Storage {
    /// Repository for policy operations.
    pub policies: Arc<policies::Repository>,

    /// Repository for customer operations.
    pub customers: Arc<customers::Repository>,

    /// Repository for the insurable-goods catalog.
    pub available_goods: Arc<available_goods::Repository>,

    /// Repository for the policy-template catalog.
    pub available_policies: Arc<available_policies::Repository>,

    /// Repository for identity-flow users.
    pub users: Arc<users::Repository>,

    /// Repository for the webhook idempotency ledger.
    pub processed_events: Arc<processed_events::Repository>,
}

impl Storage {
    /// Creates a new storage instance with the given connection pool.
    ///
    /// All repositories share the same pool with Arc for efficient resource
    /// usage.
    pub fn new(pool: PgPool) -> Self {
        let pool = Arc::new(pool);

        Self {
            policies: Arc::new(policies::Repository::new(pool.clone())),
            customers: Arc::new(customers::Repository::new(pool.clone())),
            available_goods: Arc::new(available_goods::Repository::new(pool.clone())),
            available_policies: Arc::new(available_policies::Repository::new(pool.clone())),
            users: Arc::new(users::Repository::new(pool.clone())),
            processed_events: Arc::new(processed_events::Repository::new(pool)),
        }
    }

    /// Performs a health check on the database connection.
    ///
    /// Executes a simple query to verify connectivity. Surfaced through the
    /// `/health` endpoint.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the connection is unhealthy or the
    /// query times out.
    pub async fn health_check(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.policies.pool()).await?;

        Ok(())
    }
}
