//! Repository for the webhook idempotency ledger.
//!
//! Provider webhooks are delivered at least once. Recording the envelope
//! event ID here before applying its transition makes replays observable:
//! the second insert is a no-op and the caller skips the transition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::Result;

/// Repository for processed-webhook-event ledger operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Records an event ID as processed.
    ///
    /// Returns true when this call inserted the row, false when the event
    /// was already in the ledger.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn record(&self, event_id: &str, processed_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_webhook_events (event_id, processed_at)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(processed_at)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
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
