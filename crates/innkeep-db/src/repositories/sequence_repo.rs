//! Sequence counter store
//!
//! Named monotonic counters backing confirmation, invoice, and correction
//! numbers. Each advance takes a row lock inside its own transaction so
//! concurrent callers on the same counter serialize and never observe the
//! same value. Document number uniqueness under concurrent reservation
//! creation depends on this lock.

use async_trait::async_trait;
use innkeep_core::{traits::SequenceStore, AppError, AppResult};
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of SequenceStore
///
/// Counters live in `sequence_counters(name TEXT PRIMARY KEY, value BIGINT)`.
pub struct PgSequenceStore {
    pool: PgPool,
}

impl PgSequenceStore {
    /// Create a new sequence store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SequenceStore for PgSequenceStore {
    #[instrument(skip(self))]
    async fn next_value(&self, name: &str, floor: i64) -> AppResult<i64> {
        debug!("Advancing sequence counter: {}", name);

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start sequence transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        // Lock the counter row; a missing row is a fresh counter below
        // the floor.
        let current: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT value
            FROM sequence_counters
            WHERE name = $1
            FOR UPDATE
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to lock sequence counter {}: {}", name, e);
            AppError::Database(format!("Failed to lock sequence counter: {}", e))
        })?;

        let next = match current {
            Some((value,)) => (value + 1).max(floor),
            None => floor,
        };

        sqlx::query(
            r#"
            INSERT INTO sequence_counters (name, value)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(name)
        .bind(next)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to persist sequence counter {}: {}", name, e);
            AppError::Database(format!("Failed to persist sequence counter: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit sequence transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        debug!("Sequence {} advanced to {}", name, next);

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use innkeep_core::traits::SequenceStore;

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_sequence_is_strictly_increasing() {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/innkeep".to_string());
        let pool = crate::create_pool(&database_url, Some(5)).await.unwrap();
        let store = PgSequenceStore::new(pool);

        let first = store.next_value("test_counter", 1000).await.unwrap();
        let second = store.next_value("test_counter", 1000).await.unwrap();
        assert!(second > first);
        assert!(first >= 1000);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_concurrent_callers_get_distinct_values() {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/innkeep".to_string());
        let pool = crate::create_pool(&database_url, Some(10)).await.unwrap();
        let store = std::sync::Arc::new(PgSequenceStore::new(pool));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.next_value("test_concurrent", 1000).await.unwrap()
            }));
        }

        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.await.unwrap());
        }

        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), 16, "sequence values must be pairwise distinct");
    }
}
