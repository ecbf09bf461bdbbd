#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::BalanceRecord;
use crate::models::balance::amount_to_db;
use chrono::Utc;
use kiosk_core::Amount;
use sqlx::SqlitePool;

/// Repository trait for the persisted kiosk balance
///
/// The balance is a single value. `store` overwrites it; callers are
/// responsible for serializing read-modify-write sequences.
pub trait BalanceRepository: Send + Sync {
    /// Load the persisted balance
    async fn load(&self) -> StorageResult<Amount>;

    /// Overwrite the persisted balance
    async fn store(&self, amount: Amount) -> StorageResult<()>;

    /// Load the balance row including its last update time
    async fn record(&self) -> StorageResult<BalanceRecord>;
}

/// SQLite implementation of BalanceRepository
#[derive(Debug, Clone)]
pub struct SqliteBalanceRepository {
    pool: SqlitePool,
}

impl SqliteBalanceRepository {
    /// Create a new SQLite balance repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl BalanceRepository for SqliteBalanceRepository {
    async fn load(&self) -> StorageResult<Amount> {
        self.record().await?.to_amount()
    }

    async fn store(&self, amount: Amount) -> StorageResult<()> {
        // Upsert so a missing row (manually cleared table) is recreated
        sqlx::query(
            r#"
            INSERT INTO balance (id, amount, updated_at)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                amount = excluded.amount,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(amount_to_db(amount)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record(&self) -> StorageResult<BalanceRecord> {
        sqlx::query_as::<_, BalanceRecord>("SELECT amount, updated_at FROM balance WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity_type: "balance".to_string(),
                field: "id".to_string(),
                value: "1".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    async fn setup_test_db() -> Database {
        Database::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_initial_balance_is_zero() {
        let db = setup_test_db().await;
        let repo = SqliteBalanceRepository::new(db.pool().clone());

        assert_eq!(repo.load().await.unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let db = setup_test_db().await;
        let repo = SqliteBalanceRepository::new(db.pool().clone());

        repo.store(Amount::new(35)).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), Amount::new(35));

        repo.store(Amount::ZERO).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn test_store_recreates_missing_row() {
        let db = setup_test_db().await;
        let repo = SqliteBalanceRepository::new(db.pool().clone());

        sqlx::query("DELETE FROM balance").execute(db.pool()).await.unwrap();
        assert!(matches!(
            repo.load().await,
            Err(StorageError::NotFound { .. })
        ));

        repo.store(Amount::new(5)).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), Amount::new(5));
    }

    #[tokio::test]
    async fn test_record_updated_at_advances() {
        let db = setup_test_db().await;
        let repo = SqliteBalanceRepository::new(db.pool().clone());

        let before = Utc::now();
        repo.store(Amount::new(20)).await.unwrap();
        let record = repo.record().await.unwrap();

        assert_eq!(record.amount, 20);
        assert!(record.updated_at >= before - chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn test_negative_amount_rejected_by_schema() {
        let db = setup_test_db().await;

        let result = sqlx::query("UPDATE balance SET amount = -1 WHERE id = 1")
            .execute(db.pool())
            .await;

        assert!(result.is_err());
    }
}
