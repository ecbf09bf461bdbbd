#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::{AuditEntry, NewAuditEntry};
use sqlx::SqlitePool;

/// Repository trait for the administrative audit log
///
/// The log is append-only; the trait exposes no update or delete.
pub trait AuditLogRepository: Send + Sync {
    /// Append an entry and return its id
    async fn append(&self, entry: &NewAuditEntry) -> StorageResult<i64>;

    /// Most recent entries, newest first
    async fn recent(&self, limit: i64) -> StorageResult<Vec<AuditEntry>>;

    /// Most recent entries of one event type, newest first
    async fn find_by_event_type(&self, event_type: &str, limit: i64)
    -> StorageResult<Vec<AuditEntry>>;

    /// Total number of entries
    async fn count(&self) -> StorageResult<i64>;

    /// Number of entries of one event type
    async fn count_by_event_type(&self, event_type: &str) -> StorageResult<i64>;
}

/// SQLite implementation of AuditLogRepository
#[derive(Debug, Clone)]
pub struct SqliteAuditLogRepository {
    pool: SqlitePool,
}

impl SqliteAuditLogRepository {
    /// Create a new SQLite audit log repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AuditLogRepository for SqliteAuditLogRepository {
    async fn append(&self, entry: &NewAuditEntry) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_log (event_type, message, context, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&entry.event_type)
        .bind(&entry.message)
        .bind(entry.encoded_context()?)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn recent(&self, limit: i64) -> StorageResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, event_type, message, context, created_at
            FROM audit_log
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn find_by_event_type(
        &self,
        event_type: &str,
        limit: i64,
    ) -> StorageResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, event_type, message, context, created_at
            FROM audit_log
            WHERE event_type = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(event_type)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn count(&self) -> StorageResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_log")
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }

    async fn count_by_event_type(&self, event_type: &str) -> StorageResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_log WHERE event_type = ?")
            .bind(event_type)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }
}
