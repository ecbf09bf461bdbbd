//! Integration tests for database connection, migrations and persistence
//!
//! Run with: cargo test --package kiosk-storage --test integration_database

use std::sync::Arc;
use tokio::sync::Barrier;

use kiosk_core::Amount;
use kiosk_storage::connection::{Database, DatabaseConfig};
use kiosk_storage::models::NewAuditEntry;
use kiosk_storage::repositories::{
    AuditLogRepository, BalanceRepository, SqliteAuditLogRepository, SqliteBalanceRepository,
};

#[tokio::test]
async fn test_in_memory_database() {
    let db = Database::in_memory().await.unwrap();
    db.health_check().await.unwrap();
    db.close().await;
}

#[tokio::test]
async fn test_migration_idempotency() {
    let db = Database::in_memory().await.unwrap();

    db.migrate().await.unwrap();
    db.migrate().await.unwrap();

    for table in ["balance", "audit_log"] {
        let result: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?")
                .bind(table)
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(result.0, 1, "table {table} missing");
    }

    let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM balance")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(rows.0, 1);

    db.close().await;
}

#[tokio::test]
async fn test_balance_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("kiosk.db");
    let path = path.to_string_lossy().into_owned();

    {
        let db = Database::open(DatabaseConfig::new(path.clone())).await.unwrap();
        let repo = SqliteBalanceRepository::new(db.pool().clone());
        repo.store(Amount::new(45)).await.unwrap();
        db.close().await;
    }

    let db = Database::open(DatabaseConfig::new(path)).await.unwrap();
    let repo = SqliteBalanceRepository::new(db.pool().clone());
    assert_eq!(repo.load().await.unwrap(), Amount::new(45));
    db.close().await;
}

#[tokio::test]
async fn test_reopen_recreates_missing_balance_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kiosk.db");

    {
        let db = Database::open(DatabaseConfig::new(&path)).await.unwrap();
        sqlx::query("DELETE FROM balance").execute(db.pool()).await.unwrap();
        assert!(db.health_check().await.is_err());
        db.close().await;
    }

    let db = Database::open(DatabaseConfig::new(&path)).await.unwrap();
    db.health_check().await.unwrap();

    let repo = SqliteBalanceRepository::new(db.pool().clone());
    assert_eq!(repo.load().await.unwrap(), Amount::ZERO);
    db.close().await;
}

#[tokio::test]
async fn test_concurrent_audit_appends() {
    let db = Database::in_memory().await.unwrap();
    let repo = Arc::new(SqliteAuditLogRepository::new(db.pool().clone()));

    const NUM_CONCURRENT_TASKS: usize = 10;
    let barrier = Arc::new(Barrier::new(NUM_CONCURRENT_TASKS));

    let mut handles = vec![];

    for i in 0..NUM_CONCURRENT_TASKS {
        let repo = repo.clone();
        let barrier = barrier.clone();

        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            repo.append(&NewAuditEntry::new("coin_accepted", format!("Coin {}", i)))
                .await
        }));
    }

    let results: Vec<_> = futures::future::join_all(handles).await;

    let mut ids: Vec<i64> = results
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();

    assert_eq!(ids.len(), NUM_CONCURRENT_TASKS);
    assert_eq!(repo.count().await.unwrap(), NUM_CONCURRENT_TASKS as i64);

    db.close().await;
}

#[tokio::test]
async fn test_database_health_check() {
    let db = Database::in_memory().await.unwrap();

    assert!(db.health_check().await.is_ok());
    db.health_check().await.unwrap();

    db.close().await;
}
