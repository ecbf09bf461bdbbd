use crate::error::{StorageError, StorageResult};
use sqlx::ConnectOptions;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The ledger and the audit writer are the only concurrent users.
const KIOSK_POOL_SIZE: u32 = 2;

/// Where the kiosk keeps its balance and audit trail
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite file; missing parent directories are created on open
    pub path: PathBuf,

    /// How long a writer waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Migrated kiosk database with its balance row in place
///
/// Both constructors apply the embedded migrations and then make sure the
/// single `balance` row exists, so repositories can rely on it from the
/// first query. A row removed by hand while the kiosk was down is
/// recreated at zero and logged.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the kiosk database file
    ///
    /// ```no_run
    /// use kiosk_storage::connection::{Database, DatabaseConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::open(DatabaseConfig::new("/var/lib/kiosk/kiosk.db")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(config: DatabaseConfig) -> StorageResult<Self> {
        create_parent_dir(&config.path)?;

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(KIOSK_POOL_SIZE)
            .connect_with(options)
            .await?;

        let db = Self::prepare(pool).await?;
        info!(path = %config.path.display(), "Kiosk database opened");
        Ok(db)
    }

    /// Private in-memory database for tests
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // A second connection would see a different, empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::prepare(pool).await
    }

    async fn prepare(pool: SqlitePool) -> StorageResult<Self> {
        let db = Self { pool };
        db.migrate().await?;
        db.ensure_balance_row().await?;
        Ok(db)
    }

    /// Apply the embedded migrations from the workspace `migrations/` directory
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        debug!("Database migrations applied");
        Ok(())
    }

    /// Recreate the balance row at zero if it is missing
    ///
    /// Returns `true` when the row had to be recreated.
    pub async fn ensure_balance_row(&self) -> StorageResult<bool> {
        let inserted = sqlx::query("INSERT OR IGNORE INTO balance (id, amount) VALUES (1, 0)")
            .execute(&self.pool)
            .await?
            .rows_affected()
            > 0;

        if inserted {
            warn!("Balance row was missing; recreated with zero credit");
        }
        Ok(inserted)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for in-flight queries and close every connection
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Round-trip to SQLite and confirm the balance row is readable
    pub async fn health_check(&self) -> StorageResult<()> {
        let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM balance WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;

        if rows.0 == 1 {
            Ok(())
        } else {
            Err(StorageError::NotFound {
                entity_type: "balance".to_string(),
                field: "id".to_string(),
                value: "1".to_string(),
            })
        }
    }
}

fn create_parent_dir(path: &Path) -> StorageResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Configuration(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = DatabaseConfig::new("kiosk.db");

        assert_eq!(config.path, PathBuf::from("kiosk.db"));
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_in_memory_has_balance_row() {
        let db = Database::in_memory().await.unwrap();

        db.health_check().await.unwrap();
        assert!(!db.ensure_balance_row().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check_fails_without_balance_row() {
        let db = Database::in_memory().await.unwrap();
        sqlx::query("DELETE FROM balance").execute(db.pool()).await.unwrap();

        assert!(matches!(
            db.health_check().await,
            Err(StorageError::NotFound { .. })
        ));

        assert!(db.ensure_balance_row().await.unwrap());
        db.health_check().await.unwrap();
    }
}
