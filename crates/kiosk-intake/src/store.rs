#![allow(async_fn_in_trait)]

//! Durable homes for the kiosk balance.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use kiosk_core::Amount;
use kiosk_storage::{BalanceRepository, SqliteBalanceRepository};

use crate::error::{IntakeError, Result};

/// Where the ledger reads and writes the balance.
pub trait BalanceStore: Send + Sync {
    /// Read the persisted balance.
    async fn load(&self) -> Result<Amount>;

    /// Overwrite the persisted balance.
    async fn store(&self, amount: Amount) -> Result<()>;
}

impl BalanceStore for SqliteBalanceRepository {
    async fn load(&self) -> Result<Amount> {
        Ok(BalanceRepository::load(self).await?)
    }

    async fn store(&self, amount: Amount) -> Result<()> {
        Ok(BalanceRepository::store(self, amount).await?)
    }
}

/// In-process balance store with switchable write failures.
///
/// Clones share state, so a test can keep one handle and give another to
/// the ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryBalanceStore {
    inner: Arc<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    amount: AtomicU64,
    failing: AtomicBool,
    writes: AtomicU64,
}

impl MemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already persisted balance.
    pub fn with_amount(amount: Amount) -> Self {
        let store = Self::default();
        store.inner.amount.store(amount.value(), Ordering::SeqCst);
        store
    }

    /// Make every subsequent read and write fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// The last successfully written balance.
    pub fn stored(&self) -> Amount {
        Amount::new(self.inner.amount.load(Ordering::SeqCst))
    }

    /// Number of successful writes.
    pub fn writes(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(IntakeError::Unavailable(
                "memory store set to fail".to_string(),
            ));
        }
        Ok(())
    }
}

impl BalanceStore for MemoryBalanceStore {
    async fn load(&self) -> Result<Amount> {
        self.check()?;
        Ok(self.stored())
    }

    async fn store(&self, amount: Amount) -> Result<()> {
        self.check()?;
        self.inner.amount.store(amount.value(), Ordering::SeqCst);
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Enum wrapper for balance store implementations.
#[derive(Debug, Clone)]
pub enum AnyBalanceStore {
    Sqlite(SqliteBalanceRepository),
    Memory(MemoryBalanceStore),
}

impl From<SqliteBalanceRepository> for AnyBalanceStore {
    fn from(repository: SqliteBalanceRepository) -> Self {
        AnyBalanceStore::Sqlite(repository)
    }
}

impl From<MemoryBalanceStore> for AnyBalanceStore {
    fn from(store: MemoryBalanceStore) -> Self {
        AnyBalanceStore::Memory(store)
    }
}

impl BalanceStore for AnyBalanceStore {
    async fn load(&self) -> Result<Amount> {
        match self {
            AnyBalanceStore::Sqlite(store) => BalanceStore::load(store).await,
            AnyBalanceStore::Memory(store) => store.load().await,
        }
    }

    async fn store(&self, amount: Amount) -> Result<()> {
        match self {
            AnyBalanceStore::Sqlite(store) => BalanceStore::store(store, amount).await,
            AnyBalanceStore::Memory(store) => store.store(amount).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_storage::Database;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryBalanceStore::new();
        store.store(Amount::new(15)).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Amount::new(15));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_failure_keeps_last_value() {
        let store = MemoryBalanceStore::with_amount(Amount::new(5));
        store.set_failing(true);

        assert!(store.store(Amount::new(10)).await.is_err());
        assert!(store.load().await.is_err());
        assert_eq!(store.stored(), Amount::new(5));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_any_store_dispatches_to_sqlite() {
        let db = Database::in_memory().await.unwrap();
        let store = AnyBalanceStore::from(SqliteBalanceRepository::new(db.pool().clone()));

        store.store(Amount::new(20)).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Amount::new(20));
    }
}
