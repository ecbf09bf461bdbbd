//! Storage layer for the coin kiosk.
//!
//! This crate provides SQLite-backed persistence for the kiosk balance and
//! the administrative audit log.
//!
//! # Architecture
//!
//! The storage layer uses a repository pattern with the following components:
//!
//! - [`Database`] - Connection pool manager with automatic migrations
//! - [`BalanceRepository`] - The single persisted balance
//! - [`AuditLogRepository`] - Append-only audit trail
//!
//! # Examples
//!
//! ```no_run
//! use kiosk_core::Amount;
//! use kiosk_storage::{Database, DatabaseConfig};
//! use kiosk_storage::models::NewAuditEntry;
//! use kiosk_storage::repositories::{
//!     AuditLogRepository, BalanceRepository, SqliteAuditLogRepository, SqliteBalanceRepository,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::open(DatabaseConfig::new("kiosk.db")).await?;
//!
//! let balance = SqliteBalanceRepository::new(db.pool().clone());
//! balance.store(Amount::new(10)).await?;
//!
//! let audit = SqliteAuditLogRepository::new(db.pool().clone());
//! audit.append(&NewAuditEntry::new("coin_accepted", "Coin accepted: 10")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! Migrations live in the workspace `migrations/` directory and are embedded
//! at compile time. `balance` holds exactly one row (`id = 1`) with a
//! non-negative amount; `audit_log` is indexed by event type and time.

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::{AuditEntry, BalanceRecord, NewAuditEntry};
pub use repositories::{
    AuditLogRepository, BalanceRepository, SqliteAuditLogRepository, SqliteBalanceRepository,
};
