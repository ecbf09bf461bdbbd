pub mod audit_log;
pub mod balance;

pub use audit_log::{AuditLogRepository, SqliteAuditLogRepository};
pub use balance::{BalanceRepository, SqliteBalanceRepository};
