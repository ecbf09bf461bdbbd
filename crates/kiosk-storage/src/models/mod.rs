pub mod audit_entry;
pub mod balance;

pub use audit_entry::{AuditEntry, NewAuditEntry};
pub use balance::BalanceRecord;
