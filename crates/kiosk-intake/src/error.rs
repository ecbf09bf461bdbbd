//! Error types for the intake service and ledger.

use kiosk_storage::StorageError;

/// Result type alias for intake operations.
pub type Result<T> = std::result::Result<T, IntakeError>;

/// Errors returned by the ledger and its balance stores.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// Balance arithmetic failed (insufficient funds, overflow).
    #[error(transparent)]
    Balance(#[from] kiosk_core::Error),

    /// The database rejected a read or write.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The balance store could not be reached.
    #[error("Balance store unavailable: {0}")]
    Unavailable(String),
}

impl IntakeError {
    /// Returns `true` for errors caused by the caller's request rather than
    /// by persistence.
    pub fn is_balance_error(&self) -> bool {
        matches!(self, Self::Balance(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_core::Amount;

    #[test]
    fn test_insufficient_funds_is_balance_error() {
        let error: IntakeError = Amount::new(5)
            .checked_sub(Amount::new(10))
            .unwrap_err()
            .into();

        assert!(error.is_balance_error());
        assert!(error.to_string().contains("10"));
    }

    #[test]
    fn test_unavailable_is_not_balance_error() {
        let error = IntakeError::Unavailable("disk full".to_string());
        assert!(!error.is_balance_error());
        assert_eq!(error.to_string(), "Balance store unavailable: disk full");
    }
}
