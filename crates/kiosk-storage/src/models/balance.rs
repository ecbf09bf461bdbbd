use chrono::{DateTime, Utc};
use kiosk_core::Amount;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// The persisted kiosk balance.
///
/// Maps to the single row of the `balance` table. The amount is stored as a
/// SQLite INTEGER and is never negative (enforced by a CHECK constraint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BalanceRecord {
    /// Balance in minor units
    pub amount: i64,

    /// When the balance was last written
    pub updated_at: DateTime<Utc>,
}

impl BalanceRecord {
    /// Convert the stored amount into a domain [`Amount`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if the stored value is negative.
    pub fn to_amount(&self) -> StorageResult<Amount> {
        amount_from_db(self.amount)
    }
}

/// Convert a stored INTEGER into an [`Amount`].
pub(crate) fn amount_from_db(value: i64) -> StorageResult<Amount> {
    u64::try_from(value)
        .map(Amount::new)
        .map_err(|_| StorageError::Validation(format!("stored balance is negative: {}", value)))
}

/// Convert an [`Amount`] into a storable INTEGER.
pub(crate) fn amount_to_db(amount: Amount) -> StorageResult<i64> {
    i64::try_from(amount.value())
        .map_err(|_| StorageError::Validation(format!("balance too large to store: {}", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_round_trip_bounds() {
        assert_eq!(amount_to_db(Amount::new(35)).unwrap(), 35);
        assert_eq!(amount_from_db(35).unwrap(), Amount::new(35));
        assert_eq!(amount_from_db(0).unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_negative_stored_amount_rejected() {
        assert!(matches!(
            amount_from_db(-1),
            Err(StorageError::Validation(_))
        ));
    }

    #[test]
    fn test_oversized_amount_rejected() {
        assert!(amount_to_db(Amount::new(u64::MAX)).is_err());
    }
}
