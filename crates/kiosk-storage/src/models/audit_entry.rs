use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StorageResult;

/// One row of the administrative audit log.
///
/// The log is append-only: rows are never updated or deleted by the kiosk.
///
/// # Fields
///
/// * `id` - Auto-increment primary key
/// * `event_type` - Short machine-readable category (e.g. `coin_accepted`)
/// * `message` - Human-readable description
/// * `context` - Optional JSON object with structured details
/// * `created_at` - When the entry was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    /// Auto-increment primary key
    pub id: i64,

    /// Event category
    pub event_type: String,

    /// Human-readable description
    pub message: String,

    /// JSON-encoded context, if any
    pub context: Option<String>,

    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Decode the JSON context.
    ///
    /// Returns `Ok(None)` when the entry has no context.
    pub fn context_value(&self) -> StorageResult<Option<Value>> {
        self.context
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(Into::into)
    }
}

/// An audit entry that has not been written yet.
///
/// # Examples
///
/// ```
/// use kiosk_storage::models::NewAuditEntry;
/// use serde_json::json;
///
/// let entry = NewAuditEntry::new("coin_accepted", "Coin accepted: 10")
///     .with_context(json!({ "value": 10, "balance": 25 }));
///
/// assert_eq!(entry.event_type, "coin_accepted");
/// assert!(entry.context.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    /// Event category
    pub event_type: String,

    /// Human-readable description
    pub message: String,

    /// Structured details
    pub context: Option<Value>,

    /// Event time
    pub created_at: DateTime<Utc>,
}

impl NewAuditEntry {
    /// Create an entry stamped with the current time.
    pub fn new(event_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            message: message.into(),
            context: None,
            created_at: Utc::now(),
        }
    }

    /// Attach structured context.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Override the event time.
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// JSON text stored in the `context` column.
    pub(crate) fn encoded_context(&self) -> StorageResult<Option<String>> {
        self.context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_encoding() {
        let entry = NewAuditEntry::new("coin_rejected", "Coin rejected")
            .with_context(json!({ "raw": "29", "reason": "invalid_combination" }));

        let encoded = entry.encoded_context().unwrap().unwrap();
        let decoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded["reason"], "invalid_combination");
    }

    #[test]
    fn test_entry_without_context() {
        let entry = NewAuditEntry::new("balance_reset", "Balance reset");
        assert_eq!(entry.encoded_context().unwrap(), None);
    }

    #[test]
    fn test_context_value_decoding() {
        let entry = AuditEntry {
            id: 1,
            event_type: "coin_accepted".to_string(),
            message: "Coin accepted: 5".to_string(),
            context: Some(r#"{"value":5}"#.to_string()),
            created_at: Utc::now(),
        };

        assert_eq!(entry.context_value().unwrap(), Some(json!({ "value": 5 })));
    }

    #[test]
    fn test_context_value_invalid_json() {
        let entry = AuditEntry {
            id: 1,
            event_type: "coin_accepted".to_string(),
            message: "Coin accepted: 5".to_string(),
            context: Some("{not json".to_string()),
            created_at: Utc::now(),
        };

        assert!(entry.context_value().is_err());
    }
}
