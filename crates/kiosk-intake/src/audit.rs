//! Administrative audit trail for intake decisions.
//!
//! The intake loop must never wait on the database, so [`AuditLog`] only
//! queues entries; an [`AuditWriter`] task drains the queue into SQLite.
//! A full queue drops the entry with a warning.

use kiosk_storage::{AuditLogRepository, NewAuditEntry, SqliteAuditLogRepository};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Default number of audit entries buffered ahead of the writer.
pub const DEFAULT_AUDIT_CAPACITY: usize = 256;

/// Receives audit entries from the intake service.
pub trait AuditSink: Send + Sync {
    /// Record one entry. Must not block.
    fn append(&self, event_type: &str, message: String, context: Value);
}

/// Queueing sink backed by an [`AuditWriter`].
#[derive(Debug, Clone)]
pub struct AuditLog {
    sender: mpsc::Sender<NewAuditEntry>,
}

impl AuditLog {
    /// Create a sink and the writer that persists what it receives.
    pub fn channel(
        repository: SqliteAuditLogRepository,
        capacity: usize,
    ) -> (AuditLog, AuditWriter) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            AuditLog { sender },
            AuditWriter {
                receiver,
                repository,
            },
        )
    }
}

impl AuditSink for AuditLog {
    fn append(&self, event_type: &str, message: String, context: Value) {
        let entry = NewAuditEntry::new(event_type, message).with_context(context);
        if let Err(e) = self.sender.try_send(entry) {
            warn!(event_type, error = %e, "Audit entry dropped");
        }
    }
}

/// Drains queued entries into the audit table.
#[derive(Debug)]
pub struct AuditWriter {
    receiver: mpsc::Receiver<NewAuditEntry>,
    repository: SqliteAuditLogRepository,
}

impl AuditWriter {
    /// Run until every [`AuditLog`] handle is dropped. Returns the number of
    /// entries written.
    pub async fn run(mut self) -> u64 {
        let mut written = 0;
        while let Some(entry) = self.receiver.recv().await {
            match self.repository.append(&entry).await {
                Ok(id) => {
                    written += 1;
                    debug!(id, event_type = %entry.event_type, "Audit entry written");
                }
                Err(e) => {
                    warn!(event_type = %entry.event_type, error = %e, "Failed to write audit entry");
                }
            }
        }
        info!(written, "Audit writer stopped");
        written
    }
}

/// Sink that only logs. Used when no database is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn append(&self, event_type: &str, message: String, context: Value) {
        info!(event_type, context = %context, "{}", message);
    }
}
