//! Real-time events pushed to connected frontends.
//!
//! Delivery is best-effort and non-blocking: a slow subscriber lags and
//! loses the oldest events, and emitting with no subscribers is fine.

use kiosk_core::constants::DEFAULT_EVENT_CAPACITY;
use kiosk_core::{Amount, StatusSummary};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// An event broadcast to every subscriber.
///
/// Serializes as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum KioskEvent {
    /// The balance changed.
    Balance { balance: Amount },

    /// A coin was credited.
    CoinAccepted { value: u32, balance: Amount },

    /// An input was rejected or was ambiguous.
    ParserWarning {
        code: String,
        message: String,
        raw: String,
    },

    /// The coin acceptor connection changed.
    ConnectionStatus(StatusSummary),
}

impl KioskEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            KioskEvent::Balance { .. } => "balance",
            KioskEvent::CoinAccepted { .. } => "coin_accepted",
            KioskEvent::ParserWarning { .. } => "parser_warning",
            KioskEvent::ConnectionStatus(_) => "connection_status",
        }
    }
}

/// Fan-out of [`KioskEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<KioskEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send to every current subscriber and return how many there were.
    pub fn emit(&self, event: KioskEvent) -> usize {
        let name = event.name();
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(event = name, delivered, "Event emitted");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KioskEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
