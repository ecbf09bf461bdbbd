//! Connection status of the coin acceptor transport.
//!
//! The connection manager owns the only writer of this status; everything
//! else (intake service, admin dashboard) reads snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the serial transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport open.
    Disconnected,

    /// An open attempt is in progress or scheduled.
    Connecting,

    /// Transport open and feeding the decoder.
    Connected,

    /// Acquisition failed or the transport errored at runtime.
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Error => "Error",
        };
        write!(f, "{}", state_str)
    }
}

/// Point-in-time status of the coin acceptor connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Current lifecycle state.
    pub state: ConnectionState,

    /// Last known device path.
    pub port_path: Option<String>,

    /// Last recorded error message.
    pub last_error: Option<String>,

    /// Open attempts made for the current acquisition.
    pub attempts: u32,

    /// When this status was recorded.
    pub updated_at: DateTime<Utc>,
}

impl ConnectionStatus {
    /// Initial status before any acquisition.
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            port_path: None,
            last_error: None,
            attempts: 0,
            updated_at: Utc::now(),
        }
    }

    /// Move to `Connecting` for the given attempt, keeping the last error.
    #[must_use]
    pub fn connecting(self, port_path: Option<String>, attempt: u32) -> Self {
        Self {
            state: ConnectionState::Connecting,
            port_path: port_path.or(self.port_path),
            last_error: self.last_error,
            attempts: attempt,
            updated_at: Utc::now(),
        }
    }

    /// Move to `Connected`, clearing the last error.
    #[must_use]
    pub fn connected(self, port_path: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Connected,
            port_path: Some(port_path.into()),
            last_error: None,
            attempts: self.attempts,
            updated_at: Utc::now(),
        }
    }

    /// Move to `Error` and record the message.
    #[must_use]
    pub fn failed(self, message: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Error,
            port_path: self.port_path,
            last_error: Some(message.into()),
            attempts: self.attempts,
            updated_at: Utc::now(),
        }
    }

    /// Move to `Disconnected` after a clean close, keeping the path.
    #[must_use]
    pub fn closed(self) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            port_path: self.port_path,
            last_error: self.last_error,
            attempts: self.attempts,
            updated_at: Utc::now(),
        }
    }

    /// Returns `true` while the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Compact view polled by the admin dashboard.
    #[must_use]
    pub fn summary(&self) -> StatusSummary {
        StatusSummary {
            connected: self.is_connected(),
            port_path: self.port_path.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Dashboard view of the connection: `{connected, portPath, lastError}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub connected: bool,
    pub port_path: Option<String>,
    pub last_error: Option<String>,
}
