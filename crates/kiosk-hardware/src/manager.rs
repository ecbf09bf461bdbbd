//! Coin acceptor connection manager.
//!
//! This module provides the `ConnectionManager`, which owns the acquisition
//! lifecycle of the serial transport: enumerate, open, retry access denials
//! with a fixed backoff, forward lines, and record every state change.
//!
//! # Architecture
//!
//! The manager runs one async task. Lines and status changes share a single
//! ordered channel so a consumer never sees a line from a connection before
//! the status that announced it. The latest status is also published on a
//! `watch` channel for synchronous snapshots.
//!
//! ```text
//!                    ┌────────────────────┐
//! PortScanner ──────►│ Connection task    │──── TransportEvent (mpsc) ───► CoinIntake
//! CoinAcceptor ─────►│  acquire / pump    │
//!                    └─────────┬──────────┘
//!                              │ watch
//!                              ▼
//!                        StatusHandle ─────► admin dashboard
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ─► Connecting ─┬─► Connected ─┬─► Disconnected (clean close)
//!                   ▲  │      │              └─► Error (read failure)
//!                   └──┘      └─► Error (no devices, open failure,
//!           permission denied,                   retries exhausted)
//!           retry after backoff
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use kiosk_hardware::devices::AnyPortScanner;
//! use kiosk_hardware::manager::{ConnectionConfig, ConnectionManager, TransportEvent};
//! use kiosk_hardware::serial::SystemPortScanner;
//!
//! #[tokio::main]
//! async fn main() -> kiosk_hardware::Result<()> {
//!     let scanner = AnyPortScanner::System(SystemPortScanner::new());
//!     let manager = ConnectionManager::new(scanner, ConnectionConfig::default());
//!
//!     let (handle, mut events) = manager.start();
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             TransportEvent::Line(line) => println!("line: {}", line),
//!             TransportEvent::Status(status) => println!("status: {}", status.state),
//!         }
//!     }
//!
//!     handle.shutdown().await
//! }
//! ```

use std::time::Duration;

use kiosk_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_LINE_CHANNEL_CAPACITY, DEFAULT_MAX_OPEN_ATTEMPTS,
    DEFAULT_RETRY_INTERVAL_MS,
};
use kiosk_core::{ConnectionStatus, StatusSummary};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

use crate::devices::{AnyCoinAcceptor, AnyPortScanner};
use crate::traits::{CoinAcceptor, PortScanner};
use crate::{HardwareError, Result};

/// Event from the transport, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One line read from the coin acceptor.
    Line(String),

    /// The connection status changed.
    Status(ConnectionStatus),
}

/// Configuration for the coin acceptor connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Explicit device path; when unset, the first enumerated device is used.
    pub port_path: Option<String>,

    /// Line speed in bits per second.
    pub baud_rate: u32,

    /// Delay between retried open attempts, and before a reconnect.
    pub retry_interval: Duration,

    /// Open attempts per acquisition before giving up.
    pub max_open_attempts: u32,

    /// Re-run acquisition after the transport closes or fails at runtime.
    pub reconnect_on_loss: bool,
}

impl ConnectionConfig {
    /// Use an explicit device path instead of enumeration.
    pub fn port_path(mut self, path: impl Into<String>) -> Self {
        self.port_path = Some(path.into());
        self
    }

    /// Set the line speed.
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the retry backoff.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Set the attempt budget per acquisition (at least one).
    pub fn max_open_attempts(mut self, attempts: u32) -> Self {
        self.max_open_attempts = attempts.max(1);
        self
    }

    /// Enable or disable reconnecting after a runtime loss.
    pub fn reconnect_on_loss(mut self, enabled: bool) -> Self {
        self.reconnect_on_loss = enabled;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_path: None,
            baud_rate: DEFAULT_BAUD_RATE,
            retry_interval: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
            max_open_attempts: DEFAULT_MAX_OPEN_ATTEMPTS,
            reconnect_on_loss: true,
        }
    }
}

/// Read-only view of the connection status.
///
/// Cheap to clone and usable from synchronous code.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    status_rx: watch::Receiver<ConnectionStatus>,
}

impl StatusHandle {
    /// Current status.
    pub fn snapshot(&self) -> ConnectionStatus {
        self.status_rx.borrow().clone()
    }

    /// Current `{connected, portPath, lastError}` view.
    pub fn summary(&self) -> StatusSummary {
        self.status_rx.borrow().summary()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }
}

/// Handle to a running connection task.
pub struct ConnectionHandle {
    status: StatusHandle,
    tasks: JoinSet<()>,
}

impl ConnectionHandle {
    /// Status view of this connection.
    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Stop the connection task and release the device.
    ///
    /// Aborting drops the open acceptor, which closes the transport.
    pub async fn shutdown(mut self) -> Result<()> {
        self.tasks.abort_all();

        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => error!(error = %e, "Connection task panicked"),
            }
        }

        debug!("Connection manager shut down");
        Ok(())
    }
}

/// Manages the coin acceptor connection.
///
/// # Lifecycle
///
/// 1. Create manager with a scanner and configuration
/// 2. Optionally grab a [`StatusHandle`] with [`status_handle`](Self::status_handle)
/// 3. Call `start()` to spawn the connection task
/// 4. Consume [`TransportEvent`]s from the returned receiver
/// 5. Call [`ConnectionHandle::shutdown`] to release the device
pub struct ConnectionManager {
    scanner: AnyPortScanner,
    config: ConnectionConfig,
    status_tx: watch::Sender<ConnectionStatus>,
    event_tx: mpsc::Sender<TransportEvent>,
    event_rx: mpsc::Receiver<TransportEvent>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiosk_hardware::devices::AnyPortScanner;
    /// use kiosk_hardware::manager::{ConnectionConfig, ConnectionManager};
    /// use kiosk_hardware::mock::MockPortScanner;
    ///
    /// let scanner = AnyPortScanner::Mock(MockPortScanner::new());
    /// let manager = ConnectionManager::new(scanner, ConnectionConfig::default());
    ///
    /// assert!(!manager.status_handle().summary().connected);
    /// ```
    pub fn new(scanner: AnyPortScanner, config: ConnectionConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(DEFAULT_LINE_CHANNEL_CAPACITY);
        let (status_tx, _) = watch::channel(ConnectionStatus::disconnected());

        Self {
            scanner,
            config,
            status_tx,
            event_tx,
            event_rx,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Status view that stays valid after `start()`.
    pub fn status_handle(&self) -> StatusHandle {
        StatusHandle {
            status_rx: self.status_tx.subscribe(),
        }
    }

    /// Spawn the connection task.
    ///
    /// Returns the task handle and the ordered transport event stream. The
    /// stream ends when the task stops (acquisition failed, or the
    /// transport was lost with reconnect disabled).
    pub fn start(self) -> (ConnectionHandle, mpsc::Receiver<TransportEvent>) {
        let status = self.status_handle();
        let connection = Connection {
            scanner: self.scanner,
            config: self.config,
            status_tx: self.status_tx,
            event_tx: self.event_tx,
        };

        let mut tasks = JoinSet::new();
        tasks.spawn(connection.run());

        (ConnectionHandle { status, tasks }, self.event_rx)
    }
}

/// How a connected transport stopped delivering lines.
enum PumpOutcome {
    Closed,
    Failed(HardwareError),
    ReceiverDropped,
}

/// State owned by the connection task.
struct Connection {
    scanner: AnyPortScanner,
    config: ConnectionConfig,
    status_tx: watch::Sender<ConnectionStatus>,
    event_tx: mpsc::Sender<TransportEvent>,
}

impl Connection {
    async fn run(self) {
        let mut reconnecting = false;

        loop {
            let Some(mut device) = self.acquire(reconnecting).await else {
                return;
            };

            let outcome = self.pump(&mut device).await;
            if let Err(e) = device.close().await {
                debug!(error = %e, "Closing coin acceptor failed");
            }

            match outcome {
                PumpOutcome::Closed => {
                    info!("Coin acceptor closed");
                    self.publish(ConnectionStatus::closed).await;
                }
                PumpOutcome::Failed(e) => {
                    error!(error = %e, "Coin acceptor failed");
                    self.publish(|status| status.failed(e.to_string())).await;
                }
                PumpOutcome::ReceiverDropped => return,
            }

            if !self.config.reconnect_on_loss || self.event_tx.is_closed() {
                return;
            }

            tokio::time::sleep(self.config.retry_interval).await;
            reconnecting = true;
        }
    }

    /// Run one bounded acquisition. Returns `None` when it ends in `Error`.
    async fn acquire(&self, reconnecting: bool) -> Option<AnyCoinAcceptor> {
        let max_attempts = self.config.max_open_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.try_open(attempt).await {
                Ok((device, path)) => {
                    let name = device.get_info().await.map(|info| info.name).unwrap_or_default();
                    info!(path = %path, device = %name, attempt, "Coin acceptor connected");
                    self.publish(|status| status.connected(path)).await;
                    return Some(device);
                }
                Err(e) => e,
            };

            // A device unplugged at runtime may take a moment to reappear
            let retryable =
                error.is_retryable() || (reconnecting && matches!(error, HardwareError::NoDevices));

            if retryable && attempt < max_attempts {
                warn!(
                    attempt,
                    max_attempts,
                    error = %error,
                    retry_in_ms = self.config.retry_interval.as_millis() as u64,
                    "Coin acceptor open failed, retrying"
                );
                self.publish(|status| status.failed(error.to_string()).connecting(None, attempt))
                    .await;
                tokio::time::sleep(self.config.retry_interval).await;
                continue;
            }

            error!(attempt, error = %error, "Coin acceptor unavailable");
            self.publish(|status| status.failed(error.to_string())).await;
            return None;
        }
    }

    async fn try_open(&self, attempt: u32) -> Result<(AnyCoinAcceptor, String)> {
        let path = self.select_port().await?;
        self.publish(|status| status.connecting(Some(path.clone()), attempt))
            .await;

        debug!(path = %path, baud_rate = self.config.baud_rate, attempt, "Opening coin acceptor");
        let device = self.scanner.open(&path, self.config.baud_rate).await?;
        Ok((device, path))
    }

    /// Configured path, or the first enumerated device.
    async fn select_port(&self) -> Result<String> {
        if let Some(path) = &self.config.port_path {
            return Ok(path.clone());
        }

        let ports = self.scanner.list_ports().await?;
        debug!(count = ports.len(), "Serial devices enumerated");

        ports
            .into_iter()
            .next()
            .map(|port| port.path)
            .ok_or(HardwareError::NoDevices)
    }

    async fn pump(&self, device: &mut AnyCoinAcceptor) -> PumpOutcome {
        loop {
            match device.read_line().await {
                Ok(Some(line)) => {
                    trace!(line = %line, "Transport line");
                    if self.event_tx.send(TransportEvent::Line(line)).await.is_err() {
                        return PumpOutcome::ReceiverDropped;
                    }
                }
                Ok(None) => return PumpOutcome::Closed,
                Err(e) => return PumpOutcome::Failed(e),
            }
        }
    }

    async fn publish(&self, update: impl FnOnce(ConnectionStatus) -> ConnectionStatus) {
        let next = update(self.status_tx.borrow().clone());
        self.status_tx.send_replace(next.clone());

        debug!(
            state = %next.state,
            port_path = ?next.port_path,
            last_error = ?next.last_error,
            "Connection status changed"
        );

        let _ = self.event_tx.send(TransportEvent::Status(next)).await;
    }
}
