//! Mock coin acceptor implementation for testing and development.
//!
//! This module provides a simulated acceptor that can be controlled
//! programmatically: lines are injected through a handle, and the handle can
//! also inject a read error or close the transport.

use crate::{
    DeviceInfo, HardwareError, Result,
    traits::CoinAcceptor,
};
use tokio::sync::mpsc;

/// Event injected into a mock acceptor.
#[derive(Debug)]
enum MockLineEvent {
    /// A line as the device would emit it.
    Line(String),

    /// A runtime read failure.
    Fail(String),
}

/// Mock coin acceptor for testing and development.
///
/// # Examples
///
/// ```
/// use kiosk_hardware::mock::MockCoinAcceptor;
/// use kiosk_hardware::traits::CoinAcceptor;
///
/// #[tokio::main]
/// async fn main() -> kiosk_hardware::Result<()> {
///     let (mut acceptor, handle) = MockCoinAcceptor::new();
///
///     handle.send_line("1").await?;
///     handle.send_line("0").await?;
///     handle.close();
///
///     assert_eq!(acceptor.read_line().await?, Some("1".to_string()));
///     assert_eq!(acceptor.read_line().await?, Some("0".to_string()));
///     assert_eq!(acceptor.read_line().await?, None);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockCoinAcceptor {
    /// Channel receiver for injected events
    event_rx: mpsc::Receiver<MockLineEvent>,

    /// Device name
    name: String,

    /// Lines delivered so far
    lines_read: u64,
}

impl MockCoinAcceptor {
    /// Create a new mock acceptor with the default name.
    ///
    /// Returns a tuple of (MockCoinAcceptor, MockCoinAcceptorHandle) where
    /// the handle drives the acceptor.
    pub fn new() -> (Self, MockCoinAcceptorHandle) {
        Self::with_name("Mock Coin Acceptor")
    }

    /// Create a new mock acceptor with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockCoinAcceptorHandle) {
        let (event_tx, event_rx) = mpsc::channel(32);

        let acceptor = Self {
            event_rx,
            name: name.into(),
            lines_read: 0,
        };

        (acceptor, MockCoinAcceptorHandle { event_tx })
    }

    /// Number of lines delivered through `read_line`.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

impl CoinAcceptor for MockCoinAcceptor {
    async fn read_line(&mut self) -> Result<Option<String>> {
        match self.event_rx.recv().await {
            Some(MockLineEvent::Line(line)) => {
                self.lines_read += 1;
                Ok(Some(line))
            }
            Some(MockLineEvent::Fail(message)) => Err(HardwareError::communication(message)),
            None => Ok(None),
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Mock"))
    }

    async fn close(&mut self) -> Result<()> {
        self.event_rx.close();
        Ok(())
    }
}

/// Handle for controlling a mock coin acceptor.
#[derive(Debug, Clone)]
pub struct MockCoinAcceptorHandle {
    /// Channel sender for injecting events
    event_tx: mpsc::Sender<MockLineEvent>,
}

impl MockCoinAcceptorHandle {
    /// Emit one line from the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the acceptor has been dropped or closed.
    pub async fn send_line(&self, line: impl Into<String>) -> Result<()> {
        self.event_tx
            .send(MockLineEvent::Line(line.into()))
            .await
            .map_err(|_| HardwareError::disconnected("mock coin acceptor"))
    }

    /// Emit several lines in order.
    pub async fn send_lines<I, S>(&self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            self.send_line(line).await?;
        }
        Ok(())
    }

    /// Make the next read fail, as an unplugged device would.
    pub async fn fail(&self, message: impl Into<String>) -> Result<()> {
        self.event_tx
            .send(MockLineEvent::Fail(message.into()))
            .await
            .map_err(|_| HardwareError::disconnected("mock coin acceptor"))
    }

    /// Close the transport cleanly once queued lines are read.
    ///
    /// Only this handle is consumed; the acceptor sees the close after every
    /// clone of the handle is dropped.
    pub fn close(self) {
        drop(self);
    }
}
