//! Serial coin acceptor backed by the `serialport` crate.
//!
//! `serialport` is blocking, so each open device gets a dedicated reader
//! thread. The thread frames bytes with [`CoinLineCodec`] and forwards lines
//! over a bounded channel that [`SerialCoinAcceptor::read_line`] awaits.
//!
//! ```text
//! serial port -> reader thread (CoinLineCodec) -> mpsc -> read_line()
//! ```
//!
//! The port is opened with a short read timeout so the thread can notice a
//! close request without waiting for the next byte.

use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::BytesMut;
use tokio::sync::mpsc;
use tokio_util::codec::Decoder;
use tracing::{debug, trace, warn};

use kiosk_core::constants::{DEFAULT_LINE_CHANNEL_CAPACITY, MAX_LINE_LENGTH, SERIAL_READ_TIMEOUT_MS};
use kiosk_protocol::CoinLineCodec;

use crate::devices::AnyCoinAcceptor;
use crate::traits::{CoinAcceptor, PortScanner};
use crate::{DeviceInfo, HardwareError, PortInfo, Result};

/// Bytes read from the port per syscall.
const READ_CHUNK_SIZE: usize = 64;

/// Coin acceptor on a serial port.
#[derive(Debug)]
pub struct SerialCoinAcceptor {
    /// Device path.
    path: String,

    /// Configured line speed.
    baud_rate: u32,

    /// Lines (or a terminal read error) from the reader thread.
    line_rx: mpsc::Receiver<Result<String>>,

    /// Set to ask the reader thread to stop.
    shutdown: Arc<AtomicBool>,

    /// Reader thread, taken on close.
    reader: Option<JoinHandle<()>>,
}

impl SerialCoinAcceptor {
    /// Open the device at `path` and start its reader thread.
    ///
    /// This call blocks while the OS opens the device; from async code use
    /// [`SystemPortScanner::open`].
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::PermissionDenied`] when access is refused and
    /// [`HardwareError::OpenFailed`] for any other open failure.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(SERIAL_READ_TIMEOUT_MS))
            .open()
            .map_err(|e| HardwareError::from_serial(path, e))?;

        let (line_tx, line_rx) = mpsc::channel(DEFAULT_LINE_CHANNEL_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));

        let reader = {
            let shutdown = Arc::clone(&shutdown);
            let path = path.to_string();
            std::thread::Builder::new()
                .name("coin-acceptor-reader".to_string())
                .spawn(move || read_loop(port, &path, line_tx, &shutdown))
                .map_err(|e| HardwareError::other(format!("reader thread spawn failed: {}", e)))?
        };

        debug!(path, baud_rate, "Serial coin acceptor opened");

        Ok(Self {
            path: path.to_string(),
            baud_rate,
            line_rx,
            shutdown,
            reader: Some(reader),
        })
    }

    /// Device path this acceptor was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn request_shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.line_rx.close();
    }
}

impl CoinAcceptor for SerialCoinAcceptor {
    async fn read_line(&mut self) -> Result<Option<String>> {
        match self.line_rx.recv().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new("Serial Coin Acceptor", "Serial")
            .with_port_path(self.path.clone())
            .with_baud_rate(self.baud_rate))
    }

    async fn close(&mut self) -> Result<()> {
        self.request_shutdown();

        if let Some(reader) = self.reader.take() {
            tokio::task::spawn_blocking(move || reader.join())
                .await
                .map_err(|e| HardwareError::other(format!("reader join failed: {}", e)))?
                .map_err(|_| HardwareError::other("reader thread panicked"))?;
        }

        debug!(path = %self.path, "Serial coin acceptor closed");
        Ok(())
    }
}

impl Drop for SerialCoinAcceptor {
    fn drop(&mut self) {
        // The thread exits within one read timeout
        self.request_shutdown();
    }
}

/// Blocking reader: frames bytes into lines until EOF, error or shutdown.
fn read_loop(
    mut port: Box<dyn serialport::SerialPort>,
    path: &str,
    line_tx: mpsc::Sender<Result<String>>,
    shutdown: &AtomicBool,
) {
    let mut codec = CoinLineCodec::new();
    let mut buffer = BytesMut::with_capacity(MAX_LINE_LENGTH);
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    while !shutdown.load(Ordering::Relaxed) {
        match port.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                while let Ok(Some(line)) = codec.decode(&mut buffer) {
                    trace!(path, line = %line, "Serial line received");
                    if line_tx.blocking_send(Ok(line)).is_err() {
                        return;
                    }
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
            Err(e) => {
                warn!(path, error = %e, "Serial read failed");
                let _ = line_tx.blocking_send(Err(HardwareError::communication(format!(
                    "read from {} failed: {}",
                    path, e
                ))));
                return;
            }
        }
    }

    if let Ok(Some(line)) = codec.decode_eof(&mut buffer) {
        let _ = line_tx.blocking_send(Ok(line));
    }

    if codec.oversized_lines() > 0 {
        debug!(path, oversized = codec.oversized_lines(), "Oversized serial lines reduced to digits");
    }
}

/// Port scanner backed by the operating system's serial enumeration.
#[derive(Debug, Clone, Default)]
pub struct SystemPortScanner;

impl SystemPortScanner {
    /// Create a new system scanner.
    pub fn new() -> Self {
        Self
    }
}

impl PortScanner for SystemPortScanner {
    async fn list_ports(&self) -> Result<Vec<PortInfo>> {
        let ports = tokio::task::spawn_blocking(serialport::available_ports)
            .await
            .map_err(|e| HardwareError::other(format!("enumeration task failed: {}", e)))?
            .map_err(|e| {
                HardwareError::communication(format!("failed to enumerate serial devices: {}", e))
            })?;

        let mut ports: Vec<PortInfo> = ports.into_iter().map(PortInfo::from).collect();
        ports.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(ports)
    }

    async fn open(&self, path: &str, baud_rate: u32) -> Result<AnyCoinAcceptor> {
        let path = path.to_string();
        let acceptor =
            tokio::task::spawn_blocking(move || SerialCoinAcceptor::open(&path, baud_rate))
                .await
                .map_err(|e| HardwareError::other(format!("open task failed: {}", e)))??;

        Ok(AnyCoinAcceptor::Serial(acceptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_device_is_not_retryable() {
        let scanner = SystemPortScanner::new();
        let error = scanner
            .open("/dev/kiosk-does-not-exist", 9600)
            .await
            .unwrap_err();

        assert!(!error.is_retryable());
        assert!(error.to_string().contains("/dev/kiosk-does-not-exist"));
    }
}
