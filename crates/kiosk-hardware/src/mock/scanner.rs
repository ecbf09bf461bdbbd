//! Scripted port scanner for exercising the acquisition lifecycle.
//!
//! Each call to `open` pops the next scripted outcome. When the script runs
//! out, opens fail with a non-retryable error so a test never hangs on an
//! unexpected extra attempt.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::Mutex;

use super::MockCoinAcceptor;
use crate::devices::AnyCoinAcceptor;
use crate::traits::PortScanner;
use crate::{HardwareError, PortInfo, Result};

/// Result of one scripted `open` call.
#[derive(Debug)]
pub enum MockOpenOutcome {
    /// Open succeeds with the given acceptor.
    Open(MockCoinAcceptor),

    /// Open is refused with an access error (retryable).
    PermissionDenied,

    /// Open fails with a non-retryable error.
    Fail(String),
}

#[derive(Debug, Default)]
struct ScannerState {
    ports: Vec<PortInfo>,
    outcomes: VecDeque<MockOpenOutcome>,
    opened_paths: Vec<String>,
}

/// Mock port scanner.
///
/// Clones share state, so a test can keep one clone to script outcomes and
/// inspect attempts while the connection manager owns another.
///
/// # Examples
///
/// ```
/// use kiosk_hardware::mock::{MockCoinAcceptor, MockOpenOutcome, MockPortScanner};
/// use kiosk_hardware::traits::PortScanner;
///
/// #[tokio::main]
/// async fn main() {
///     let scanner = MockPortScanner::with_ports(["/dev/ttyUSB0"]);
///     let (acceptor, _handle) = MockCoinAcceptor::new();
///
///     scanner.push_outcome(MockOpenOutcome::PermissionDenied).await;
///     scanner.push_outcome(MockOpenOutcome::Open(acceptor)).await;
///
///     assert!(scanner.open("/dev/ttyUSB0", 9600).await.is_err());
///     assert!(scanner.open("/dev/ttyUSB0", 9600).await.is_ok());
///     assert_eq!(scanner.open_attempts(), 2);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockPortScanner {
    state: Arc<Mutex<ScannerState>>,
    open_attempts: Arc<AtomicU32>,
}

impl MockPortScanner {
    /// Create a scanner that reports no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scanner that reports the given device paths.
    pub fn with_ports<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = ScannerState {
            ports: paths.into_iter().map(PortInfo::new).collect(),
            ..ScannerState::default()
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            open_attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Replace the reported device list (simulates plug/unplug).
    pub async fn set_ports<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().await.ports = paths.into_iter().map(PortInfo::new).collect();
    }

    /// Queue the outcome of a future `open` call.
    pub async fn push_outcome(&self, outcome: MockOpenOutcome) {
        self.state.lock().await.outcomes.push_back(outcome);
    }

    /// Number of `open` calls made so far.
    pub fn open_attempts(&self) -> u32 {
        self.open_attempts.load(Ordering::SeqCst)
    }

    /// Paths passed to `open`, in call order.
    pub async fn opened_paths(&self) -> Vec<String> {
        self.state.lock().await.opened_paths.clone()
    }
}

impl PortScanner for MockPortScanner {
    async fn list_ports(&self) -> Result<Vec<PortInfo>> {
        Ok(self.state.lock().await.ports.clone())
    }

    async fn open(&self, path: &str, _baud_rate: u32) -> Result<AnyCoinAcceptor> {
        self.open_attempts.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock().await;
        state.opened_paths.push(path.to_string());

        match state.outcomes.pop_front() {
            Some(MockOpenOutcome::Open(acceptor)) => Ok(AnyCoinAcceptor::Mock(acceptor)),
            Some(MockOpenOutcome::PermissionDenied) => {
                Err(HardwareError::permission_denied(path, "Permission denied"))
            }
            Some(MockOpenOutcome::Fail(message)) => Err(HardwareError::open_failed(path, message)),
            None => Err(HardwareError::open_failed(path, "no scripted outcome")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_scanner_reports_no_ports() {
        let scanner = MockPortScanner::new();
        assert!(scanner.list_ports().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outcomes_in_order() {
        let scanner = MockPortScanner::with_ports(["/dev/ttyUSB0"]);
        scanner.push_outcome(MockOpenOutcome::PermissionDenied).await;
        scanner.push_outcome(MockOpenOutcome::Fail("busy".to_string())).await;

        let first = scanner.open("/dev/ttyUSB0", 9600).await.unwrap_err();
        let second = scanner.open("/dev/ttyUSB0", 9600).await.unwrap_err();
        let exhausted = scanner.open("/dev/ttyUSB0", 9600).await.unwrap_err();

        assert!(first.is_retryable());
        assert!(!second.is_retryable());
        assert!(!exhausted.is_retryable());
        assert_eq!(scanner.open_attempts(), 3);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let scanner = MockPortScanner::new();
        let observer = scanner.clone();

        scanner.set_ports(["/dev/ttyACM0"]).await;
        let _ = scanner.open("/dev/ttyACM0", 9600).await;

        assert_eq!(observer.list_ports().await.unwrap().len(), 1);
        assert_eq!(observer.open_attempts(), 1);
        assert_eq!(observer.opened_paths().await, vec!["/dev/ttyACM0"]);
    }
}
