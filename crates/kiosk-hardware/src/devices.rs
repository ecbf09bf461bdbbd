//! Enum wrappers for coin acceptor dispatch.
//!
//! Native `async fn` in traits (RPITIT) is not object-safe, so
//! `Box<dyn CoinAcceptor>` is not available. These enums provide concrete
//! type dispatch instead, which also keeps the futures spawned by the
//! connection manager `Send`.
//!
//! # Examples
//!
//! ```
//! use kiosk_hardware::devices::AnyCoinAcceptor;
//! use kiosk_hardware::mock::MockCoinAcceptor;
//!
//! let (acceptor, _handle) = MockCoinAcceptor::new();
//! let any_acceptor = AnyCoinAcceptor::Mock(acceptor);
//! ```

use crate::mock::{MockCoinAcceptor, MockPortScanner};
use crate::serial::{SerialCoinAcceptor, SystemPortScanner};
use crate::traits::{CoinAcceptor, PortScanner};
use crate::{DeviceInfo, PortInfo, Result};

/// Enum wrapper for coin acceptor dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCoinAcceptor {
    /// Serial-connected acceptor.
    Serial(SerialCoinAcceptor),

    /// Mock acceptor for development and testing.
    Mock(MockCoinAcceptor),
}

impl CoinAcceptor for AnyCoinAcceptor {
    async fn read_line(&mut self) -> Result<Option<String>> {
        match self {
            Self::Serial(device) => device.read_line().await,
            Self::Mock(device) => device.read_line().await,
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Serial(device) => device.get_info().await,
            Self::Mock(device) => device.get_info().await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Serial(device) => device.close().await,
            Self::Mock(device) => device.close().await,
        }
    }
}

/// Enum wrapper for port scanner dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyPortScanner {
    /// Operating system serial enumeration.
    System(SystemPortScanner),

    /// Scripted scanner for testing.
    Mock(MockPortScanner),
}

impl PortScanner for AnyPortScanner {
    async fn list_ports(&self) -> Result<Vec<PortInfo>> {
        match self {
            Self::System(scanner) => scanner.list_ports().await,
            Self::Mock(scanner) => scanner.list_ports().await,
        }
    }

    async fn open(&self, path: &str, baud_rate: u32) -> Result<AnyCoinAcceptor> {
        match self {
            Self::System(scanner) => scanner.open(path, baud_rate).await,
            Self::Mock(scanner) => scanner.open(path, baud_rate).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_any_acceptor_dispatch() {
        let (acceptor, handle) = MockCoinAcceptor::new();
        let mut any_acceptor = AnyCoinAcceptor::Mock(acceptor);

        handle.send_line("10").await.unwrap();
        assert_eq!(any_acceptor.read_line().await.unwrap(), Some("10".to_string()));

        let info = any_acceptor.get_info().await.unwrap();
        assert_eq!(info.name, "Mock Coin Acceptor");
    }

    #[tokio::test]
    async fn test_any_scanner_dispatch() {
        let scanner = AnyPortScanner::Mock(MockPortScanner::with_ports(["/dev/ttyUSB0"]));

        let ports = scanner.list_ports().await.unwrap();
        assert_eq!(ports, vec![PortInfo::new("/dev/ttyUSB0")]);
    }
}
