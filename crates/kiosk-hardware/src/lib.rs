//! Coin acceptor transport layer for the coin kiosk.
//!
//! This crate provides the trait-based abstraction over the serial coin
//! acceptor, a real `serialport` implementation, scriptable mocks, and the
//! [`ConnectionManager`] that acquires the device with bounded retries and
//! publishes its status.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Enum dispatch**: [`AnyCoinAcceptor`] and [`AnyPortScanner`] stand in for
//!   trait objects.
//! - **Thread-safe**: All traits require `Send + Sync` for use with Tokio.
//! - **Error-aware**: Open failures are classified so that only access
//!   denials are retried.
//!
//! # Reading Lines
//!
//! ```no_run
//! use kiosk_hardware::traits::CoinAcceptor;
//! use kiosk_hardware::error::Result;
//!
//! async fn first_line<A: CoinAcceptor>(acceptor: &mut A) -> Result<Option<String>> {
//!     acceptor.read_line().await
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] which uses the
//! [`HardwareError`] error type.
//!
//! [`ConnectionManager`]: manager::ConnectionManager
//! [`AnyCoinAcceptor`]: devices::AnyCoinAcceptor
//! [`AnyPortScanner`]: devices::AnyPortScanner

pub mod devices;
pub mod error;
pub mod manager;
pub mod mock;
pub mod serial;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::{AnyCoinAcceptor, AnyPortScanner};
pub use error::{HardwareError, Result};
pub use traits::{CoinAcceptor, PortScanner};
pub use types::{DeviceInfo, PortInfo};

// Re-export manager types
pub use manager::{
    ConnectionConfig, ConnectionHandle, ConnectionManager, StatusHandle, TransportEvent,
};
