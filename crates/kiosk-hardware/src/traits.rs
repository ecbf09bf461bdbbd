//! Coin acceptor trait definitions.
//!
//! This module defines the contract between the intake service and the coin
//! acceptor transport, plus the port discovery seam used by the connection
//! manager. Both have a real serial implementation and a scriptable mock.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::devices::AnyCoinAcceptor;
use crate::error::Result;
use crate::types::{DeviceInfo, PortInfo};

/// Coin acceptor device abstraction.
///
/// A coin acceptor is a line-oriented emitter: every inserted coin (or
/// fragment of one) arrives as a text line. Framing is the device's job;
/// interpretation belongs to the decoder.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. For dynamic dispatch use the enum wrapper
/// [`AnyCoinAcceptor`](crate::devices::AnyCoinAcceptor).
///
/// # Examples
///
/// ```no_run
/// use kiosk_hardware::traits::CoinAcceptor;
/// use kiosk_hardware::error::Result;
///
/// async fn drain<A: CoinAcceptor>(acceptor: &mut A) -> Result<Vec<String>> {
///     let mut lines = Vec::new();
///     while let Some(line) = acceptor.read_line().await? {
///         lines.push(line);
///     }
///     Ok(lines)
/// }
/// ```
pub trait CoinAcceptor: Send + Sync {
    /// Read the next line from the device.
    ///
    /// Returns `Ok(None)` when the transport closed cleanly.
    ///
    /// # Errors
    ///
    /// Returns an error if the device failed while reading (unplugged,
    /// I/O error).
    async fn read_line(&mut self) -> Result<Option<String>>;

    /// Get device information.
    async fn get_info(&self) -> Result<DeviceInfo>;

    /// Close the transport.
    ///
    /// Subsequent reads return `Ok(None)`. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Serial device discovery and opening.
///
/// Separated from [`CoinAcceptor`] so the acquisition lifecycle can be
/// driven against scripted outcomes in tests.
pub trait PortScanner: Send + Sync {
    /// Enumerate available serial devices.
    ///
    /// Implementations return ports in a deterministic order so that
    /// "first device" selection is stable across restarts.
    async fn list_ports(&self) -> Result<Vec<PortInfo>>;

    /// Open the device at `path` at the given line speed.
    ///
    /// # Errors
    ///
    /// Access denials are reported as
    /// [`HardwareError::PermissionDenied`](crate::HardwareError::PermissionDenied)
    /// so the caller can retry them.
    async fn open(&self, path: &str, baud_rate: u32) -> Result<AnyCoinAcceptor>;
}
