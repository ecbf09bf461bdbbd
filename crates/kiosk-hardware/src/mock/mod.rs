//! Mock device implementations for testing and development.
//!
//! This module provides a simulated coin acceptor and a scripted port
//! scanner that can be controlled programmatically without requiring
//! physical hardware.

pub mod coin_acceptor;
pub mod scanner;

// Re-export commonly used types
pub use coin_acceptor::{MockCoinAcceptor, MockCoinAcceptorHandle};
pub use scanner::{MockOpenOutcome, MockPortScanner};
