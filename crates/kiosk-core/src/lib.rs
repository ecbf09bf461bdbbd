//! Shared building blocks for the coin kiosk workspace.
//!
//! Holds the error type, protocol constants, and the domain types that every
//! other crate speaks: monetary [`Amount`]s, accepted [`Denomination`]s and the
//! closed [`DenominationSet`], plus the read-only [`ConnectionStatus`] of the
//! coin acceptor transport.

pub mod constants;
pub mod error;
pub mod status;
pub mod types;

pub use error::{Error, Result};
pub use status::{ConnectionState, ConnectionStatus, StatusSummary};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
