//! Coin intake for the self-service kiosk.
//!
//! Wires the pieces between the serial transport and the rest of the kiosk:
//!
//! - [`CoinIntake`] feeds acceptor lines through the decoder and executes
//!   its effects one line at a time.
//! - [`Ledger`] holds the balance and writes it through to a
//!   [`BalanceStore`].
//! - [`EventBus`] broadcasts [`KioskEvent`]s to frontends.
//! - [`AuditSink`] records every acceptance and rejection without blocking.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use kiosk_intake::{CoinIntake, EventBus, IntakeConfig, Ledger, MemoryBalanceStore, TracingAuditSink};
//!
//! # async fn example() -> kiosk_intake::Result<()> {
//! let ledger = Arc::new(Ledger::open(MemoryBalanceStore::new()).await?);
//! let mut intake = CoinIntake::new(
//!     IntakeConfig::default(),
//!     ledger.clone(),
//!     EventBus::default(),
//!     Arc::new(TracingAuditSink),
//! );
//!
//! intake.handle_line("10").await;
//! assert_eq!(ledger.balance().await.value(), 10);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod error;
pub mod events;
pub mod ledger;
pub mod service;
pub mod store;

pub use audit::{AuditLog, AuditSink, AuditWriter, DEFAULT_AUDIT_CAPACITY, TracingAuditSink};
pub use error::{IntakeError, Result};
pub use events::{EventBus, KioskEvent};
pub use ledger::{CreditReceipt, Ledger};
pub use service::{CoinIntake, IntakeConfig};
pub use store::{AnyBalanceStore, BalanceStore, MemoryBalanceStore};
