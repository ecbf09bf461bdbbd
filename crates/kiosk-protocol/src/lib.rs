//! Coin acceptor line protocol.
//!
//! The acceptor writes one ASCII line per physical event. This crate turns
//! those lines into credited coins:
//!
//! ```text
//! serial bytes -> CoinLineCodec -> line -> RawToken -> CoinDecoder -> [Effect]
//! ```
//!
//! - [`CoinLineCodec`] frames the byte stream into lines.
//! - [`RawToken`] keeps only the digits of a line.
//! - [`CoinDecoder`] reassembles values the firmware split over two lines and
//!   validates them against the [`DenominationSet`](kiosk_core::DenominationSet).
//!
//! The decoder performs no I/O. Each call returns an ordered list of
//! [`Effect`]s that the caller executes before feeding the next line.

pub mod codec;
pub mod decoder;
pub mod effect;
pub mod token;

pub use codec::CoinLineCodec;
pub use decoder::{CoinDecoder, DecoderConfig, DecoderState, DecoderStats, PendingFragment};
pub use effect::{Acceptance, AcceptanceKind, Effect, RejectReason, Rejection};
pub use token::RawToken;
