//! Ordered side effects produced by the coin decoder.
//!
//! The decoder decides; the caller acts. For every processed line the
//! decoder returns a `Vec<Effect>` that must be executed in order, and fully,
//! before the next line is fed.

use kiosk_core::Denomination;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// One side effect the caller must execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Credit the ledger with a validated coin.
    Credit(Acceptance),

    /// Record and surface a rejected or ambiguous input.
    Reject(Rejection),

    /// Schedule the fragment timeout.
    ///
    /// When the deadline passes, call
    /// [`CoinDecoder::expire`](crate::CoinDecoder::expire) with `generation`.
    ArmTimer { generation: u64, deadline: Instant },

    /// Cancel the fragment timeout for `generation`.
    ///
    /// Cancelling an already fired or already cancelled timer is a no-op.
    CancelTimer { generation: u64 },
}

impl Effect {
    /// Returns the acceptance if this is a credit.
    pub fn as_credit(&self) -> Option<&Acceptance> {
        match self {
            Effect::Credit(acceptance) => Some(acceptance),
            _ => None,
        }
    }

    /// Returns the rejection if this is a reject.
    pub fn as_reject(&self) -> Option<&Rejection> {
        match self {
            Effect::Reject(rejection) => Some(rejection),
            _ => None,
        }
    }
}

/// How a credited value was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceKind {
    /// A complete value on a single line.
    Direct,

    /// A prefix joined with its continuation line.
    Combined,

    /// A prefix credited on its own after the window elapsed.
    TimedOut,

    /// A prefix credited on its own because an unrelated line arrived.
    Interrupted,
}

impl fmt::Display for AcceptanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            AcceptanceKind::Direct => "direct",
            AcceptanceKind::Combined => "combined",
            AcceptanceKind::TimedOut => "timed_out",
            AcceptanceKind::Interrupted => "interrupted",
        };
        write!(f, "{}", kind)
    }
}

/// A validated coin ready to be credited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acceptance {
    /// The credited value.
    pub denomination: Denomination,

    /// Digits as received (joined for combined values).
    pub raw: String,

    /// Resolution path.
    pub kind: AcceptanceKind,
}

/// Reason an input was not credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Prefix and continuation joined into a value outside the set.
    InvalidCombination,

    /// A prefix that is not a coin on its own was interrupted.
    FragmentInterrupted,

    /// A prefix that is not a coin on its own saw no continuation in time.
    FragmentTimedOut,

    /// A complete value outside the set.
    UnsupportedValue,
}

impl RejectReason {
    /// Stable reason code used in audit records and warnings.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::InvalidCombination => "invalid_combination",
            RejectReason::FragmentInterrupted => "fragment_interrupted",
            RejectReason::FragmentTimedOut => "fragment_timed_out",
            RejectReason::UnsupportedValue => "unsupported_value",
        }
    }

    /// Human-readable message shown to observers.
    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::InvalidCombination => "Coin digits combined into an unknown value",
            RejectReason::FragmentInterrupted => "Incomplete coin value was interrupted",
            RejectReason::FragmentTimedOut => "Incomplete coin value timed out",
            RejectReason::UnsupportedValue => "Coin value is not supported",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An input that was classified but not credited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Digits as received (joined for combinations).
    pub raw: String,

    /// Classification.
    pub reason: RejectReason,
}
