//! Coin decoder state machine.
//!
//! The acceptor firmware reports a coin either as one complete line (`"10"`)
//! or split over two lines in quick succession (`"1"`, `"0"`). The decoder
//! cannot know which mode produced a leading digit, so it arms a short window
//! and waits for a continuation before deciding.
//!
//! # States
//!
//! - `Idle`: no pending fragment
//! - `Armed`: one leading digit waiting for its continuation or timeout
//!
//! # Transitions
//!
//! ```text
//!            prefix digit                 continuation digit
//!  ┌──────┐ ─────────────> ┌───────┐ ───────────────────────> credit / reject
//!  │ Idle │                │ Armed │
//!  └──────┘ <───────────── └───────┘ ── other token ──> resolve prefix,
//!      │      timeout:                                  then re-process
//!      │      resolve prefix                            token from Idle
//!      └── other token: credit if in set, else reject
//! ```
//!
//! Resolving a prefix credits it when the prefix is itself a denomination
//! and rejects it otherwise.
//!
//! # Timers
//!
//! The decoder never sleeps. Arming returns [`Effect::ArmTimer`] with a
//! deadline and a generation number; the caller schedules it and calls
//! [`CoinDecoder::expire`] when it fires. Every later token that touches the
//! fragment returns [`Effect::CancelTimer`]. An expiry for a generation that
//! already resolved does nothing, so a timer racing a token cannot
//! double-credit.
//!
//! # Examples
//!
//! ```
//! use kiosk_protocol::{CoinDecoder, Effect};
//! use std::time::{Duration, Instant};
//!
//! let mut decoder = CoinDecoder::new();
//! let now = Instant::now();
//!
//! // Leading digit arms the window
//! let effects = decoder.process_line("1", now);
//! assert!(matches!(effects[0], Effect::ArmTimer { .. }));
//!
//! // Continuation within the window credits 10 once
//! let effects = decoder.process_line("0", now + Duration::from_millis(20));
//! let credited: Vec<u32> = effects
//!     .iter()
//!     .filter_map(Effect::as_credit)
//!     .map(|a| a.denomination.value())
//!     .collect();
//! assert_eq!(credited, vec![10]);
//! assert!(decoder.is_idle());
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use kiosk_core::DenominationSet;
use kiosk_core::constants::DEFAULT_FRAGMENT_TIMEOUT_MS;
use serde::Serialize;

use crate::effect::{Acceptance, AcceptanceKind, Effect, RejectReason, Rejection};
use crate::token::RawToken;

/// Configuration for the coin decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Accepted coin values.
    pub denominations: DenominationSet,

    /// How long a leading digit waits for its continuation.
    pub fragment_timeout: Duration,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            denominations: DenominationSet::default(),
            fragment_timeout: Duration::from_millis(DEFAULT_FRAGMENT_TIMEOUT_MS),
        }
    }
}

impl DecoderConfig {
    /// Set the accepted denominations.
    pub fn denominations(mut self, denominations: DenominationSet) -> Self {
        self.denominations = denominations;
        self
    }

    /// Set the fragment reassembly window.
    pub fn fragment_timeout(mut self, timeout: Duration) -> Self {
        self.fragment_timeout = timeout;
        self
    }
}

/// A leading digit waiting for its continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFragment {
    /// The leading digit.
    pub prefix: u8,

    /// When the fragment was armed.
    pub armed_at: Instant,

    /// Identity of this arming, matched against timer expiries.
    pub generation: u64,
}

impl PendingFragment {
    /// Deadline after which the fragment is resolved on its own.
    pub fn deadline(&self, timeout: Duration) -> Instant {
        self.armed_at + timeout
    }
}

/// Current decoder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No pending fragment.
    Idle,

    /// One fragment awaiting continuation or timeout.
    Armed(PendingFragment),
}

impl fmt::Display for DecoderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderState::Idle => write!(f, "Idle"),
            DecoderState::Armed(fragment) => write!(f, "Armed({})", fragment.prefix),
        }
    }
}

/// Running counters for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecoderStats {
    /// Lines received, including discarded ones.
    pub lines: u64,

    /// Lines without any digit.
    pub discarded: u64,

    /// Coins credited.
    pub credited: u64,

    /// Sum of credited values.
    pub credited_total: u64,

    /// Inputs rejected.
    pub rejected: u64,

    /// Fragments armed.
    pub armed: u64,

    /// Fragments joined with a continuation.
    pub combined: u64,

    /// Fragments resolved by timeout.
    pub timed_out: u64,

    /// Fragments resolved by an unrelated token.
    pub interrupted: u64,
}

/// Coin decoder reassembling split values from the acceptor line stream.
///
/// # Thread Safety
///
/// The decoder is a plain value and must be driven by a single task;
/// correctness depends on tokens being processed strictly in arrival order.
#[derive(Debug)]
pub struct CoinDecoder {
    config: DecoderConfig,
    state: DecoderState,
    next_generation: u64,
    stats: DecoderStats,
}

impl CoinDecoder {
    /// Create a decoder with the reference denominations and window.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a decoder with custom configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            state: DecoderState::Idle,
            next_generation: 0,
            stats: DecoderStats::default(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Get the current state.
    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    /// Returns `true` when no fragment is pending.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, DecoderState::Idle)
    }

    /// The pending fragment, if any.
    pub fn pending(&self) -> Option<&PendingFragment> {
        match &self.state {
            DecoderState::Armed(fragment) => Some(fragment),
            DecoderState::Idle => None,
        }
    }

    /// Generation and deadline of the pending fragment's timer.
    pub fn deadline(&self) -> Option<(u64, Instant)> {
        self.pending()
            .map(|f| (f.generation, f.deadline(self.config.fragment_timeout)))
    }

    /// Get the running counters.
    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Process one transport line.
    ///
    /// Lines without digits are discarded silently and leave any pending
    /// fragment untouched.
    pub fn process_line(&mut self, line: &str, now: Instant) -> Vec<Effect> {
        self.stats.lines += 1;

        match RawToken::from_line(line) {
            Some(token) => self.process_token(&token, now),
            None => {
                self.stats.discarded += 1;
                Vec::new()
            }
        }
    }

    /// Process one raw token.
    pub fn process_token(&mut self, token: &RawToken, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        if let DecoderState::Armed(fragment) = self.state {
            self.state = DecoderState::Idle;
            effects.push(Effect::CancelTimer {
                generation: fragment.generation,
            });

            match token.single_digit() {
                Some(digit) if self.is_continuation(digit) => {
                    self.stats.combined += 1;
                    let raw = format!("{}{}", fragment.prefix, digit);
                    let effect = match self.config.denominations.combine(fragment.prefix, digit) {
                        Some(denomination) => self.credit(Acceptance {
                            denomination,
                            raw,
                            kind: AcceptanceKind::Combined,
                        }),
                        None => self.reject(raw, RejectReason::InvalidCombination),
                    };
                    effects.push(effect);
                    return effects;
                }
                _ => {
                    self.stats.interrupted += 1;
                    effects.push(self.resolve_prefix(
                        fragment.prefix,
                        AcceptanceKind::Interrupted,
                        RejectReason::FragmentInterrupted,
                    ));
                }
            }
        }

        effects.extend(self.process_idle(token, now));
        effects
    }

    /// Resolve the pending fragment after its timer fired.
    ///
    /// Does nothing if `generation` no longer matches the pending fragment
    /// (it was already combined or interrupted).
    pub fn expire(&mut self, generation: u64, _now: Instant) -> Vec<Effect> {
        match self.state {
            DecoderState::Armed(fragment) if fragment.generation == generation => {
                self.state = DecoderState::Idle;
                self.stats.timed_out += 1;
                vec![self.resolve_prefix(
                    fragment.prefix,
                    AcceptanceKind::TimedOut,
                    RejectReason::FragmentTimedOut,
                )]
            }
            _ => Vec::new(),
        }
    }

    /// Resolve any pending fragment immediately as if its timer fired.
    ///
    /// Used when the transport closes so a coin already inserted is not
    /// left hanging.
    pub fn flush(&mut self, now: Instant) -> Vec<Effect> {
        match self.state {
            DecoderState::Armed(fragment) => {
                let mut effects = vec![Effect::CancelTimer {
                    generation: fragment.generation,
                }];
                effects.extend(self.expire(fragment.generation, now));
                effects
            }
            DecoderState::Idle => Vec::new(),
        }
    }

    fn process_idle(&mut self, token: &RawToken, now: Instant) -> Vec<Effect> {
        if let Some(digit) = token.single_digit()
            && self.config.denominations.is_prefix_digit(digit)
        {
            let fragment = PendingFragment {
                prefix: digit,
                armed_at: now,
                generation: self.next_generation,
            };
            self.next_generation += 1;
            self.stats.armed += 1;
            self.state = DecoderState::Armed(fragment);

            return vec![Effect::ArmTimer {
                generation: fragment.generation,
                deadline: fragment.deadline(self.config.fragment_timeout),
            }];
        }

        let denomination = token
            .numeric_value()
            .and_then(|value| self.config.denominations.lookup(value));

        let effect = match denomination {
            Some(denomination) => self.credit(Acceptance {
                denomination,
                raw: token.as_str().to_string(),
                kind: AcceptanceKind::Direct,
            }),
            None => self.reject(token.as_str().to_string(), RejectReason::UnsupportedValue),
        };
        vec![effect]
    }

    /// A single digit continues a fragment when it is a designated
    /// continuation digit, or when it could not mean anything on its own.
    fn is_continuation(&self, digit: u8) -> bool {
        let set = &self.config.denominations;
        set.is_continuation_digit(digit)
            || (set.lookup(u64::from(digit)).is_none() && !set.is_prefix_digit(digit))
    }

    fn resolve_prefix(
        &mut self,
        prefix: u8,
        kind: AcceptanceKind,
        reason: RejectReason,
    ) -> Effect {
        match self.config.denominations.lookup(u64::from(prefix)) {
            Some(denomination) => self.credit(Acceptance {
                denomination,
                raw: prefix.to_string(),
                kind,
            }),
            None => self.reject(prefix.to_string(), reason),
        }
    }

    fn credit(&mut self, acceptance: Acceptance) -> Effect {
        self.stats.credited += 1;
        self.stats.credited_total += u64::from(acceptance.denomination.value());
        Effect::Credit(acceptance)
    }

    fn reject(&mut self, raw: String, reason: RejectReason) -> Effect {
        self.stats.rejected += 1;
        Effect::Reject(Rejection { raw, reason })
    }
}

impl Default for CoinDecoder {
    fn default() -> Self {
        Self::new()
    }
}
