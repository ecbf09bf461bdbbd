//! Core constants for the coin intake pipeline.
//!
//! This module centralizes the fixed values the coin acceptor firmware and the
//! kiosk agree on: the accepted denominations, the fragment reassembly window,
//! serial line parameters, and the retry budget used while acquiring the
//! transport.
//!
//! # Usage
//!
//! ```
//! use kiosk_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(DEFAULT_DENOMINATIONS, [1, 5, 10, 20]);
//!
//! let window = Duration::from_millis(DEFAULT_FRAGMENT_TIMEOUT_MS);
//! assert!(window < Duration::from_millis(200));
//! ```

// ============================================================================
// Denominations
// ============================================================================

/// Coin values recognized by the reference kiosk.
///
/// Two-digit values are the ones the acceptor firmware may split over two
/// transport lines (`"1"` then `"0"` for 10).
pub const DEFAULT_DENOMINATIONS: [u32; 4] = [1, 5, 10, 20];

/// Largest value a denomination may take.
///
/// The decoder reassembles at most one leading digit plus one continuation
/// digit, so denominations are limited to two decimal digits.
pub const MAX_DENOMINATION: u32 = 99;

// ============================================================================
// Decoder Timing
// ============================================================================

/// Fragment reassembly window in milliseconds.
///
/// After a leading digit arrives the decoder waits this long for its
/// continuation before treating the digit as a complete value. Short enough
/// to stay invisible to the user, long enough to cover the acceptor's line
/// rate when it splits a value.
pub const DEFAULT_FRAGMENT_TIMEOUT_MS: u64 = 140;

// ============================================================================
// Serial Transport
// ============================================================================

/// Baud rate the coin acceptor is opened at.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout applied to the blocking serial handle, in milliseconds.
///
/// The reader thread wakes up at this interval to notice shutdown requests.
pub const SERIAL_READ_TIMEOUT_MS: u64 = 100;

/// Maximum bytes buffered for a single transport line.
///
/// Longer lines are reduced to their digits and rejected by the decoder. The
/// acceptor never emits more than a few characters per event.
pub const MAX_LINE_LENGTH: usize = 256;

// ============================================================================
// Connection Retry
// ============================================================================

/// Delay between attempts to open a port that reported access denied, in
/// milliseconds.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 5000;

/// Maximum number of open attempts for an access-denied port.
pub const DEFAULT_MAX_OPEN_ATTEMPTS: u32 = 12;

/// Error message recorded when enumeration finds no serial devices.
pub const NO_DEVICES_MESSAGE: &str = "no serial devices found";

// ============================================================================
// Ledger and Fan-out
// ============================================================================

/// Interval at which a dirty (unpersisted) balance is re-written, in
/// milliseconds.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 2000;

/// Capacity of the broadcast channel used for kiosk events.
///
/// Slow subscribers lag and lose the oldest events; delivery is best-effort.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Capacity of the channel carrying transport lines into the decoder task.
pub const DEFAULT_LINE_CHANNEL_CAPACITY: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_denominations_within_limit() {
        assert!(DEFAULT_DENOMINATIONS.iter().all(|&d| d > 0 && d <= MAX_DENOMINATION));
    }

    #[test]
    fn test_retry_budget() {
        // One minute of retries at the reference settings
        assert_eq!(
            DEFAULT_RETRY_INTERVAL_MS * u64::from(DEFAULT_MAX_OPEN_ATTEMPTS),
            60_000
        );
    }
}
