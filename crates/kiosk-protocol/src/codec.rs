//! Tokio codec for coin acceptor line framing.
//!
//! The acceptor terminates every event with `\n` (optionally preceded by
//! `\r`). [`CoinLineCodec`] implements [`Decoder`] so that the serial byte
//! stream can be consumed through `FramedRead` or driven by hand from a
//! blocking reader thread.
//!
//! # Architecture
//!
//! ```text
//! Serial bytes -> Decoder -> line (String) -> RawToken -> CoinDecoder
//! ```
//!
//! # Oversized Lines
//!
//! A line longer than the configured limit is not buffered whole. The codec
//! keeps only its digits (at most `max_line_length` of them, never fewer than
//! three) and yields those once the newline arrives. The decoder therefore
//! still sees the line: it interrupts a pending fragment and, holding more
//! digits than any denomination, is rejected as an unsupported value.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//! use kiosk_protocol::CoinLineCodec;
//!
//! let mut codec = CoinLineCodec::new();
//! let mut buffer = BytesMut::from(&b"1\r\n0"[..]);
//!
//! assert_eq!(codec.decode(&mut buffer).unwrap(), Some("1".to_string()));
//! assert_eq!(codec.decode(&mut buffer).unwrap(), None);
//!
//! buffer.extend_from_slice(b"\n");
//! assert_eq!(codec.decode(&mut buffer).unwrap(), Some("0".to_string()));
//! ```

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use kiosk_core::constants::MAX_LINE_LENGTH;
use kiosk_core::{Error, Result};

/// Line delimiter emitted by the acceptor.
const LINE_DELIMITER: u8 = b'\n';

/// Fewest digits kept from an oversized line; more than any denomination has.
const MIN_OVERSIZED_DIGITS: usize = 3;

/// Tokio codec splitting the acceptor byte stream into lines.
#[derive(Debug, Clone)]
pub struct CoinLineCodec {
    /// Maximum line length in bytes (excluding `\r\n`).
    max_line_length: usize,

    /// Bytes already scanned for a delimiter.
    next_index: usize,

    /// Digits collected so far from an oversized line.
    oversized: Option<String>,

    /// Number of oversized lines seen so far.
    oversized_lines: u64,
}

impl CoinLineCodec {
    /// Create a codec with the default line limit.
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom line limit.
    ///
    /// # Example
    ///
    /// ```
    /// use kiosk_protocol::CoinLineCodec;
    ///
    /// let codec = CoinLineCodec::with_max_line_length(16);
    /// assert_eq!(codec.max_line_length(), 16);
    /// ```
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            next_index: 0,
            oversized: None,
            oversized_lines: 0,
        }
    }

    /// Get the configured line limit.
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Number of oversized lines reduced to their digits since creation.
    pub fn oversized_lines(&self) -> u64 {
        self.oversized_lines
    }

    fn digit_cap(&self) -> usize {
        self.max_line_length.max(MIN_OVERSIZED_DIGITS)
    }

    fn collect_digits(&mut self, bytes: &[u8]) {
        let cap = self.digit_cap();
        if let Some(digits) = self.oversized.as_mut() {
            let room = cap.saturating_sub(digits.len());
            digits.extend(
                bytes
                    .iter()
                    .filter(|b| b.is_ascii_digit())
                    .take(room)
                    .map(|b| char::from(*b)),
            );
        }
    }

    fn start_oversized(&mut self) {
        self.oversized = Some(String::new());
        self.oversized_lines += 1;
    }

    /// Turn the bytes of one complete line (without `\n`) into an item.
    fn finish_line(&mut self, bytes: &[u8]) -> String {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        if bytes.len() <= self.max_line_length {
            return String::from_utf8_lossy(bytes).into_owned();
        }

        self.start_oversized();
        self.collect_digits(bytes);
        self.oversized.take().unwrap_or_default()
    }
}

impl Default for CoinLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for CoinLineCodec {
    type Item = String;
    type Error = Error;

    /// Decode the next complete line.
    ///
    /// Returns `Ok(None)` when more bytes are needed. Invalid UTF-8 is
    /// replaced rather than rejected; the decoder only looks at digits.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if self.oversized.is_some() {
            return Ok(match src.iter().position(|b| *b == LINE_DELIMITER) {
                Some(index) => {
                    self.collect_digits(&src[..index]);
                    src.advance(index + 1);
                    self.oversized.take()
                }
                None => {
                    let chunk = src.split();
                    self.collect_digits(&chunk);
                    None
                }
            });
        }

        // A line at the limit may still carry `\r` before its `\n`
        let read_to = src.len().min(self.max_line_length.saturating_add(2));
        let newline = src[self.next_index..read_to]
            .iter()
            .position(|b| *b == LINE_DELIMITER)
            .map(|offset| self.next_index + offset);

        match newline {
            Some(index) => {
                self.next_index = 0;
                let line = src.split_to(index + 1);
                Ok(Some(self.finish_line(&line[..index])))
            }
            None if src.len() > self.max_line_length.saturating_add(1) => {
                self.next_index = 0;
                self.start_oversized();
                self.decode(src)
            }
            None => {
                self.next_index = read_to;
                Ok(None)
            }
        }
    }

    /// Flush a final unterminated line when the transport closes.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        self.next_index = 0;
        if let Some(digits) = self.oversized.take() {
            src.clear();
            return Ok(Some(digits));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let line = src.split();
        Ok(Some(self.finish_line(&line)))
    }
}
