//! Raw tokens extracted from transport lines.

use std::fmt;

/// Digit-only text extracted from one transport line.
///
/// A token is never empty: lines without any digit produce no token and are
/// discarded before reaching the decoder.
///
/// # Examples
///
/// ```
/// use kiosk_protocol::RawToken;
///
/// let token = RawToken::from_line("COIN:10\r").unwrap();
/// assert_eq!(token.as_str(), "10");
/// assert_eq!(token.numeric_value(), Some(10));
///
/// assert!(RawToken::from_line("  \r\n").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawToken(String);

impl RawToken {
    /// Strip every non-digit character from a line.
    ///
    /// Returns `None` when nothing is left.
    pub fn from_line(line: &str) -> Option<Self> {
        let digits: String = line.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            None
        } else {
            Some(RawToken(digits))
        }
    }

    /// Get the digits as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digit value if the token is exactly one digit long.
    #[must_use]
    pub fn single_digit(&self) -> Option<u8> {
        match self.0.as_bytes() {
            [d] => Some(d - b'0'),
            _ => None,
        }
    }

    /// Numeric value of the token.
    ///
    /// Returns `None` if the value does not fit in a `u64`; such tokens are
    /// never valid denominations.
    #[must_use]
    pub fn numeric_value(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for RawToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("5", "5")]
    #[case("10\r", "10")]
    #[case(" 2 0 ", "20")]
    #[case("\u{0}1\u{7f}", "1")]
    #[case("value=007", "007")]
    fn test_from_line_keeps_digits(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(RawToken::from_line(line).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("\r")]
    #[case("ERR")]
    #[case("¹²³")]
    fn test_from_line_without_digits(#[case] line: &str) {
        assert!(RawToken::from_line(line).is_none());
    }

    #[test]
    fn test_single_digit() {
        assert_eq!(RawToken::from_line("7").unwrap().single_digit(), Some(7));
        assert_eq!(RawToken::from_line("0").unwrap().single_digit(), Some(0));
        assert_eq!(RawToken::from_line("10").unwrap().single_digit(), None);
    }

    #[test]
    fn test_numeric_value_overflow() {
        let token = RawToken::from_line("99999999999999999999999").unwrap();
        assert_eq!(token.numeric_value(), None);
    }

    #[test]
    fn test_leading_zeros() {
        let token = RawToken::from_line("010").unwrap();
        assert_eq!(token.numeric_value(), Some(10));
        assert_eq!(token.single_digit(), None);
    }
}
