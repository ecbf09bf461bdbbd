use crate::{
    Result,
    constants::{DEFAULT_DENOMINATIONS, MAX_DENOMINATION},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-negative monetary amount in the kiosk's smallest unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero balance.
    pub const ZERO: Amount = Amount(0);

    /// Wrap a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Amount(value)
    }

    /// Get the raw value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns `true` if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Add two amounts.
    ///
    /// # Errors
    /// Returns `Error::AmountOverflow` if the sum does not fit.
    pub fn checked_add(self, other: Amount) -> Result<Amount> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(Error::AmountOverflow {
                current: self.0,
                added: other.0,
            })
    }

    /// Subtract `other` from this amount.
    ///
    /// # Errors
    /// Returns `Error::InsufficientFunds` if `other` exceeds this amount.
    pub fn checked_sub(self, other: Amount) -> Result<Amount> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or(Error::InsufficientFunds {
                balance: self.0,
                requested: other.0,
            })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(value)
    }
}

impl From<Denomination> for Amount {
    fn from(value: Denomination) -> Self {
        Amount(u64::from(value.0))
    }
}

/// A single coin value the kiosk accepts (1-99).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Denomination(u32);

impl Denomination {
    /// Create a new denomination with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidDenomination` if the value is zero or above
    /// [`MAX_DENOMINATION`].
    pub fn new(value: u32) -> Result<Self> {
        if value == 0 || value > MAX_DENOMINATION {
            return Err(Error::InvalidDenomination(format!(
                "Denomination must be 1-{MAX_DENOMINATION}, got {value}"
            )));
        }
        Ok(Denomination(value))
    }

    /// Get the raw value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns `true` for values the acceptor may split over two lines.
    #[must_use]
    pub fn is_two_digit(&self) -> bool {
        self.0 >= 10
    }

    /// Leading digit of a two-digit value.
    #[must_use]
    pub fn leading_digit(&self) -> Option<u8> {
        self.is_two_digit().then(|| (self.0 / 10) as u8)
    }

    /// Trailing digit of a two-digit value.
    #[must_use]
    pub fn trailing_digit(&self) -> Option<u8> {
        self.is_two_digit().then(|| (self.0 % 10) as u8)
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Denomination {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Denomination::new(value)
    }
}

impl From<Denomination> for u32 {
    fn from(value: Denomination) -> Self {
        value.0
    }
}

/// Closed set of accepted coin values.
///
/// Besides membership, the set answers the two questions the decoder needs
/// while reassembling split values: which single digits may start a
/// two-digit denomination (prefix digits), and which digits may finish one
/// (continuation digits).
///
/// # Examples
///
/// ```
/// use kiosk_core::DenominationSet;
///
/// let set = DenominationSet::default();
/// assert!(set.lookup(10).is_some());
/// assert!(set.lookup(7).is_none());
/// assert!(set.is_prefix_digit(2));
/// assert!(!set.is_prefix_digit(5));
/// assert_eq!(set.combine(1, 0).map(|d| d.value()), Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct DenominationSet {
    /// Sorted, deduplicated values.
    values: Vec<Denomination>,
}

impl DenominationSet {
    /// Build a set from raw values.
    ///
    /// # Errors
    /// Returns `Error::EmptyDenominationSet` for an empty input and
    /// `Error::InvalidDenomination` for any out-of-range value.
    pub fn new(values: impl IntoIterator<Item = u32>) -> Result<Self> {
        let mut values = values
            .into_iter()
            .map(Denomination::new)
            .collect::<Result<Vec<_>>>()?;

        if values.is_empty() {
            return Err(Error::EmptyDenominationSet);
        }

        values.sort_unstable();
        values.dedup();
        Ok(Self { values })
    }

    /// All denominations in ascending order.
    #[must_use]
    pub fn values(&self) -> &[Denomination] {
        &self.values
    }

    /// Find the denomination matching a numeric value.
    #[must_use]
    pub fn lookup(&self, value: u64) -> Option<Denomination> {
        self.values
            .iter()
            .copied()
            .find(|d| u64::from(d.value()) == value)
    }

    /// Returns `true` if the digit starts some two-digit denomination.
    #[must_use]
    pub fn is_prefix_digit(&self, digit: u8) -> bool {
        self.values.iter().any(|d| d.leading_digit() == Some(digit))
    }

    /// Returns `true` if the digit ends some two-digit denomination.
    #[must_use]
    pub fn is_continuation_digit(&self, digit: u8) -> bool {
        self.values.iter().any(|d| d.trailing_digit() == Some(digit))
    }

    /// Join a prefix digit and a continuation digit into a denomination.
    ///
    /// Returns `None` when the two-digit value is not in the set.
    #[must_use]
    pub fn combine(&self, prefix: u8, digit: u8) -> Option<Denomination> {
        self.lookup(u64::from(prefix) * 10 + u64::from(digit))
    }
}

impl Default for DenominationSet {
    fn default() -> Self {
        Self {
            values: DEFAULT_DENOMINATIONS.iter().copied().map(Denomination).collect(),
        }
    }
}

impl TryFrom<Vec<u32>> for DenominationSet {
    type Error = Error;

    fn try_from(values: Vec<u32>) -> Result<Self> {
        DenominationSet::new(values)
    }
}

impl From<DenominationSet> for Vec<u32> {
    fn from(set: DenominationSet) -> Self {
        set.values.into_iter().map(u32::from).collect()
    }
}

impl fmt::Display for DenominationSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let joined = self
            .values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{{{joined}}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(20)]
    #[case(99)]
    fn test_denomination_valid(#[case] value: u32) {
        let d = Denomination::new(value).unwrap();
        assert_eq!(d.value(), value);
    }

    #[rstest]
    #[case(0)]
    #[case(100)]
    #[case(1000)]
    fn test_denomination_invalid(#[case] value: u32) {
        assert!(Denomination::new(value).is_err());
    }

    #[test]
    fn test_denomination_digits() {
        let ten = Denomination::new(10).unwrap();
        assert_eq!(ten.leading_digit(), Some(1));
        assert_eq!(ten.trailing_digit(), Some(0));

        let five = Denomination::new(5).unwrap();
        assert_eq!(five.leading_digit(), None);
        assert_eq!(five.trailing_digit(), None);
    }

    #[test]
    fn test_default_set() {
        let set = DenominationSet::default();
        let values: Vec<u32> = set.values().iter().map(|d| d.value()).collect();
        assert_eq!(values, vec![1, 5, 10, 20]);
    }

    #[rstest]
    #[case(1, true)]
    #[case(2, true)]
    #[case(5, false)]
    #[case(0, false)]
    #[case(7, false)]
    fn test_prefix_digits(#[case] digit: u8, #[case] expected: bool) {
        assert_eq!(DenominationSet::default().is_prefix_digit(digit), expected);
    }

    #[test]
    fn test_continuation_digits() {
        let set = DenominationSet::default();
        assert!(set.is_continuation_digit(0));
        assert!(!set.is_continuation_digit(5));
    }

    #[rstest]
    #[case(1, 0, Some(10))]
    #[case(2, 0, Some(20))]
    #[case(2, 9, None)]
    #[case(1, 5, None)]
    fn test_combine(#[case] prefix: u8, #[case] digit: u8, #[case] expected: Option<u32>) {
        let set = DenominationSet::default();
        assert_eq!(set.combine(prefix, digit).map(|d| d.value()), expected);
    }

    #[test]
    fn test_set_sorts_and_dedups() {
        let set = DenominationSet::new([20, 1, 20, 5]).unwrap();
        let values: Vec<u32> = set.values().iter().map(|d| d.value()).collect();
        assert_eq!(values, vec![1, 5, 20]);
    }

    #[test]
    fn test_set_rejects_empty_and_invalid() {
        assert!(matches!(
            DenominationSet::new(Vec::<u32>::new()),
            Err(Error::EmptyDenominationSet)
        ));
        assert!(DenominationSet::new([1, 0]).is_err());
        assert!(DenominationSet::new([1, 250]).is_err());
    }

    #[test]
    fn test_set_serialization() {
        let set = DenominationSet::default();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[1,5,10,20]");

        let parsed: DenominationSet = serde_json::from_str("[10, 1]").unwrap();
        assert_eq!(parsed.to_string(), "{1, 10}");

        assert!(serde_json::from_str::<DenominationSet>("[]").is_err());
    }

    #[test]
    fn test_amount_arithmetic() {
        let a = Amount::new(15);
        assert_eq!(a.checked_add(Amount::new(5)).unwrap(), Amount::new(20));
        assert_eq!(a.checked_sub(Amount::new(15)).unwrap(), Amount::ZERO);
        assert!(matches!(
            a.checked_sub(Amount::new(16)),
            Err(Error::InsufficientFunds {
                balance: 15,
                requested: 16
            })
        ));
        assert!(Amount::new(u64::MAX).checked_add(Amount::new(1)).is_err());
    }

    #[test]
    fn test_amount_from_denomination() {
        let d = Denomination::new(20).unwrap();
        assert_eq!(Amount::from(d), Amount::new(20));
    }
}
