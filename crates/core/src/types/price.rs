//! Non-negative price using decimal arithmetic.
//!
//! The bookstore API transfers prices as JSON numbers, so [`Price`] serializes
//! as a float on the wire while all arithmetic stays in [`Decimal`] to keep
//! cart totals exact.

use core::fmt;
use core::ops::{Add, Mul};
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// The amount is above [`Price::MAX`].
    #[error("price is too large: {0}")]
    TooLarge(Decimal),
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
}

/// A price in pounds sterling, always `>= 0`.
///
/// Unit prices are capped at [`Price::MAX`], so line subtotals and cart
/// totals stay well inside [`Decimal`]'s range. Arithmetic saturates rather
/// than panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The largest unit price accepted: one billion pounds.
    pub const MAX: Self = Self(Decimal::from_parts(1_000_000_000, 0, 0, false, 0));

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero and
    /// `PriceError::TooLarge` if it is above [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of pence.
    #[must_use]
    pub fn from_pence(pence: u32) -> Self {
        Self(Decimal::new(i64::from(pence), 2))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "£{:.2}", self.0.round_dp(2))
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('£');
        let amount =
            Decimal::from_str(trimmed).map_err(|_| PriceError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        self.times(rhs)
    }
}

impl core::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 2)),
            Err(PriceError::Negative(_))
        ));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_rejects_amounts_above_max() {
        assert_eq!(Price::new(Price::MAX.amount()), Ok(Price::MAX));
        let over = Price::MAX.amount() + Decimal::new(1, 2);
        assert_eq!(Price::new(over), Err(PriceError::TooLarge(over)));
        assert!(serde_json::from_str::<Price>("5e28").is_err());
    }

    #[test]
    fn test_arithmetic_never_overflows() {
        let line = Price::MAX * u32::MAX;
        assert!(line > Price::MAX);
        let total: Price = std::iter::repeat_n(line, 4).sum();
        assert!(total > line);

        let huge = Price(Decimal::MAX);
        assert_eq!(huge * 2, huge);
        assert_eq!(huge + huge, huge);
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [Price::from_pence(1000) * 2, Price::from_pence(500)]
            .into_iter()
            .sum();
        assert_eq!(total.amount(), Decimal::new(2500, 2));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_pence(2500).to_string(), "£25.00");
        assert_eq!(Price::from_pence(1999).to_string(), "£19.99");
    }

    #[test]
    fn test_from_str() {
        let price: Price = "£12.5".parse().unwrap();
        assert_eq!(price, Price::from_pence(1250));
        assert!("-3".parse::<Price>().is_err());
        assert!("abc".parse::<Price>().is_err());
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&Price::from_pence(1250)).unwrap();
        assert_eq!(json, "12.5");

        let parsed: Price = serde_json::from_str("19.99").unwrap();
        assert_eq!(parsed, Price::from_pence(1999));
        assert!(serde_json::from_str::<Price>("-1.0").is_err());
    }
}
