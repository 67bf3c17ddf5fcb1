//! Type-safe currency amounts using decimal arithmetic.
//!
//! Bundle prices, discounts and packaging surcharges are all shop-currency
//! amounts; the currency itself is a property of the storefront, not of the
//! amount, so `Money` carries only the decimal value.

use core::fmt;
use core::ops::{Add, Sub};
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input is not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
}

/// A currency amount in the shop's standard unit (e.g., dollars, not cents).
///
/// Serialized as a decimal string (`"19.99"`) so no floating-point drift
/// creeps in between the catalog and the Admin API.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from minor units (e.g., cents).
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Format with exactly two decimal places, as the Admin API expects.
    #[must_use]
    pub fn to_api_string(&self) -> String {
        format!("{:.2}", self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Self)
            .map_err(|_| MoneyError::Invalid(s.to_string()))
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_addition_has_no_drift() {
        let a: Money = "0.10".parse().unwrap();
        let b: Money = "0.20".parse().unwrap();
        assert_eq!(a + b, "0.30".parse().unwrap());
    }

    #[test]
    fn test_api_string_pads_to_two_places() {
        assert_eq!(Money::from_cents(11_000).to_api_string(), "110.00");
        assert_eq!("7.5".parse::<Money>().unwrap().to_api_string(), "7.50");
    }

    #[test]
    fn test_parse_rejects_non_numbers() {
        let err = "ten dollars".parse::<Money>().unwrap_err();
        assert_eq!(err, MoneyError::Invalid("ten dollars".to_string()));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::from_cents(1999)).unwrap();
        assert_eq!(json, "\"19.99\"");
    }
}
