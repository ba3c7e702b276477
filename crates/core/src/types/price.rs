//! Type-safe price representation using decimal arithmetic.
//!
//! Every amount in the app is Brazilian reais, so `Price` carries no currency
//! code. Amounts are never negative.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// The input is not a decimal amount.
    #[error("invalid price: {0}")]
    Invalid(String),
}

/// A non-negative monetary amount in reais.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero reais.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from an amount in centavos.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn line_total(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Parses `12.50`, `12,50` or `R$ 12,50`.
impl core::str::FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("R$").unwrap_or(trimmed).trim();
        let amount: Decimal = digits
            .replace(',', ".")
            .parse()
            .map_err(|_| PriceError::Invalid(s.to_string()))?;
        Self::new(amount)
    }
}

/// Formats as `R$ 12,50`: two decimal places, comma separator.
impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round_dp(2);
        write!(f, "R$ {}", format!("{rounded:.2}").replace('.', ","))
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
    fn test_line_total() {
        let price = Price::from_cents(1_000);
        assert_eq!(price.line_total(5), Price::from_cents(5_000));
        assert_eq!(price.line_total(0), Price::ZERO);
    }

    #[test]
    fn test_sum() {
        let total: Price = [Price::from_cents(250), Price::from_cents(1_000)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_cents(1_250));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_cents(1_250).to_string(), "R$ 12,50");
        assert_eq!(Price::from_cents(500).to_string(), "R$ 5,00");
        assert_eq!(Price::ZERO.to_string(), "R$ 0,00");
    }

    #[test]
    fn test_parse() {
        assert_eq!("12.50".parse::<Price>().unwrap(), Price::from_cents(1_250));
        assert_eq!("12,5".parse::<Price>().unwrap(), Price::from_cents(1_250));
        assert_eq!("R$ 7,00".parse::<Price>().unwrap(), Price::from_cents(700));
        assert!(matches!("abc".parse::<Price>(), Err(PriceError::Invalid(_))));
        assert!(matches!("-1".parse::<Price>(), Err(PriceError::Negative(_))));
    }

    #[test]
    fn test_serde_rejects_negative() {
        assert!(serde_json::from_str::<Price>("\"-3.00\"").is_err());
        let price: Price = serde_json::from_str("\"10.50\"").unwrap();
        assert_eq!(price, Price::from_cents(1_050));
    }
}
