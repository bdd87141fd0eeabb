//! Monetary amounts using decimal arithmetic.
//!
//! The shop trades in a single currency, so an amount is just a [`Decimal`]
//! with arithmetic restricted to what pricing needs: adding amounts and
//! multiplying a unit price by a quantity.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount in the shop currency.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero in the shop currency.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Build an amount from whole currency units.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this unit price, or `None` on overflow.
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Sum of two amounts, or `None` on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Whether the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl std::str::FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<Decimal>().map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_times_multiplies_by_quantity() {
        assert_eq!(
            Money::from_units(2500).checked_times(3),
            Some(Money::from_units(7500))
        );
        assert_eq!(Money::from_units(2500).checked_times(0), Some(Money::ZERO));
    }

    #[test]
    fn test_overflow_is_none() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge.checked_times(2), None);
        assert_eq!(huge.checked_add(Money::from_units(1)), None);
        assert_eq!(huge.checked_times(1), Some(huge));
    }

    #[test]
    fn test_sum_of_amounts() {
        let total: Money = [25_000, 30_000, 35_000]
            .into_iter()
            .map(Money::from_units)
            .sum();
        assert_eq!(total, Money::from_units(90_000));
    }

    #[test]
    fn test_display_drops_trailing_zeros() {
        let money: Money = "1999.50".parse().unwrap();
        assert_eq!(money.to_string(), "1999.5");
        assert_eq!(Money::from_units(500).to_string(), "500");
    }

    #[test]
    fn test_negative_detection() {
        assert!("-1".parse::<Money>().unwrap().is_negative());
        assert!(!Money::ZERO.is_negative());
    }
}
