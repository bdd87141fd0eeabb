//! Cart totals.
//!
//! A single pure function prices both the cart preview and the checkout, so
//! the amount a customer confirms is the amount the order records.

use serde::{Deserialize, Serialize};

use super::money::Money;

/// Flat-rate delivery pricing with a free-delivery threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPricing {
    /// Charged when the subtotal is below the threshold.
    pub delivery_cost: Money,
    /// Subtotals at or above this amount ship for free.
    pub free_delivery_threshold: Money,
}

impl DeliveryPricing {
    /// Delivery charge for a given subtotal.
    #[must_use]
    pub fn delivery_for(&self, subtotal: Money) -> Money {
        if subtotal >= self.free_delivery_threshold {
            Money::ZERO
        } else {
            self.delivery_cost
        }
    }
}

impl Default for DeliveryPricing {
    fn default() -> Self {
        Self {
            delivery_cost: Money::from_units(500),
            free_delivery_threshold: Money::from_units(20_000),
        }
    }
}

/// Priced cart: subtotal, delivery and the amount charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Money,
    pub delivery: Money,
    pub final_amount: Money,
}

impl CartTotals {
    /// Price a set of `(unit price, quantity)` lines.
    ///
    /// Returns `None` if any amount overflows.
    #[must_use]
    pub fn compute<I>(lines: I, pricing: &DeliveryPricing) -> Option<Self>
    where
        I: IntoIterator<Item = (Money, u32)>,
    {
        let subtotal = lines
            .into_iter()
            .try_fold(Money::ZERO, |acc, (unit_price, quantity)| {
                acc.checked_add(unit_price.checked_times(quantity)?)
            })?;
        let delivery = pricing.delivery_for(subtotal);

        Some(Self {
            subtotal,
            delivery,
            final_amount: subtotal.checked_add(delivery)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_free_delivery_at_or_above_threshold() {
        let pricing = DeliveryPricing::default();
        let lines = [25_000, 30_000, 35_000].map(|p| (Money::from_units(p), 1));

        let totals = CartTotals::compute(lines, &pricing).unwrap();

        assert_eq!(totals.subtotal, Money::from_units(90_000));
        assert_eq!(totals.delivery, Money::ZERO);
        assert_eq!(totals.final_amount, Money::from_units(90_000));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let pricing = DeliveryPricing::default();
        let totals = CartTotals::compute([(Money::from_units(10_000), 2)], &pricing).unwrap();
        assert_eq!(totals.delivery, Money::ZERO);
        assert_eq!(totals.final_amount, Money::from_units(20_000));
    }

    #[test]
    fn test_delivery_charged_below_threshold() {
        let pricing = DeliveryPricing::default();
        let totals = CartTotals::compute([(Money::from_units(4_500), 3)], &pricing).unwrap();
        assert_eq!(totals.subtotal, Money::from_units(13_500));
        assert_eq!(totals.delivery, Money::from_units(500));
        assert_eq!(totals.final_amount, Money::from_units(14_000));
    }

    #[test]
    fn test_empty_cart_pays_delivery_only() {
        let pricing = DeliveryPricing::default();
        let totals = CartTotals::compute(std::iter::empty(), &pricing).unwrap();
        assert_eq!(totals.subtotal, Money::ZERO);
        assert_eq!(totals.final_amount, Money::from_units(500));
    }

    #[test]
    fn test_overflowing_cart_has_no_totals() {
        let pricing = DeliveryPricing::default();
        let lines = [(Money::new(Decimal::MAX), 1), (Money::from_units(1), 1)];
        assert!(CartTotals::compute(lines, &pricing).is_none());
        assert!(CartTotals::compute([(Money::new(Decimal::MAX), 2)], &pricing).is_none());
    }
}
