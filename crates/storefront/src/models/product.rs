//! Catalog product as the checkout engine sees it.

use chrono::{DateTime, Utc};

use boutique_core::{Money, ProductId, ProductSummary};

/// A catalog product with its inventory counters.
///
/// `stock` counts units available for new orders; `reserved` counts units held
/// against placed orders. Reservation moves units between the two and never
/// changes their sum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    /// Unique article code (e.g. `VOGUE001`).
    pub article: String,
    pub name: String,
    pub category: String,
    pub price: Money,
    pub stock: u32,
    pub reserved: u32,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Units physically held by the shop, available or reserved.
    #[must_use]
    pub fn on_hand(&self) -> u64 {
        u64::from(self.stock) + u64::from(self.reserved)
    }

    /// Move `quantity` units from available stock to reserved.
    ///
    /// Returns `None` (leaving the product untouched) when stock is short or
    /// the reserved counter would overflow.
    #[must_use]
    pub fn reserved_by(&self, quantity: u32) -> Option<Self> {
        let stock = self.stock.checked_sub(quantity)?;
        let reserved = self.reserved.checked_add(quantity)?;
        Some(Self {
            stock,
            reserved,
            ..self.clone()
        })
    }

    /// Return `quantity` reserved units to available stock.
    ///
    /// Returns `None` when fewer than `quantity` units are reserved.
    #[must_use]
    pub fn released_by(&self, quantity: u32) -> Option<Self> {
        let reserved = self.reserved.checked_sub(quantity)?;
        let stock = self.stock.checked_add(quantity)?;
        Some(Self {
            stock,
            reserved,
            ..self.clone()
        })
    }

    /// Public catalog record for this product.
    #[must_use]
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            article: self.article.clone(),
            name: self.name.clone(),
            price: self.price,
            category: self.category.clone(),
            image_url: self.image_url.clone(),
            stock: self.stock,
        }
    }
}

/// Input for creating a catalog product (seeding and tests).
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub article: String,
    pub name: String,
    pub category: String,
    pub price: Money,
    pub stock: u32,
    pub image_url: Option<String>,
}

impl NewProduct {
    /// Minimal product with a price and starting stock.
    #[must_use]
    pub fn new(article: &str, name: &str, price: Money, stock: u32) -> Self {
        Self {
            article: article.to_string(),
            name: name.to_string(),
            category: "Dresses".to_string(),
            price,
            stock,
            image_url: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(stock: u32, reserved: u32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(1),
            article: "VOGUE001".to_string(),
            name: "Silk dress".to_string(),
            category: "Dresses".to_string(),
            price: Money::from_units(30_000),
            stock,
            reserved,
            is_active: true,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reserve_moves_units_without_changing_on_hand() {
        let before = product(10, 2);
        let after = before.reserved_by(3).unwrap();
        assert_eq!((after.stock, after.reserved), (7, 5));
        assert_eq!(after.on_hand(), before.on_hand());
    }

    #[test]
    fn test_reserve_refuses_to_go_negative() {
        assert!(product(1, 0).reserved_by(2).is_none());
        assert!(product(1, 0).reserved_by(1).is_some());
    }

    #[test]
    fn test_release_reverses_reservation() {
        let reserved = product(10, 0).reserved_by(4).unwrap();
        let released = reserved.released_by(4).unwrap();
        assert_eq!((released.stock, released.reserved), (10, 0));
        assert!(released.released_by(1).is_none());
    }
}
