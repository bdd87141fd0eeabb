//! Cart lines and the priced cart preview.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boutique_core::{CartLineId, CartTotals, DeliveryPricing, Money, ProductId, UserId};

/// One distinct `(product, size, color)` selection in a customer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    /// Price captured when the line was created; later catalog price changes
    /// do not affect it.
    pub unit_price: Money,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Whether this line has the given identity key.
    #[must_use]
    pub fn has_key(&self, product_id: ProductId, size: Option<&str>, color: Option<&str>) -> bool {
        self.product_id == product_id
            && self.size.as_deref() == size
            && self.color.as_deref() == color
    }
}

/// Price a set of cart lines at their captured unit prices.
///
/// Returns `None` if the amounts overflow.
#[must_use]
pub fn compute_totals(lines: &[CartLine], pricing: &DeliveryPricing) -> Option<CartTotals> {
    CartTotals::compute(
        lines.iter().map(|line| (line.unit_price, line.quantity)),
        pricing,
    )
}

/// Request to add a product selection to a cart.
#[derive(Debug, Clone, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

const fn default_quantity() -> i64 {
    1
}

impl AddToCart {
    /// Build a request with no size or color selection.
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
            size: None,
            color: None,
        }
    }

    /// Set the selected size.
    #[must_use]
    pub fn with_size(mut self, size: &str) -> Self {
        self.size = Some(size.to_string());
        self
    }

    /// Set the selected color.
    #[must_use]
    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    /// Size with blank selections treated as no selection.
    #[must_use]
    pub fn normalized_size(&self) -> Option<String> {
        normalize_option(self.size.as_deref())
    }

    /// Color with blank selections treated as no selection.
    #[must_use]
    pub fn normalized_color(&self) -> Option<String> {
        normalize_option(self.color.as_deref())
    }
}

fn normalize_option(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// A cart with its totals, as shown before checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CartPreview {
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
    pub free_delivery_threshold: Money,
}

impl CartPreview {
    /// Price the given lines, or `None` if the amounts overflow.
    #[must_use]
    pub fn new(lines: Vec<CartLine>, pricing: &DeliveryPricing) -> Option<Self> {
        let totals = compute_totals(&lines, pricing)?;
        Some(Self {
            lines,
            totals,
            free_delivery_threshold: pricing.free_delivery_threshold,
        })
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(unit_price: i64, quantity: u32) -> CartLine {
        CartLine {
            id: CartLineId::new(1),
            user_id: UserId::new(1),
            product_id: ProductId::new(1),
            quantity,
            size: Some("M".to_string()),
            color: None,
            unit_price: Money::from_units(unit_price),
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_blank_selections_normalize_to_none() {
        let request = AddToCart::new(ProductId::new(1), 1)
            .with_size("  ")
            .with_color(" Black ");
        assert_eq!(request.normalized_size(), None);
        assert_eq!(request.normalized_color(), Some("Black".to_string()));
    }

    #[test]
    fn test_line_identity_includes_size_and_color() {
        let line = line(1_000, 1);
        assert!(line.has_key(ProductId::new(1), Some("M"), None));
        assert!(!line.has_key(ProductId::new(1), Some("L"), None));
        assert!(!line.has_key(ProductId::new(1), Some("M"), Some("Red")));
        assert!(!line.has_key(ProductId::new(2), Some("M"), None));
    }

    #[test]
    fn test_preview_uses_captured_prices() {
        let preview = CartPreview::new(
            vec![line(4_000, 2), line(3_000, 1)],
            &DeliveryPricing::default(),
        )
        .unwrap();
        assert_eq!(preview.totals.subtotal, Money::from_units(11_000));
        assert_eq!(preview.totals.delivery, Money::from_units(500));
        assert_eq!(preview.totals.final_amount, Money::from_units(11_500));
        assert_eq!(preview.item_count(), 3);
    }

    #[test]
    fn test_add_request_defaults_quantity_to_one() {
        let request: AddToCart = serde_json::from_str(r#"{"product_id": 4}"#).unwrap();
        assert_eq!(request.quantity, 1);
        assert_eq!(request.product_id, ProductId::new(4));
    }
}
