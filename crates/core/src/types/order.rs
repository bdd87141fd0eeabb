//! Order numbers and the immutable order item snapshot.
//!
//! Both types are durable contracts: receipts and back-office tooling parse
//! order numbers and read the item snapshot long after the catalog has moved
//! on, so neither format may change without bumping
//! [`ORDER_ITEMS_SCHEMA_VERSION`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id::{ProductId, UserId};
use super::money::Money;

/// Schema version of [`OrderItem`] records stored with each order.
pub const ORDER_ITEMS_SCHEMA_VERSION: i16 = 1;

/// Prefix shared by every order number.
const ORDER_NUMBER_PREFIX: &str = "ORD";

/// Human-facing order number.
///
/// Format: `ORD` + `YYYYMMDD` + user id (zero-padded to 4) + per-day
/// sequence (zero-padded to 4). Values wider than four digits are written in
/// full rather than truncated, so uniqueness never depends on the padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Compose an order number from its parts.
    ///
    /// `sequence` must come from an atomic per-day counter; two callers that
    /// race on the same date must never receive the same value.
    #[must_use]
    pub fn compose(date: NaiveDate, user_id: UserId, sequence: u32) -> Self {
        Self(format!(
            "{ORDER_NUMBER_PREFIX}{}{:04}{sequence:04}",
            date.format("%Y%m%d"),
            user_id.as_i32(),
        ))
    }

    /// Wrap an order number read back from storage.
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Get the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One line of an order, captured at order-creation time.
///
/// The field set is fixed: `product_id, name, article, price, quantity,
/// size, color`. Later catalog edits never reach an existing snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub article: String,
    pub price: Money,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}
