//! Customer counters maintained by the checkout engine.

use chrono::{DateTime, Utc};
use serde::Serialize;

use boutique_core::{Money, UserId};

/// A customer account as far as ordering is concerned.
///
/// Authentication lives upstream; the storefront only keeps the lifetime
/// counters that checkout bumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub id: UserId,
    pub display_name: String,
    pub total_orders: u32,
    pub total_spent: Money,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Record one more placed order worth `amount`.
    pub fn record_order(&mut self, amount: Money) {
        self.total_orders = self.total_orders.saturating_add(1);
        self.total_spent += amount;
    }
}
