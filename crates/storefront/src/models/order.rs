//! Orders and checkout requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boutique_core::{
    DeliveryType, Money, OrderId, OrderItem, OrderNumber, OrderStatus, PaymentStatus, UserId,
};

/// An order created by checkout.
///
/// Everything except `status`, `payment_status` and `updated_at` is frozen at
/// creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    /// Schema version of `items`.
    pub items_version: i16,
    pub subtotal: Money,
    pub delivery_cost: Money,
    pub final_amount: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub delivery_address: Option<String>,
    pub delivery_type: DeliveryType,
    pub payment_method: Option<String>,
    pub customer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer-supplied checkout details.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default, alias = "address")]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub customer_notes: Option<String>,
}

/// Outcome of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub subtotal: Money,
    pub delivery_cost: Money,
    pub final_amount: Money,
}

impl From<&Order> for PlacedOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            subtotal: order.subtotal,
            delivery_cost: order.delivery_cost,
            final_amount: order.final_amount,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_request_accepts_legacy_address_field() {
        let request: CheckoutRequest = serde_json::from_str(
            r#"{"address": "Tverskaya 1", "delivery_type": "pickup", "payment_method": "card"}"#,
        )
        .unwrap();
        assert_eq!(request.delivery_address.as_deref(), Some("Tverskaya 1"));
        assert_eq!(request.delivery_type, DeliveryType::Pickup);
        assert_eq!(request.payment_method.as_deref(), Some("card"));
    }

    #[test]
    fn test_checkout_request_defaults_to_courier() {
        let request: CheckoutRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.delivery_type, DeliveryType::Courier);
        assert!(request.delivery_address.is_none());
    }
}
