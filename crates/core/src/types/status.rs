//! Status enums for orders and deliveries.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// ```text
/// new -> paid -> shipped -> delivered
///  \      \
///   `------`--> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    New,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether an order in this status may be cancelled.
    ///
    /// Cancellation is only possible before the goods leave the warehouse.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::New | Self::Paid)
    }

    /// The forward (non-cancelling) successor of this status, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::New => Some(Self::Paid),
            Self::Paid => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Whether moving from `self` to `to` is a legal lifecycle step.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        if to == Self::Cancelled {
            return self.is_cancellable();
        }
        self.next() == Some(to)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Paid => write!(f, "paid"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "paid" => Ok(Self::Paid),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

/// How the order reaches the customer.
///
/// Delivery type is recorded on the order but does not affect the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.delivery_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    #[default]
    Courier,
    Pickup,
    Post,
}

impl std::fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Courier => write!(f, "courier"),
            Self::Pickup => write!(f, "pickup"),
            Self::Post => write!(f, "post"),
        }
    }
}

impl std::str::FromStr for DeliveryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "courier" => Ok(Self::Courier),
            "pickup" => Ok(Self::Pickup),
            "post" => Ok(Self::Post),
            _ => Err(format!("invalid delivery type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::New.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::New.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::New));
    }

    #[test]
    fn test_cancellation_window() {
        assert!(OrderStatus::New.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_status_text_round_trip() {
        for status in [
            OrderStatus::New,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>(), Ok(status));
        }
        assert!("refunded".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_delivery_type_parsing() {
        assert_eq!("pickup".parse::<DeliveryType>(), Ok(DeliveryType::Pickup));
        assert!("drone".parse::<DeliveryType>().is_err());
        assert_eq!(DeliveryType::default(), DeliveryType::Courier);
    }
}
