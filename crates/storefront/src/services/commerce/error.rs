//! Cart, checkout and order error types.

use thiserror::Error;

use boutique_core::OrderStatus;

use crate::db::RepositoryError;

/// Errors that can occur during cart, checkout and order operations.
///
/// Every variant is a recoverable result for the caller. A failed checkout
/// leaves catalog, cart and orders exactly as they were.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Unknown product, order, cart line or customer.
    #[error("{0} not found")]
    NotFound(String),

    /// Product has been withdrawn from sale.
    #[error("product is no longer available: {0}")]
    InactiveProduct(String),

    /// Not enough available stock; carries the product name.
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    /// Checkout attempted with no cart lines.
    #[error("cart is empty")]
    EmptyCart,

    /// Requested quantity is not a positive integer.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Cart amounts exceed what a price can represent.
    #[error("cart total is too large")]
    AmountOverflow,

    /// Order lifecycle does not allow the requested change.
    #[error("order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A competing transaction won and the store gave up.
    #[error("concurrent modification, please retry")]
    ConcurrentModification,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CommerceError {
    /// Shorthand for a missing entity.
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} {id}"))
    }
}
