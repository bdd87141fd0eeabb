//! Catalog, cart, order and customer storage.
//!
//! Two backends implement the same operations:
//!
//! - [`MemoryStore`] keeps everything behind one async `RwLock`; used when no
//!   database is configured, and by the tests.
//! - [`PgStore`] keeps everything in the `storefront` schema of `PostgreSQL`.
//!
//! [`Store`] dispatches between them so the rest of the crate never cares
//! which one is running.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p boutique-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use chrono::NaiveDate;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use boutique_core::{CartLineId, DeliveryPricing, OrderId, OrderStatus, ProductId, UserId};

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{CartLine, CheckoutRequest, Customer, NewProduct, Order, Product};
use crate::services::commerce::CommerceError;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate article code).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// The storage backend in use.
#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Postgres(PgStore),
}

impl Store {
    /// Short backend name for logs.
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Check that the backend can serve requests.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the database is unreachable.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Postgres(s) => s.ping().await,
        }
    }

    /// Add a product to the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the article code is taken.
    pub async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        match self {
            Self::Memory(s) => s.insert_product(product).await,
            Self::Postgres(s) => s.insert_product(product).await,
        }
    }

    /// Withdraw a product from sale or put it back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn set_product_active(
        &self,
        id: ProductId,
        is_active: bool,
    ) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(s) => s.set_product_active(id, is_active).await,
            Self::Postgres(s) => s.set_product_active(id, is_active).await,
        }
    }

    /// Look up one product, active or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        match self {
            Self::Memory(s) => Ok(s.get_product(id).await),
            Self::Postgres(s) => s.get_product(id).await,
        }
    }

    /// All products currently on sale, by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn active_products(&self) -> Result<Vec<Product>, RepositoryError> {
        match self {
            Self::Memory(s) => Ok(s.active_products().await),
            Self::Postgres(s) => s.active_products().await,
        }
    }

    /// Create the customer if unknown, returning the stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn ensure_customer(
        &self,
        id: UserId,
        display_name: &str,
    ) -> Result<Customer, RepositoryError> {
        match self {
            Self::Memory(s) => Ok(s.ensure_customer(id, display_name).await),
            Self::Postgres(s) => s.ensure_customer(id, display_name).await,
        }
    }

    /// Look up a customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn get_customer(&self, id: UserId) -> Result<Option<Customer>, RepositoryError> {
        match self {
            Self::Memory(s) => Ok(s.get_customer(id).await),
            Self::Postgres(s) => s.get_customer(id).await,
        }
    }

    /// A customer's cart lines in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        match self {
            Self::Memory(s) => Ok(s.cart_lines(user_id).await),
            Self::Postgres(s) => s.cart_lines(user_id).await,
        }
    }

    /// Add units of a product selection, merging with an identical line.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound`, `InactiveProduct` or
    /// `InsufficientStock` as described on `CommerceService::add_to_cart`.
    pub async fn add_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        size: Option<String>,
        color: Option<String>,
    ) -> Result<CartLine, CommerceError> {
        match self {
            Self::Memory(s) => {
                s.add_cart_line(user_id, product_id, quantity, size, color)
                    .await
            }
            Self::Postgres(s) => {
                s.add_cart_line(user_id, product_id, quantity, size, color)
                    .await
            }
        }
    }

    /// Remove one line from a customer's cart.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the customer has no such line.
    pub async fn remove_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<(), CommerceError> {
        match self {
            Self::Memory(s) => s.remove_cart_line(user_id, line_id).await,
            Self::Postgres(s) => s.remove_cart_line(user_id, line_id).await,
        }
    }

    /// Turn the customer's cart into an order in one atomic step.
    ///
    /// # Errors
    ///
    /// Returns any `CommerceError` raised while planning, in which case
    /// nothing was written.
    pub async fn checkout(
        &self,
        user_id: UserId,
        request: &CheckoutRequest,
        pricing: &DeliveryPricing,
        today: NaiveDate,
    ) -> Result<Order, CommerceError> {
        match self {
            Self::Memory(s) => s.checkout(user_id, request, pricing, today).await,
            Self::Postgres(s) => s.checkout(user_id, request, pricing, today).await,
        }
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn orders_for(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        match self {
            Self::Memory(s) => Ok(s.orders_for(user_id).await),
            Self::Postgres(s) => s.orders_for(user_id).await,
        }
    }

    /// Look up one order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        match self {
            Self::Memory(s) => Ok(s.get_order(id).await),
            Self::Postgres(s) => s.get_order(id).await,
        }
    }

    /// Cancel an order and hand its units back to stock.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` or `CommerceError::InvalidTransition`.
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order, CommerceError> {
        match self {
            Self::Memory(s) => s.cancel_order(id).await,
            Self::Postgres(s) => s.cancel_order(id).await,
        }
    }

    /// Move an order one step forward in its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` or `CommerceError::InvalidTransition`.
    pub async fn advance_order(&self, id: OrderId, to: OrderStatus) -> Result<Order, CommerceError> {
        match self {
            Self::Memory(s) => s.advance_order(id, to).await,
            Self::Postgres(s) => s.advance_order(id, to).await,
        }
    }
}
