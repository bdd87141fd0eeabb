//! Integration tests for the Boutique storefront and chat bot.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory scenarios
//! cargo test -p boutique-integration-tests
//!
//! # Include the PostgreSQL scenarios
//! STOREFRONT_DATABASE_URL=postgres://localhost/boutique_test \
//!     cargo test -p boutique-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `checkout_concurrency` - Reservation under contention, order numbering,
//!   stock conservation
//! - `bot_catalog` - Bot mirror fed by a live storefront, webhook flows
//!
//! The helpers below build fresh fixtures per test. Articles and customer ids
//! are randomized so the `PostgreSQL` scenarios can share one database.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;

use axum::Router;
use secrecy::SecretString;
use uuid::Uuid;

use boutique_core::{DeliveryPricing, Money, UserId};
use boutique_storefront::config::StorefrontConfig;
use boutique_storefront::db::{self, MemoryStore, PgStore, Store};
use boutique_storefront::models::{NewProduct, Product};
use boutique_storefront::services::CommerceService;
use boutique_storefront::state::AppState;

/// Checkout service over a fresh in-memory store.
#[must_use]
pub fn memory_service() -> CommerceService {
    CommerceService::new(Store::Memory(MemoryStore::new()), DeliveryPricing::default())
}

/// Checkout service over the database named by `STOREFRONT_DATABASE_URL`,
/// with migrations applied.
///
/// # Panics
///
/// Panics if the variable is unset or the database is unreachable.
pub async fn postgres_service() -> CommerceService {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STOREFRONT_DATABASE_URL must be set for PostgreSQL tests");
    let pool = db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to PostgreSQL");
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    CommerceService::new(Store::Postgres(PgStore::new(pool)), DeliveryPricing::default())
}

/// Short random suffix for unique articles.
#[must_use]
pub fn unique_suffix() -> String {
    Uuid::new_v4().simple().to_string().chars().take(12).collect()
}

/// Insert an active product with the given price and stock.
pub async fn stocked_product(service: &CommerceService, price: i64, stock: u32) -> Product {
    let article = format!("IT-{}", unique_suffix());
    service
        .store()
        .insert_product(NewProduct::new(&article, "Test dress", Money::from_units(price), stock))
        .await
        .expect("Failed to insert product")
}

/// Register `count` customers with random ids.
pub async fn customers(service: &CommerceService, count: usize) -> Vec<UserId> {
    let base = i32::try_from(Uuid::new_v4().as_u128() % 1_000_000_000).unwrap_or(1) + 1_000;
    let mut ids = Vec::with_capacity(count);
    for offset in 0..count {
        let id = UserId::new(base + i32::try_from(offset).unwrap());
        service
            .store()
            .ensure_customer(id, "Integration customer")
            .await
            .expect("Failed to create customer");
        ids.push(id);
    }
    ids
}

/// Re-read a product from the store.
pub async fn reload(service: &CommerceService, product: &Product) -> Product {
    service
        .store()
        .get_product(product.id)
        .await
        .expect("Failed to read product")
        .expect("Product vanished")
}

/// Serve a router on an ephemeral local port, returning its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Test server failed");
    });
    format!("http://{addr}")
}

/// Run the storefront API over `store` on an ephemeral port.
pub async fn spawn_storefront(store: Store) -> String {
    let config = StorefrontConfig::from_lookup(|_| None).expect("Default config is valid");
    serve(boutique_storefront::routes::app(AppState::new(config, store))).await
}
