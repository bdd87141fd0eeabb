//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Store reachable
//!
//! # Catalog
//! GET  /api/products            - Active catalog feed
//! GET  /api/products/{id}       - One active product
//!
//! # Cart (requires x-customer-id)
//! GET  /api/cart                - Cart lines and totals
//! POST /api/cart/add            - Add a product selection
//! POST /api/cart/remove         - Remove one line
//!
//! # Account (requires x-customer-id)
//! GET  /api/profile             - Order count and total spent
//!
//! # Orders (requires x-customer-id)
//! POST /api/order/create        - Checkout
//! GET  /api/orders              - Order history
//! POST /api/orders/{id}/cancel  - Cancel an order
//! ```

pub mod cart;
pub mod orders;
pub mod products;
pub mod profile;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(products::index))
        .route("/api/products/{id}", get(products::show))
        .route("/api/profile", get(profile::show))
        .nest("/api/cart", cart_routes())
        .route("/api/order/create", post(orders::create))
        .nest("/api/orders", order_routes())
}

/// Build the full application router with health checks and middleware.
///
/// Sentry layers are added by the binary so tests can drive this router
/// without a Sentry hub.
pub fn app(state: AppState) -> Router {
    let timeout = state.config().request_timeout;
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(from_fn(request_id_middleware))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty
            )
        }))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
