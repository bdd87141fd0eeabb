//! HTTP middleware for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction naming)
//! 2. `TraceLayer` (request tracing)
//! 3. Timeout (abort slow requests)
//! 4. Request ID (add unique ID to each request)

pub mod auth;
pub mod request_id;

pub use auth::{CUSTOMER_ID_HEADER, RequireCustomer};
pub use request_id::request_id_middleware;
