//! Customer identity extractor.
//!
//! Authentication happens upstream (the web session layer or the chat bot's
//! web-app bridge), which forwards the authenticated customer id in the
//! `x-customer-id` header. Handlers that act on a customer's cart or orders
//! take a [`RequireCustomer`] argument.

use axum::{extract::FromRequestParts, http::request::Parts};

use boutique_core::UserId;

use crate::error::{AppError, set_sentry_user};

/// The HTTP header carrying the authenticated customer id.
pub const CUSTOMER_ID_HEADER: &str = "x-customer-id";

/// Extractor that requires an identified customer.
///
/// Rejects with `401 Unauthorized` when the header is missing or malformed.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireCustomer(user_id): RequireCustomer,
/// ) -> impl IntoResponse {
///     format!("Hello, customer {user_id}!")
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireCustomer(pub UserId);

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CUSTOMER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("customer not identified".to_string()))?;

        let user_id = raw
            .to_str()
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .filter(|id| id.as_i32() > 0)
            .ok_or_else(|| AppError::Unauthorized("invalid customer id".to_string()))?;

        set_sentry_user(&user_id);
        Ok(Self(user_id))
    }
}
