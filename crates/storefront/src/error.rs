//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//!
//! Error bodies are JSON: `{ "success": false, "message": "..." }`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::CommerceError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart, checkout or order operation failed.
    #[error("{0}")]
    Commerce(#[from] CommerceError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Caller did not identify a customer.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request body or path.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Commerce(CommerceError::Repository(_))
        )
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Commerce(err) => match err {
                CommerceError::NotFound(_) => StatusCode::NOT_FOUND,
                CommerceError::InactiveProduct(_)
                | CommerceError::InsufficientStock(_)
                | CommerceError::EmptyCart
                | CommerceError::InvalidQuantity(_)
                | CommerceError::AmountOverflow => StatusCode::BAD_REQUEST,
                CommerceError::InvalidTransition { .. } | CommerceError::ConcurrentModification => {
                    StatusCode::CONFLICT
                }
                CommerceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            self.status(),
            Json(json!({ "success": false, "message": message })),
        )
            .into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a customer ID.
///
/// Called by the customer extractor so errors are associated with customers.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use boutique_core::OrderStatus;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Commerce(CommerceError::InsufficientStock("Silk dress".to_string()));
        assert_eq!(err.to_string(), "insufficient stock: Silk dress");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_commerce_status_codes() {
        assert_eq!(
            get_status(CommerceError::not_found("product", 3).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CommerceError::EmptyCart.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CommerceError::InvalidQuantity(0).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CommerceError::AmountOverflow.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CommerceError::InactiveProduct("Coat".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                CommerceError::InvalidTransition {
                    from: OrderStatus::Shipped,
                    to: OrderStatus::Cancelled,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CommerceError::ConcurrentModification.into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err: AppError = CommerceError::Repository(RepositoryError::DataCorruption(
            "product 4 has 0 reserved units".to_string(),
        ))
        .into();
        assert!(err.is_server_error());
        assert_eq!(get_status(err), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(
            get_status(AppError::Unauthorized("missing customer".to_string())),
            StatusCode::UNAUTHORIZED
        );
    }
}
