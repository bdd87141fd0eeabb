//! Request ID middleware for request tracing and correlation.
//!
//! Reuses an upstream `x-request-id` (reverse proxy, or the chat bot calling
//! the catalog feed) or generates a UUID v4. The id is recorded in the
//! current span, tagged on the Sentry scope and echoed in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream request id accepted as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", &request_id);

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, middleware::from_fn, routing::get};
    use tower::ServiceExt;

    use super::*;

    async fn echoed(incoming: Option<&str>) -> String {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn(request_id_middleware));
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(id) = incoming {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_upstream_id_is_echoed() {
        assert_eq!(echoed(Some("bot-sync-42")).await, "bot-sync-42");
    }

    #[tokio::test]
    async fn test_missing_or_oversized_id_is_replaced() {
        let generated = echoed(None).await;
        assert!(Uuid::parse_str(&generated).is_ok());

        let oversized = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let replaced = echoed(Some(&oversized)).await;
        assert!(Uuid::parse_str(&replaced).is_ok());
    }
}
