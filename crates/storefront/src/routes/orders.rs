//! Checkout and order route handlers.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::instrument;

use boutique_core::OrderId;

use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::models::CheckoutRequest;
use crate::state::AppState;

/// Place an order for everything in the cart.
#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    RequireCustomer(user_id): RequireCustomer,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Json(request) = payload?;
    let placed = state.commerce().checkout(user_id, &request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "order_number": placed.order_number,
            "final_amount": placed.final_amount,
            "order": placed,
        })),
    ))
}

/// The customer's order history, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireCustomer(user_id): RequireCustomer,
) -> Result<Json<Value>> {
    let orders = state.commerce().list_orders(user_id).await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

/// Cancel one of the customer's orders.
#[instrument(skip(state, path))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireCustomer(user_id): RequireCustomer,
    path: std::result::Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Value>> {
    let Path(order_id) = path?;
    let order = state
        .commerce()
        .cancel_customer_order(user_id, order_id)
        .await?;
    Ok(Json(json!({ "success": true, "order": order })))
}
