//! Cart route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use boutique_core::CartLineId;

use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::models::AddToCart;
use crate::state::AppState;

/// Request to remove one cart line.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCart {
    pub line_id: CartLineId,
}

/// Show the cart with its totals.
pub async fn show(
    State(state): State<AppState>,
    RequireCustomer(user_id): RequireCustomer,
) -> Result<Json<Value>> {
    let preview = state.commerce().cart_preview(user_id).await?;
    let item_count = preview.item_count();
    Ok(Json(json!({
        "success": true,
        "cart": preview,
        "item_count": item_count,
    })))
}

/// Add a product selection to the cart.
#[instrument(skip(state, payload))]
pub async fn add(
    State(state): State<AppState>,
    RequireCustomer(user_id): RequireCustomer,
    payload: std::result::Result<Json<AddToCart>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload?;
    let line = state.commerce().add_to_cart(user_id, request).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Added to cart",
        "line": line,
    })))
}

/// Remove one line from the cart.
#[instrument(skip(state, payload))]
pub async fn remove(
    State(state): State<AppState>,
    RequireCustomer(user_id): RequireCustomer,
    payload: std::result::Result<Json<RemoveFromCart>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload?;
    state
        .commerce()
        .remove_cart_line(user_id, request.line_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}
