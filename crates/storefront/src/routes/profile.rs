//! Customer profile handler.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::state::AppState;

/// The customer's account with lifetime order counters.
///
/// A customer seen for the first time is registered with zeroed counters.
pub async fn show(
    State(state): State<AppState>,
    RequireCustomer(user_id): RequireCustomer,
) -> Result<Json<Value>> {
    let customer = state.commerce().register_customer(user_id).await?;
    Ok(Json(json!({ "success": true, "profile": customer })))
}
