//! HTTP surface of the bot.
//!
//! ```text
//! GET  /health   - Liveness check
//! POST /updates  - Chat update webhook, answers with a BotReply
//! ```

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::dispatch::handle_update;
use crate::state::BotState;
use crate::update::{BotReply, ChatUpdate};

/// Build the bot router.
///
/// Sentry layers are added by the binary.
pub fn app(state: BotState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/updates", post(updates))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn updates(State(state): State<BotState>, Json(update): Json<ChatUpdate>) -> Json<BotReply> {
    Json(handle_update(&state, &update).await)
}
