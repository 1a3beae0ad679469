//! Chatbot proxy endpoint.
//!
//! Always answers 200 with an assistant message once the request itself is
//! valid. Upstream failures surface as a fallback reply, never as an error.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;

use super::error::{ApiError, require_non_blank};
use super::extract::Json;
use crate::auth::Auth;
use crate::chatbot::{Chatbot, HistoryItem};
use crate::rate_limit::{RateLimitConfig, rate_limit_chatbot};

#[derive(Clone)]
pub struct ChatbotState {
    pub chatbot: Chatbot,
}

pub fn router(state: ChatbotState, rate_limits: Arc<RateLimitConfig>) -> Router {
    Router::new()
        .route("/message", post(send_message))
        .route_layer(middleware::from_fn_with_state(
            rate_limits,
            rate_limit_chatbot,
        ))
        .with_state(state)
}

#[derive(Deserialize)]
struct MessageRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    history: Vec<HistoryItem>,
}

async fn send_message(
    State(state): State<ChatbotState>,
    Auth(caller): Auth,
    Json(req): Json<MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_non_blank(&req.message, "Message")?;
    tracing::debug!(user_id = caller.user_id, turns = req.history.len(), "Chat message");

    let reply = state.chatbot.reply(req.message.trim(), &req.history).await;
    Ok(Json(reply))
}
