//! Per-IP rate limiting for the token refresh and chatbot endpoints.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use serde_json::json;
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};
use tracing::warn;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Requests per minute per client IP.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub refresh_per_minute: NonZeroU32,
    pub chatbot_per_minute: NonZeroU32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            refresh_per_minute: NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN),
            chatbot_per_minute: NonZeroU32::new(20).unwrap_or(NonZeroU32::MIN),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitConfig {
    pub refresh: Arc<IpLimiter>,
    pub chatbot: Arc<IpLimiter>,
}

impl RateLimitConfig {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            refresh: Arc::new(RateLimiter::keyed(Quota::per_minute(
                limits.refresh_per_minute,
            ))),
            chatbot: Arc::new(RateLimiter::keyed(Quota::per_minute(
                limits.chatbot_per_minute,
            ))),
        }
    }
}

/// Client IP from the connection info, or "unknown" when serving without it.
fn client_ip(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce(limiter: &IpLimiter, request: Request, next: Next, message: &str) -> Response {
    let ip = client_ip(&request);
    match limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": message })),
            )
                .into_response()
        }
    }
}

/// Middleware for rate limiting token refresh.
pub async fn rate_limit_refresh(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(
        &config.refresh,
        request,
        next,
        "Too many token refresh attempts. Please wait before trying again.",
    )
    .await
}

/// Middleware for rate limiting chatbot messages.
pub async fn rate_limit_chatbot(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(
        &config.chatbot,
        request,
        next,
        "Too many requests. Please try again later.",
    )
    .await
}
