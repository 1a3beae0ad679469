//! Token refresh and identity endpoints.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::error::{ApiError, ResultExt};
use super::extract::Json;
use crate::auth::Auth;
use crate::db::Database;
use crate::jwt::{JwtConfig, JwtError};
use crate::rate_limit::{RateLimitConfig, rate_limit_refresh};

#[derive(Clone)]
pub struct TokenState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

pub fn router(state: TokenState, rate_limits: Arc<RateLimitConfig>) -> Router {
    let refresh = Router::new()
        .route("/refresh", post(refresh_tokens))
        .route_layer(middleware::from_fn_with_state(
            rate_limits,
            rate_limit_refresh,
        ));

    Router::new()
        .route("/me", get(me))
        .merge(refresh)
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenPairResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
    /// Access token lifetime in seconds
    expires_in: u64,
    user_id: i64,
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    email: String,
    user_id: i64,
}

fn token_error(e: JwtError) -> ApiError {
    error!(error = %e, "Failed to create token");
    ApiError::internal("Failed to create token")
}

/// Exchange a refresh token for a fresh token pair.
/// The refresh token's subject must still exist.
async fn refresh_tokens(
    State(state): State<TokenState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = state
        .jwt
        .validate_refresh_token(req.refresh_token.trim())
        .map_err(|e| {
            debug!(error = %e, "Rejected refresh token");
            ApiError::unauthorized("Invalid or expired refresh token")
        })?;

    let user = state
        .db
        .users()
        .get_by_email(&claims.sub)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let access = state
        .jwt
        .generate_access_token(&user.email, user.id)
        .map_err(token_error)?;
    let refresh = state
        .jwt
        .generate_refresh_token(&user.email, user.id)
        .map_err(token_error)?;

    info!(user_id = user.id, "Tokens refreshed");

    Ok(Json(TokenPairResponse {
        access_token: access.token,
        refresh_token: refresh.token,
        token_type: "Bearer",
        expires_in: access.duration,
        user_id: user.id,
        email: user.email,
    }))
}

async fn me(Auth(caller): Auth) -> impl IntoResponse {
    Json(MeResponse {
        email: caller.email,
        user_id: caller.user_id,
    })
}
