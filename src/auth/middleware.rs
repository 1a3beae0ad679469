//! Per-request identity resolution.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};

use super::bearer::bearer_token;
use super::types::AuthenticatedIdentity;
use crate::db::Database;
use crate::jwt::JwtConfig;

/// State for the identity middleware.
#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

/// Resolve the caller from the bearer token and attach an
/// [`AuthenticatedIdentity`] to the request extensions.
///
/// Never rejects: a missing, malformed, expired or refresh-type token, or one
/// naming an unknown user, simply leaves the request anonymous.
pub async fn resolve_identity(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(identity) = identify(&state, request.headers()).await {
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}

async fn identify(state: &AuthState, headers: &HeaderMap) -> Option<AuthenticatedIdentity> {
    let token = bearer_token(headers)?;

    let claims = match state.jwt.validate_access_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Ignoring bearer token");
            return None;
        }
    };

    match state.db.users().get_by_email(&claims.sub).await {
        Ok(Some(user)) => Some(AuthenticatedIdentity {
            email: user.email,
            user_id: user.id,
        }),
        Ok(None) => {
            debug!(subject = %claims.sub, "Token subject has no user");
            None
        }
        Err(e) => {
            error!(error = %e, "Failed to look up token subject");
            None
        }
    }
}
