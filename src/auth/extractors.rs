//! Axum extractor for authentication.
//!
//! Reads the identity placed in the request extensions by
//! [`resolve_identity`](super::resolve_identity) and never touches the token.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::ApiAuthError;
use super::types::AuthenticatedIdentity;

/// Extractor for endpoints that require an authenticated caller.
/// Rejects with 401 JSON when no identity was resolved.
pub struct Auth(pub AuthenticatedIdentity);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .map(Auth)
            .ok_or(ApiAuthError)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(identity: Option<AuthenticatedIdentity>) -> Parts {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        if let Some(identity) = identity {
            parts.extensions.insert(identity);
        }
        parts
    }

    #[tokio::test]
    async fn test_auth_requires_identity() {
        let mut parts = parts_with(None);
        assert!(Auth::from_request_parts(&mut parts, &()).await.is_err());
    }

    #[tokio::test]
    async fn test_auth_reads_identity() {
        let mut parts = parts_with(Some(AuthenticatedIdentity {
            email: "alice@example.com".into(),
            user_id: 3,
        }));

        let Auth(identity) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(identity.user_id, 3);
        assert_eq!(identity.email, "alice@example.com");
    }
}
