//! Authentication identity types.

/// Caller identity resolved from a valid access token.
/// Lives in the request extensions for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub email: String,
    pub user_id: i64,
}
