//! Ownership checks for user-scoped resources.

use super::types::AuthenticatedIdentity;
use crate::api::ApiError;

/// Fail with Forbidden unless the caller owns the resource.
pub fn ensure_owner(identity: &AuthenticatedIdentity, owner_id: i64) -> Result<(), ApiError> {
    if identity.user_id != owner_id {
        return Err(ApiError::forbidden(
            "You do not have permission to access this resource",
        ));
    }
    Ok(())
}

/// Fail with Forbidden unless `user_id` names the caller.
pub fn ensure_self(identity: &AuthenticatedIdentity, user_id: i64) -> Result<(), ApiError> {
    if identity.user_id != user_id {
        return Err(ApiError::forbidden(
            "You can only access your own data",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            email: "alice@example.com".into(),
            user_id: 1,
        }
    }

    #[test]
    fn test_owner_passes() {
        assert!(ensure_owner(&alice(), 1).is_ok());
        assert!(ensure_self(&alice(), 1).is_ok());
    }

    #[test]
    fn test_non_owner_forbidden() {
        assert!(matches!(ensure_owner(&alice(), 2), Err(ApiError::Forbidden(_))));
        assert!(matches!(ensure_self(&alice(), 2), Err(ApiError::Forbidden(_))));
    }
}
