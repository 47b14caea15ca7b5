//! Route-level authorization guard.
//!
//! This enforces role checks at the HTTP boundary, keeping the stores and the
//! inventory ledger agnostic of the calling identity.

use thiserror::Error;

use crate::UserRole;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{0}' is not allowed here")]
    Forbidden(UserRole),
}

/// Authorize a caller's role against the set allowed for a route.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn require_any_role(role: UserRole, allowed: &[UserRole]) -> Result<(), AuthzError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_role_passes() {
        assert!(require_any_role(
            UserRole::Technician,
            &[UserRole::Manager, UserRole::Technician]
        )
        .is_ok());
    }

    #[test]
    fn disallowed_role_is_forbidden() {
        let err = require_any_role(UserRole::Customer, &[UserRole::Manager]).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden(UserRole::Customer));
    }

    #[test]
    fn empty_allowlist_denies_everyone() {
        assert!(require_any_role(UserRole::Manager, &[]).is_err());
    }
}
