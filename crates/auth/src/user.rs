//! User identity model.
//!
//! The password hash never appears on `User`; it travels only through
//! [`UserCredentials`], which the login path alone is allowed to read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fixtrack_core::{DomainError, DomainResult, UserId};

use crate::UserRole;

/// A user as exposed outside the store layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// A user joined with its stored password hash, for credential checks only.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Input for creating a user. The password is already hashed by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: UserRole,
}

impl NewUser {
    /// Validate the natural-key fields before the store sees them.
    pub fn validate(&self) -> DomainResult<()> {
        validate_email(&self.email)
    }
}

/// Partial update for a user (customer maintenance path).
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl UserUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> DomainResult<()> {
    // Cheap shape check; deliverability is not this layer's problem.
    let ok = email.contains('@') && !email.starts_with('@') && !email.ends_with('@');
    if ok {
        Ok(())
    } else {
        Err(DomainError::validation(format!("invalid email: {email}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plausible_email_is_accepted() {
        let new = NewUser {
            email: "customer@fixtrack.dev".to_string(),
            password_hash: "hash".to_string(),
            name: None,
            role: UserRole::Customer,
        };
        assert!(new.validate().is_ok());
    }

    #[test]
    fn email_without_at_is_rejected() {
        let new = NewUser {
            email: "nope".to_string(),
            password_hash: "hash".to_string(),
            name: None,
            role: UserRole::Customer,
        };
        assert!(new.validate().is_err());
    }
}
