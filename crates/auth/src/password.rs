//! Credential hashing.
//!
//! bcrypt with the default cost; tests use a reduced cost to stay fast.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(#[source] bcrypt::BcryptError);

/// Hash a plaintext password for storage.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST).map_err(PasswordError)
}

/// Verify a plaintext password against a stored hash.
///
/// A malformed stored hash counts as a failed verification rather than an
/// error the caller could distinguish.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = bcrypt::hash("password123", 4).unwrap();
        assert!(verify_password("password123", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn malformed_hash_fails_closed() {
        assert!(!verify_password("password123", "not-a-bcrypt-hash"));
    }
}
