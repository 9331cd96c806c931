/// Password Hashing and Verification
///
/// A narrow hashing seam so the credential verifier can be exercised with
/// a fake, plus the bcrypt implementation used in production.

use bcrypt::{hash, verify};

use crate::error::AppError;

/// Hashes secrets and checks secrets against stored digests.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, AppError>;

    /// `Ok(false)` on mismatch; `Err` only when the digest cannot be parsed
    /// or the hashing backend fails.
    fn verify(&self, secret: &str, digest: &str) -> Result<bool, AppError>;
}

/// bcrypt with a configurable work factor
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, secret: &str) -> Result<String, AppError> {
        hash(secret, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn verify(&self, secret: &str, digest: &str) -> Result<bool, AppError> {
        verify(secret, digest)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_password() {
        let hasher = BcryptHasher::new(TEST_COST);
        let hash = hasher.hash("password123").expect("Failed to hash password");

        assert_ne!("password123", hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let hasher = BcryptHasher::new(TEST_COST);
        let hash = hasher.hash("password123").expect("Failed to hash password");

        assert!(hasher.verify("password123", &hash).unwrap());
        assert!(!hasher.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn test_same_secret_hashes_differently() {
        let hasher = BcryptHasher::new(TEST_COST);
        let first = hasher.hash("password123").unwrap();
        let second = hasher.hash("password123").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_digest_is_an_error() {
        let hasher = BcryptHasher::new(TEST_COST);
        assert!(hasher.verify("password123", "not-a-bcrypt-hash").is_err());
    }
}
