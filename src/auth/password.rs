//! Password hashing and verification
//!
//! Thin adapter over bcrypt. The cost factor is configurable; higher cost
//! trades login latency for brute-force resistance.

use thiserror::Error;

/// Default bcrypt cost factor
pub const DEFAULT_COST: u32 = 12;

/// Password hashing errors
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),
}

/// Credential hasher with a fixed cost factor
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext password with a fresh salt
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// Verify a plaintext password against a stored digest
    ///
    /// Comparison goes through bcrypt's own verify routine, so timing does
    /// not depend on where the digests diverge.
    pub fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, PasswordError> {
        bcrypt::verify(plaintext, digest).map_err(|e| PasswordError::Hash(e.to_string()))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low cost keeps the tests fast; production uses DEFAULT_COST.
    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let digest = hasher.hash("Aa1!aaaa").unwrap();

        assert_ne!(digest, "Aa1!aaaa");
        assert!(hasher.verify("Aa1!aaaa", &digest).unwrap());
        assert!(!hasher.verify("Bb2@bbbb", &digest).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = hasher();
        let a = hasher.hash("Aa1!aaaa").unwrap();
        let b = hasher.hash("Aa1!aaaa").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_malformed_digest() {
        let hasher = hasher();
        assert!(hasher.verify("Aa1!aaaa", "not-a-bcrypt-digest").is_err());
    }
}
