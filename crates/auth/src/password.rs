//! Bcrypt password hashing with a configurable cost factor.

use bookmart_core::DomainError;

// bcrypt's cost bounds; the crate keeps these constants private.
const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// Password hashing/verification boundary.
///
/// Cost is configurable so tests can run at the bcrypt minimum while
/// production uses the default.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_COST, MAX_COST),
        }
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, DomainError> {
        if plaintext.len() < 6 {
            return Err(DomainError::validation(
                "password must be at least 6 characters",
            ));
        }
        bcrypt::hash(plaintext, self.cost).map_err(|e| DomainError::store(e.to_string()))
    }

    /// Constant-shape verification: hash mismatch and malformed hash both
    /// report "false" to the caller; only the latter is logged.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        match bcrypt::verify(plaintext, hash) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!("bcrypt verify failed on malformed hash: {e}");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        // Minimum cost: keep the test suite fast.
        PasswordHasher::new(MIN_COST)
    }

    #[test]
    fn hash_then_verify() {
        let h = hasher().hash("hunter42").unwrap();
        assert!(hasher().verify("hunter42", &h));
        assert!(!hasher().verify("hunter43", &h));
    }

    #[test]
    fn short_passwords_rejected() {
        assert!(hasher().hash("abc").is_err());
    }

    #[test]
    fn malformed_hash_verifies_false() {
        assert!(!hasher().verify("hunter42", "not-a-bcrypt-hash"));
    }
}
