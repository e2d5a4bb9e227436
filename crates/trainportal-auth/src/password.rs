//! Password hashing with Argon2id.
//!
//! The cost is fixed when the hasher is built from configuration; callers
//! can only hash and verify.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};
use trainportal_core::PasswordHashConfig;

use crate::AuthError;

/// Salted one-way password hasher.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    cost: PasswordHashConfig,
}

impl PasswordHasher {
    /// Build a hasher with the configured cost.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if the parameters are rejected by Argon2.
    pub fn new(cost: PasswordHashConfig) -> Result<Self, AuthError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| AuthError::Config(format!("Invalid password hash parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            cost,
        })
    }

    /// Hash a plaintext password into a PHC string.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty password and `Internal` if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        if password.is_empty() {
            return Err(AuthError::Validation("password is required".to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {e}")))
    }

    /// Check a plaintext candidate against a stored digest.
    ///
    /// A malformed digest never matches.
    #[must_use]
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is malformed");
                return false;
            }
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("algorithm", &"argon2id")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(PasswordHashConfig {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let digest = hasher().hash("secret1").unwrap();
        assert_ne!(digest, "secret1");
        assert!(digest.starts_with("$argon2id$"));
    }

    #[test]
    fn test_verify() {
        let hasher = hasher();
        let digest = hasher.hash("secret1").unwrap();
        assert!(hasher.verify("secret1", &digest));
        assert!(!hasher.verify("secret2", &digest));
        assert!(!hasher.verify("", &digest));
    }

    #[test]
    fn test_salted() {
        let hasher = hasher();
        let a = hasher.hash("same-password").unwrap();
        let b = hasher.hash("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(matches!(hasher().hash(""), Err(AuthError::Validation(_))));
    }

    #[test]
    fn test_malformed_digest() {
        assert!(!hasher().verify("secret1", "not-a-phc-string"));
    }

    #[test]
    fn test_invalid_cost_is_fatal() {
        let result = PasswordHasher::new(PasswordHashConfig {
            memory_kib: 1,
            iterations: 1,
            parallelism: 1,
        });
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_debug_has_no_secrets() {
        let debug = format!("{:?}", hasher());
        assert!(debug.contains("argon2id"));
    }
}
