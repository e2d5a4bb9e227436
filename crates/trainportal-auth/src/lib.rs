//! Identity and access core for the training portal.
//!
//! This crate provides:
//! - Argon2id password hashing with a configured cost
//! - A closed role set with a fixed reachability table
//! - HS256 bearer token issuance and verification
//! - The [`AuthService`] workflows over an injected [`CredentialStore`]
//! - First-run admin bootstrap

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod password;
pub mod roles;
mod service;
/// First-run admin provisioning.
pub mod setup;
pub mod store;
pub mod token;
pub mod user;
mod validation;

pub use password::PasswordHasher;
pub use roles::Role;
pub use service::{AuthService, LoginOutcome};
pub use setup::{bootstrap_admin, bootstrap_admin_from_env, generate_password};
pub use store::{CredentialStore, MemoryCredentialStore, SledCredentialStore, StoreError};
pub use token::{Claims, Identity, IssuedToken, TokenIssuer};
pub use user::{NewUser, PublicUser, User, UserUpdate};
pub use validation::is_valid_email;

use thiserror::Error;

/// Authentication and authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Uniqueness violation (e.g. email already registered).
    #[error("{0}")]
    Conflict(String),

    /// Unknown email or wrong password. Never says which.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token missing, malformed, forged or expired.
    #[error("invalid token")]
    InvalidToken,

    /// No such user.
    #[error("{0} not found")]
    NotFound(String),

    /// Caller's role does not reach the required role.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Hashing, signing or other unexpected failure.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Whether this error is a server-side fault whose details must stay
    /// out of client responses.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_) | Self::Config(_) | Self::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_are_opaque() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "invalid credentials");
        assert_eq!(AuthError::InvalidToken.to_string(), "invalid token");
    }

    #[test]
    fn test_is_internal() {
        assert!(AuthError::Internal("x".into()).is_internal());
        assert!(AuthError::Store(StoreError::Backend("io".into())).is_internal());
        assert!(!AuthError::Conflict("x".into()).is_internal());
        assert!(!AuthError::InvalidCredentials.is_internal());
    }
}
