//! Signing secret wrapper.
//!
//! The token signing key is loaded once from configuration and must never
//! show up in logs or debug output.

use secrecy::{ExposeSecret, SecretBox};

/// Symmetric key used to sign bearer tokens.
///
/// The inner value is wrapped with `secrecy::SecretBox` so it is zeroized on
/// drop and redacted from `Debug`/`Display`.
pub struct SigningSecret(SecretBox<str>);

impl SigningSecret {
    /// Wrap a secret string.
    #[must_use]
    pub fn new(secret: String) -> Self {
        Self(SecretBox::new(secret.into_boxed_str()))
    }

    /// Expose the raw key bytes for signing and verification.
    ///
    /// Use sparingly - only when building keys.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.0.expose_secret().as_bytes()
    }

    /// Whether the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// Length of the secret in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }
}

impl From<&str> for SigningSecret {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningSecret([REDACTED])")
    }
}

impl std::fmt::Display for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}
