//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying a fixed claim record. They are never stored
//! server-side and cannot be revoked: a token stays valid until `exp` even if
//! the account's password or role changes afterwards.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use trainportal_core::SigningSecret;

use crate::AuthError;
use crate::roles::Role;

/// Recommended minimum secret length in bytes.
const MIN_SECRET_LEN: usize = 32;

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// User role at issuance.
    pub role: Role,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// User ID.
    pub subject: String,
    /// Role carried by the token.
    pub role: Role,
}

/// A freshly signed token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// Encoded JWT.
    pub token: String,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies bearer tokens with a symmetric secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    validity: Duration,
    window: TimeDelta,
}

impl TokenIssuer {
    /// Create an issuer from the process-wide signing secret.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if the secret is empty, or the validity
    /// window is zero or too large to produce a representable expiry.
    pub fn new(secret: &SigningSecret, validity: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Config(
                "Token signing secret must not be empty".to_string(),
            ));
        }
        if validity.is_zero() {
            return Err(AuthError::Config(
                "Token validity window must be positive".to_string(),
            ));
        }
        let window = TimeDelta::from_std(validity)
            .ok()
            .filter(|window| Utc::now().checked_add_signed(*window).is_some())
            .ok_or_else(|| {
                AuthError::Config(format!("Token validity window is out of range: {validity:?}"))
            })?;
        if secret.len() < MIN_SECRET_LEN {
            tracing::warn!(
                length = secret.len(),
                "Token signing secret is shorter than {MIN_SECRET_LEN} bytes"
            );
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.expose()),
            decoding_key: DecodingKey::from_secret(secret.expose()),
            validation,
            validity,
            window,
        })
    }

    /// Generate a random 256-bit secret key.
    #[must_use]
    pub fn generate_secret() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    /// Generate a random secret as hex string.
    #[must_use]
    pub fn generate_hex_secret() -> String {
        hex::encode(Self::generate_secret())
    }

    /// Validity window applied to new tokens.
    #[must_use]
    pub const fn validity(&self) -> Duration {
        self.validity
    }

    /// Issue a token for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if signing fails or the expiry cannot be
    /// represented.
    pub fn issue(&self, user_id: &str, role: Role) -> Result<IssuedToken, AuthError> {
        self.issue_at(user_id, role, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        user_id: &str,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = issued_at
            .checked_add_signed(self.window)
            .ok_or_else(|| AuthError::Internal("Token expiry out of range".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token signing failed: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token and return the identity it carries.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for any failure: malformed input,
    /// bad signature, wrong algorithm, expiry, or an unknown role.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            AuthError::InvalidToken
        })?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(Identity {
            subject: data.claims.sub,
            role: data.claims.role,
        })
    }

    /// Extract token from an Authorization header value.
    ///
    /// Expects format: "Bearer <token>"
    #[must_use]
    pub fn extract_bearer(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}
