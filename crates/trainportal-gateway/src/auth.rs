//! Bearer-token extractors for axum.
//!
//! Verification is stateless: the token alone decides the caller's identity
//! and role, the credential store is never consulted.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use trainportal_auth::{AuthError, AuthService, Identity, Role, TokenIssuer};

use crate::error::ApiError;

/// Extractor for authenticated requests.
///
/// Use this in handler parameters to require authentication.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    /// The verified identity.
    pub identity: Identity,
}

impl RequireAuth {
    /// Get the user ID.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.identity.subject
    }

    /// Get the user role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.identity.role
    }

    /// Whether the caller is the given user.
    #[must_use]
    pub fn is_self(&self, user_id: &str) -> bool {
        self.identity.subject == user_id
    }

    /// Require the caller's role to reach `required`.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` otherwise.
    pub fn require(&self, required: Role) -> Result<(), ApiError> {
        Ok(self.identity.role.require(required)?)
    }

    /// Allow the caller acting on their own account, otherwise require
    /// `required`. Reserved roles get neither.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if neither holds.
    pub fn require_self_or(&self, user_id: &str, required: Role) -> Result<(), ApiError> {
        if self.is_self(user_id) && self.identity.role.is_assignable() {
            Ok(())
        } else {
            self.require(required)
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthService>::from_ref(state);

        let Some(header) = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        else {
            tracing::debug!("Missing Authorization header");
            return Err(AuthError::InvalidToken.into());
        };

        let Some(token) = TokenIssuer::extract_bearer(header) else {
            tracing::debug!("Malformed Authorization header");
            return Err(AuthError::InvalidToken.into());
        };

        let identity = auth.verify_token(token)?;
        Ok(Self { identity })
    }
}

/// Require admin role extractor.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub RequireAuth);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = RequireAuth::from_request_parts(parts, state).await?;
        auth.require(Role::Admin)?;
        Ok(Self(auth))
    }
}
