//! Error to HTTP response mapping.

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use trainportal_auth::AuthError;

/// Errors a handler or extractor can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failure from the auth core.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Login throttled.
    #[error("too many login attempts")]
    RateLimited,

    /// Body could not be parsed.
    #[error("invalid request body")]
    BadRequest(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Auth(err) => match err {
                AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                AuthError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
                AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
                AuthError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                AuthError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "permission_denied"),
                AuthError::Internal(_) | AuthError::Config(_) | AuthError::Store(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
            },
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let error = match &self {
            Self::Auth(err) if err.is_internal() => {
                tracing::error!(error = %err, "Request failed");
                "internal error".to_string()
            }
            Self::BadRequest(detail) => {
                tracing::debug!(%detail, "Rejected request body");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { error, code })).into_response()
    }
}

/// JSON body extractor whose rejections use the API error shape.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
