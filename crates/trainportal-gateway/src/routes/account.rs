//! Public registration and login, plus the caller's own profile.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trainportal_auth::{NewUser, PublicUser, Role};

use crate::auth::RequireAuth;
use crate::error::{ApiError, ApiJson};
use crate::server::AppState;

/// Self-registration body. Any role in the body is ignored.
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Login body.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    token: String,
    token_type: &'static str,
    expires_at: DateTime<Utc>,
    user: PublicUser,
}

/// `POST /register`: always creates an employee.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let user = state
        .auth
        .register(NewUser {
            name: body.name,
            email: body.email,
            password: body.password,
            role: Role::Employee,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.to_public())))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if !state.login_limiter.check(&body.email) {
        tracing::warn!("Login throttled");
        return Err(ApiError::RateLimited);
    }

    let outcome = state.auth.login(&body.email, &body.password).await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        token_type: "Bearer",
        expires_at: outcome.expires_at,
        user: outcome.user,
    }))
}

/// `GET /api/me`
pub async fn me(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state.auth.get_user(auth.user_id()).await?;
    Ok(Json(user.to_public()))
}
