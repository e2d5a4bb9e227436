//! User administration.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use trainportal_auth::{NewUser, PublicUser, Role, UserUpdate};

use super::MessageResponse;
use crate::auth::{RequireAdmin, RequireAuth};
use crate::error::{ApiError, ApiJson};
use crate::server::AppState;

/// Admin-driven account creation body.
#[derive(Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    role: Option<Role>,
}

/// Password change body. `current_password` is required when callers
/// change their own password.
#[derive(Deserialize)]
pub struct PasswordRequest {
    #[serde(default, alias = "new_password", alias = "newPassword")]
    password: String,
    #[serde(default, alias = "old_password", alias = "oldPassword")]
    current_password: Option<String>,
}

/// `GET /api/users`: trainers and admins.
pub async fn list_users(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    auth.require(Role::Trainer)?;

    let users = state.auth.list_users().await?;
    Ok(Json(users.iter().map(PublicUser::from).collect()))
}

/// `POST /api/users`: admin only, role explicit (default employee).
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let user = state
        .auth
        .register(NewUser {
            name: body.name,
            email: body.email,
            password: body.password,
            role: body.role.unwrap_or(Role::Employee),
        })
        .await?;

    tracing::info!(actor = %admin.user_id(), user_id = %user.id, "User created by admin");
    Ok((StatusCode::CREATED, Json(user.to_public())))
}

/// `GET /api/users/{id}`: self, trainers and admins.
pub async fn get_user(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>, ApiError> {
    auth.require_self_or(&id, Role::Trainer)?;

    let user = state.auth.get_user(&id).await?;
    Ok(Json(user.to_public()))
}

/// `PUT /api/users/{id}`: self or admin; only admins change roles.
pub async fn update_user(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> Result<Json<PublicUser>, ApiError> {
    auth.require_self_or(&id, Role::Admin)?;
    if update.role.is_some() {
        auth.require(Role::Admin)?;
    }

    let user = state.auth.update_user(&id, update).await?;
    Ok(Json(user.to_public()))
}

/// `PUT /api/users/{id}/password`: self with the current password, or an
/// admin resetting someone else's.
pub async fn update_password(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    auth.require_self_or(&id, Role::Admin)?;

    if auth.is_self(&id) {
        let current = body.current_password.unwrap_or_default();
        state
            .auth
            .change_password(&id, &current, &body.password)
            .await?;
    } else {
        state.auth.update_password(&id, &body.password).await?;
        tracing::info!(actor = %auth.user_id(), user_id = %id, "Password reset by admin");
    }

    Ok(MessageResponse::new("password updated"))
}

/// `DELETE /api/users/{id}`: admin only.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.delete_user(&id).await?;

    tracing::info!(actor = %admin.user_id(), user_id = %id, "User deleted by admin");
    Ok(MessageResponse::new("user deleted"))
}
