//! HTTP handlers.

mod account;
mod users;

pub use account::{login, me, register};
pub use users::{create_user, delete_user, get_user, list_users, update_password, update_user};

use axum::Json;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: &'static str,
}

impl MessageResponse {
    pub(crate) const fn new(message: &'static str) -> Json<Self> {
        Json(Self { message })
    }
}
