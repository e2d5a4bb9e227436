//! # Training portal gateway
//!
//! HTTP boundary for the identity and access core: registration, login and
//! user administration behind bearer-token extractors.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Bearer-token extractors.
pub mod auth;
mod error;
mod middleware;
mod routes;
mod server;

pub use auth::{RequireAdmin, RequireAuth};
pub use error::{ApiError, ApiJson};
pub use middleware::LoginRateLimiter;
pub use server::{AppState, Gateway, GatewayBuilder, GatewayConfig};

/// Start the gateway server.
///
/// # Errors
///
/// Returns error if server fails to start.
pub async fn start(config: GatewayConfig) -> Result<(), GatewayError> {
    let gateway = GatewayBuilder::new().with_config(config).build()?;
    gateway.run().await
}

/// Gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Server error.
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Auth core failed to initialize.
    #[error("Auth error: {0}")]
    Auth(#[from] trainportal_auth::AuthError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
