//! Gateway server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::FromRef,
    http::Method,
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use trainportal_auth::{
    AuthService, CredentialStore, SledCredentialStore, bootstrap_admin_from_env,
};
use trainportal_core::{AuthConfig, Config};

use crate::GatewayError;
use crate::middleware::LoginRateLimiter;
use crate::routes;

/// How often idle login-throttle keys are dropped.
const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Port to listen on.
    pub port: u16,
    /// Bind address.
    pub bind_address: String,
    /// Enable CORS.
    pub cors: bool,
    /// Login attempts allowed per email per minute.
    pub login_attempts_per_minute: u32,
    /// Directory holding the credential store.
    pub data_dir: PathBuf,
    /// Authentication configuration.
    pub auth: AuthConfig,
}

impl GatewayConfig {
    /// Derive the gateway settings from the process configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            port: config.server.port,
            bind_address: config.server.bind_address.clone(),
            cors: config.server.cors,
            login_attempts_per_minute: config.server.login_attempts_per_minute,
            data_dir: config.data_dir(),
            auth: config.auth.clone(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Account workflows.
    pub auth: Arc<AuthService>,
    /// Login throttle.
    pub login_limiter: Arc<LoginRateLimiter>,
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.auth)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("auth", &self.auth)
            .field("login_limiter", &self.login_limiter)
            .finish()
    }
}

/// Gateway server.
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    state: AppState,
}

/// Builder for constructing a Gateway with its dependencies.
#[derive(Default)]
pub struct GatewayBuilder {
    config: GatewayConfig,
    store: Option<Arc<dyn CredentialStore>>,
    auth_service: Option<Arc<AuthService>>,
}

impl GatewayBuilder {
    /// Create a new builder with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set gateway configuration.
    #[must_use]
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this credential store instead of opening one under `data_dir`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a ready-made auth service. Takes precedence over `with_store`.
    #[must_use]
    pub fn with_auth_service(mut self, service: Arc<AuthService>) -> Self {
        self.auth_service = Some(service);
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened or the auth core rejects
    /// its configuration (e.g. no signing secret).
    pub fn build(self) -> Result<Gateway, GatewayError> {
        let auth = match self.auth_service {
            Some(service) => service,
            None => {
                let store = match self.store {
                    Some(store) => store,
                    None => open_store(&self.config.data_dir)?,
                };
                Arc::new(AuthService::from_config(store, &self.config.auth)?)
            }
        };

        let state = AppState {
            auth,
            login_limiter: Arc::new(LoginRateLimiter::new(
                self.config.login_attempts_per_minute,
            )),
        };

        Ok(Gateway {
            config: self.config,
            state,
        })
    }
}

fn open_store(data_dir: &std::path::Path) -> Result<Arc<dyn CredentialStore>, GatewayError> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| GatewayError::Config(format!("Failed to create data dir: {e}")))?;

    let store = SledCredentialStore::open(data_dir)
        .map_err(|e| GatewayError::Config(format!("Failed to open credential store: {e}")))?;

    Ok(Arc::new(store))
}

impl Gateway {
    /// Shared handler state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the HTTP router.
    #[must_use]
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/me", get(routes::me))
            .route("/users", get(routes::list_users).post(routes::create_user))
            .route(
                "/users/{id}",
                get(routes::get_user)
                    .put(routes::update_user)
                    .delete(routes::delete_user),
            )
            .route("/users/{id}/password", put(routes::update_password));

        let app = Router::new()
            .route("/health", get(routes::health))
            .route("/register", post(routes::register))
            .route("/login", post(routes::login))
            .nest("/api", api)
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.cors {
            app.layer(cors_layer())
        } else {
            app
        }
    }

    /// Run the gateway server.
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or the listener fails.
    pub async fn run(&self) -> Result<(), GatewayError> {
        match bootstrap_admin_from_env(&self.state.auth).await {
            Ok(Some(admin)) => tracing::info!(email = %admin.email, "Bootstrap admin ready"),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Bootstrap admin was not created"),
        }

        if self.state.auth.user_count().await? == 0 {
            tracing::warn!(
                "No users configured; create an admin with `trainportal admin create --role admin`"
            );
        }

        let limiter = Arc::clone(&self.state.login_limiter);
        let prune_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(LIMITER_PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                limiter.prune();
            }
        });

        let app = self.router();

        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid address: {e}")))?;

        tracing::info!("Gateway listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::Server(e.to_string()));

        prune_handle.abort();
        tracing::info!("Gateway stopped");
        result
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use trainportal_core::PasswordHashConfig;

    fn auth_config() -> AuthConfig {
        AuthConfig::builder()
            .jwt_secret("0123456789abcdef0123456789abcdef")
            .password_hash(PasswordHashConfig {
                memory_kib: 256,
                iterations: 1,
                parallelism: 1,
            })
            .build()
    }

    #[test]
    fn test_config_from_core() {
        let mut core = Config::default();
        core.server.port = 8080;
        core.server.login_attempts_per_minute = 3;
        core.storage.data_dir = Some(PathBuf::from("/tmp/portal"));

        let config = GatewayConfig::from_config(&core);
        assert_eq!(config.port, 8080);
        assert_eq!(config.login_attempts_per_minute, 3);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/portal"));
    }

    #[test]
    fn test_build_opens_sled_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = GatewayConfig {
            data_dir: temp_dir.path().join("data"),
            auth: auth_config(),
            ..GatewayConfig::default()
        };

        let gateway = GatewayBuilder::new().with_config(config).build().unwrap();
        assert!(temp_dir.path().join("data").join("credentials").exists());
        let _ = gateway.router();
    }

    #[test]
    fn test_build_without_secret_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config = GatewayConfig {
            data_dir: temp_dir.path().to_path_buf(),
            auth: AuthConfig::default(),
            ..GatewayConfig::default()
        };

        let result = GatewayBuilder::new().with_config(config).build();
        assert!(matches!(result, Err(GatewayError::Auth(_))));
    }
}
