//! Registration, login and account workflows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use trainportal_core::AuthConfig;

use crate::AuthError;
use crate::password::PasswordHasher;
use crate::roles::Role;
use crate::store::{CredentialStore, StoreError};
use crate::token::{Identity, TokenIssuer};
use crate::user::{NewUser, PublicUser, User, UserUpdate};
use crate::validation::{require_non_empty, require_valid_email};

/// Plaintext hashed once at construction so unknown-email logins still pay
/// for a full verification.
const TIMING_DUMMY_PASSWORD: &str = "trainportal-timing-dummy";

/// Successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    /// Authenticated user ID.
    pub subject: String,
    /// Role bound into the token.
    pub role: Role,
    /// Signed bearer token.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// The authenticated account.
    pub user: PublicUser,
}

/// Entry point for every account workflow.
///
/// The credential store is the shared resource and isolates each write.
/// Operations that could remove the last admin are additionally serialized
/// through `admin_changes` so the admin count they check cannot go stale.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    dummy_digest: String,
    admin_changes: Mutex<()>,
}

impl AuthService {
    /// Wire a service from its parts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the timing dummy cannot be hashed.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
    ) -> Result<Self, AuthError> {
        let dummy_digest = hasher.hash(TIMING_DUMMY_PASSWORD)?;
        Ok(Self {
            store,
            hasher,
            tokens,
            dummy_digest,
            admin_changes: Mutex::new(()),
        })
    }

    /// Build a service from the auth configuration section.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if no signing secret is configured or the
    /// hashing cost or validity window is rejected.
    pub fn from_config(
        store: Arc<dyn CredentialStore>,
        config: &AuthConfig,
    ) -> Result<Self, AuthError> {
        let secret = config.signing_secret().ok_or_else(|| {
            AuthError::Config(
                "No token signing secret configured (set auth.jwtSecret or TRAINPORTAL_JWT_SECRET)"
                    .to_string(),
            )
        })?;
        let hasher = PasswordHasher::new(config.password_hash)?;
        let tokens = TokenIssuer::new(&secret, config.token_validity())?;
        Self::new(store, hasher, tokens)
    }

    /// The token issuer in use.
    #[must_use]
    pub const fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Number of stored users.
    ///
    /// # Errors
    ///
    /// Returns a store error if the backend fails.
    pub async fn user_count(&self) -> Result<usize, AuthError> {
        Ok(self.store.count().await?)
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for missing fields, a malformed email or a
    /// non-assignable role; `Conflict` if the email is taken.
    pub async fn register(&self, input: NewUser) -> Result<User, AuthError> {
        require_non_empty(&[
            ("name", input.name.as_str()),
            ("email", input.email.as_str()),
            ("password", input.password.as_str()),
        ])?;
        require_valid_email(&input.email)?;
        require_assignable(input.role)?;

        if self.store.find_by_email(&input.email).await?.is_some() {
            return Err(email_taken());
        }

        let password_hash = self.hash_password(&input.password).await?;
        let user = User::new(input.name, input.email, password_hash, input.role);

        self.store.create(&user).await.map_err(from_store)?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Authenticate by email and password and issue a token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown email or a wrong password
    /// alike.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let user = if email.is_empty() {
            None
        } else {
            self.store.find_by_email(email).await?
        };

        let Some(user) = user else {
            let _ = self.verify_password(password, &self.dummy_digest).await;
            tracing::debug!("Login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        if password.is_empty() || !self.verify_password(password, &user.password_hash).await {
            tracing::debug!(user_id = %user.id, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.tokens.issue(&user.id, user.role)?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome {
            subject: user.id.clone(),
            role: user.role,
            token: issued.token,
            expires_at: issued.expires_at,
            user: user.to_public(),
        })
    }

    /// Fetch a user by id.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty id and `NotFound` if absent.
    pub async fn get_user(&self, id: &str) -> Result<User, AuthError> {
        require_non_empty(&[("id", id)])?;
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| user_not_found(id))
    }

    /// All users, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the backend fails.
    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.store.list().await?)
    }

    /// Apply a partial profile update. The password hash is never touched.
    ///
    /// Only the fields set in `update` are written, so a concurrent password
    /// change is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for empty or malformed fields, `Conflict` if the
    /// new email belongs to someone else or the change would demote the last
    /// admin, and `NotFound` if absent.
    pub async fn update_user(&self, id: &str, update: UserUpdate) -> Result<User, AuthError> {
        require_non_empty(&[("id", id)])?;

        if let Some(name) = &update.name {
            require_non_empty(&[("name", name.as_str())])?;
        }
        if let Some(email) = &update.email {
            require_non_empty(&[("email", email.as_str())])?;
            require_valid_email(email)?;
        }
        if let Some(role) = update.role {
            require_assignable(role)?;
        }

        let user = if update.role.is_some_and(|role| !role.is_admin()) {
            let _guard = self.admin_changes.lock().await;
            self.ensure_not_last_admin(id).await?;
            self.apply_update(id, &update).await?
        } else {
            self.apply_update(id, &update).await?
        };

        tracing::info!(user_id = %user.id, "User updated");
        Ok(user)
    }

    /// Replace a user's password without checking the current one. Tokens
    /// issued earlier stay valid.
    ///
    /// For administrative resets; account owners go through
    /// [`AuthService::change_password`].
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty id or password and `NotFound` if
    /// absent.
    pub async fn update_password(&self, id: &str, new_password: &str) -> Result<(), AuthError> {
        require_non_empty(&[("id", id), ("password", new_password)])?;

        let user = self.get_user(id).await?;
        self.store_password(&user.id, new_password).await?;

        tracing::info!(user_id = %user.id, "Password updated");
        Ok(())
    }

    /// Replace a user's password after proving knowledge of the current one.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for empty input, `NotFound` if absent, and
    /// `InvalidCredentials` if `current_password` does not match.
    pub async fn change_password(
        &self,
        id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        require_non_empty(&[
            ("id", id),
            ("current_password", current_password),
            ("password", new_password),
        ])?;

        let user = self.get_user(id).await?;
        if !self.verify_password(current_password, &user.password_hash).await {
            tracing::debug!(user_id = %user.id, "Password change rejected");
            return Err(AuthError::InvalidCredentials);
        }

        self.store_password(&user.id, new_password).await?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty id, `NotFound` if absent, and
    /// `Conflict` if the user is the last admin.
    pub async fn delete_user(&self, id: &str) -> Result<(), AuthError> {
        require_non_empty(&[("id", id)])?;

        let _guard = self.admin_changes.lock().await;
        self.ensure_not_last_admin(id).await?;

        if !self.store.delete(id).await? {
            return Err(user_not_found(id));
        }

        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Resolve a bearer token to the identity it carries.
    ///
    /// Stateless: the store is not consulted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` for any verification failure.
    pub fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens.verify(token)
    }

    async fn apply_update(&self, id: &str, update: &UserUpdate) -> Result<User, AuthError> {
        self.store
            .update_profile(id, update)
            .await
            .map_err(from_store)?
            .ok_or_else(|| user_not_found(id))
    }

    async fn store_password(&self, id: &str, new_password: &str) -> Result<(), AuthError> {
        let password_hash = self.hash_password(new_password).await?;
        if self.store.set_password_hash(id, &password_hash).await? {
            Ok(())
        } else {
            Err(user_not_found(id))
        }
    }

    /// Fails if `id` is an admin and no other admin exists. Callers hold
    /// `admin_changes`.
    async fn ensure_not_last_admin(&self, id: &str) -> Result<(), AuthError> {
        let users = self.store.list().await?;
        let is_admin = users.iter().any(|u| u.id == id && u.role.is_admin());
        if !is_admin {
            return Ok(());
        }

        if users.iter().any(|u| u.id != id && u.role.is_admin()) {
            Ok(())
        } else {
            Err(AuthError::Conflict("cannot remove the last admin".to_string()))
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {e}")))?
    }

    async fn verify_password(&self, password: &str, digest: &str) -> bool {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let digest = digest.to_string();

        match tokio::task::spawn_blocking(move || hasher.verify(&password, &digest)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("hasher", &self.hasher)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

fn require_assignable(role: Role) -> Result<(), AuthError> {
    if role.is_assignable() {
        Ok(())
    } else {
        Err(AuthError::Validation(format!("role cannot be assigned: {role}")))
    }
}

fn email_taken() -> AuthError {
    AuthError::Conflict("email already registered".to_string())
}

fn user_not_found(id: &str) -> AuthError {
    AuthError::NotFound(format!("user {id}"))
}

/// A uniqueness race lost at the store is still a conflict.
fn from_store(err: StoreError) -> AuthError {
    match err {
        StoreError::DuplicateEmail(_) => email_taken(),
        other => AuthError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use trainportal_core::{PasswordHashConfig, SigningSecret};

    use super::*;
    use crate::store::MemoryCredentialStore;
    use async_trait::async_trait;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn service() -> AuthService {
        service_with(Arc::new(MemoryCredentialStore::new()))
    }

    fn service_with(store: Arc<dyn CredentialStore>) -> AuthService {
        let hasher = PasswordHasher::new(PasswordHashConfig {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let tokens =
            TokenIssuer::new(&SigningSecret::from(SECRET), Duration::from_secs(72 * 3600)).unwrap();
        AuthService::new(store, hasher, tokens).unwrap()
    }

    /// Memory store that yields to the scheduler before every id lookup, so
    /// read-then-write workflows interleave.
    struct YieldingStore(MemoryCredentialStore);

    #[async_trait]
    impl CredentialStore for YieldingStore {
        async fn create(&self, user: &User) -> Result<(), StoreError> {
            self.0.create(user).await
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            self.0.find_by_id(id).await
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            self.0.find_by_email(email).await
        }

        async fn update_profile(
            &self,
            id: &str,
            update: &UserUpdate,
        ) -> Result<Option<User>, StoreError> {
            self.0.update_profile(id, update).await
        }

        async fn set_password_hash(
            &self,
            id: &str,
            password_hash: &str,
        ) -> Result<bool, StoreError> {
            self.0.set_password_hash(id, password_hash).await
        }

        async fn delete(&self, id: &str) -> Result<bool, StoreError> {
            self.0.delete(id).await
        }

        async fn list(&self) -> Result<Vec<User>, StoreError> {
            self.0.list().await
        }
    }

    fn new_user(name: &str, email: &str, password: &str, role: Role) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
        }
    }

    fn ann() -> NewUser {
        new_user("Ann", "ann@x.com", "secret1", Role::Employee)
    }

    #[tokio::test]
    async fn test_ann_scenario() {
        let service = service();

        let user = service.register(ann()).await.unwrap();
        assert_ne!(user.password_hash, "secret1");
        assert_eq!(user.role, Role::Employee);

        let outcome = service.login("ann@x.com", "secret1").await.unwrap();
        assert_eq!(outcome.subject, user.id);
        assert!(!outcome.token.is_empty());

        let wrong_password = service.login("ann@x.com", "wrong").await.unwrap_err();
        let unknown_email = service.login("nobody@x.com", "secret1").await.unwrap_err();
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_register_login_verify_round_trip() {
        let service = service();

        for (i, role) in Role::ASSIGNABLE.into_iter().enumerate() {
            let email = format!("user{i}@example.com");
            let user = service
                .register(new_user("User", &email, "pass-word", role))
                .await
                .unwrap();

            let outcome = service.login(&email, "pass-word").await.unwrap();
            let identity = service.verify_token(&outcome.token).unwrap();

            assert_eq!(identity.subject, user.id);
            assert_eq!(identity.role, role);
            assert_eq!(outcome.role, role);
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let service = service();
        service.register(ann()).await.unwrap();

        let err = service
            .register(new_user("Ann 2", "ann@x.com", "different", Role::Trainer))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));

        service
            .register(new_user("Ann 3", "Ann@x.com", "secret1", Role::Employee))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_validation() {
        let service = service();

        let cases = [
            new_user("", "ann@x.com", "secret1", Role::Employee),
            new_user("Ann", "", "secret1", Role::Employee),
            new_user("Ann", "ann@x.com", "", Role::Employee),
            new_user("Ann", "not-an-email", "secret1", Role::Employee),
            new_user("Ann", "ann@x.com", "secret1", Role::Manager),
            new_user("Ann", "ann@x.com", "secret1", Role::Guest),
        ];

        for input in cases {
            let err = service.register(input).await.unwrap_err();
            assert!(matches!(err, AuthError::Validation(_)), "{err}");
        }
        assert_eq!(service.user_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_user() {
        let service = service();
        let user = service.register(ann()).await.unwrap();

        assert_eq!(service.get_user(&user.id).await.unwrap(), user);
        assert!(matches!(
            service.get_user("user_missing").await,
            Err(AuthError::NotFound(_))
        ));
        assert!(matches!(
            service.get_user("").await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_user() {
        let service = service();
        let user = service.register(ann()).await.unwrap();
        service
            .register(new_user("Bob", "bob@x.com", "secret2", Role::Employee))
            .await
            .unwrap();

        let updated = service
            .update_user(
                &user.id,
                UserUpdate {
                    name: Some("Ann Smith".to_string()),
                    email: Some("ann.smith@x.com".to_string()),
                    role: Some(Role::Trainer),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ann Smith");
        assert_eq!(updated.email, "ann.smith@x.com");
        assert_eq!(updated.role, Role::Trainer);
        assert_eq!(updated.password_hash, user.password_hash);

        service.login("ann.smith@x.com", "secret1").await.unwrap();

        let taken = service
            .update_user(
                &user.id,
                UserUpdate {
                    email: Some("bob@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(taken, Err(AuthError::Conflict(_))));

        let reserved = service
            .update_user(
                &user.id,
                UserUpdate {
                    role: Some(Role::Manager),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(reserved, Err(AuthError::Validation(_))));

        let blank = service
            .update_user(
                &user.id,
                UserUpdate {
                    name: Some(String::new()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(blank, Err(AuthError::Validation(_))));

        let missing = service
            .update_user("user_missing", UserUpdate::default())
            .await;
        assert!(matches!(missing, Err(AuthError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_password_keeps_old_tokens() {
        let service = service();
        let user = service.register(ann()).await.unwrap();
        let before = service.login("ann@x.com", "secret1").await.unwrap();

        service.update_password(&user.id, "secret2").await.unwrap();

        assert!(matches!(
            service.login("ann@x.com", "secret1").await,
            Err(AuthError::InvalidCredentials)
        ));
        service.login("ann@x.com", "secret2").await.unwrap();
        assert_eq!(
            service.verify_token(&before.token).unwrap().subject,
            user.id
        );

        assert!(matches!(
            service.update_password(&user.id, "").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            service.update_password("user_missing", "secret3").await,
            Err(AuthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_profile_edit_keeps_new_password() {
        let service = service_with(Arc::new(YieldingStore(MemoryCredentialStore::new())));
        let user = service.register(ann()).await.unwrap();

        let rename = UserUpdate {
            name: Some("Ann Smith".to_string()),
            ..Default::default()
        };
        let (password, profile) = tokio::join!(
            service.update_password(&user.id, "new-pass"),
            service.update_user(&user.id, rename),
        );
        password.unwrap();
        profile.unwrap();

        let outcome = service.login("ann@x.com", "new-pass").await.unwrap();
        assert_eq!(outcome.user.name, "Ann Smith");
        assert!(matches!(
            service.login("ann@x.com", "secret1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let service = service();
        let user = service.register(ann()).await.unwrap();

        let err = service
            .change_password(&user.id, "wrong", "secret2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        service.login("ann@x.com", "secret1").await.unwrap();

        assert!(matches!(
            service.change_password(&user.id, "", "secret2").await,
            Err(AuthError::Validation(_))
        ));

        service
            .change_password(&user.id, "secret1", "secret2")
            .await
            .unwrap();
        service.login("ann@x.com", "secret2").await.unwrap();
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_removed() {
        let service = service();
        let root = service
            .register(new_user("Root", "root@x.com", "rootpass", Role::Admin))
            .await
            .unwrap();

        let demote = UserUpdate {
            role: Some(Role::Employee),
            ..Default::default()
        };
        assert!(matches!(
            service.update_user(&root.id, demote.clone()).await,
            Err(AuthError::Conflict(_))
        ));
        assert!(matches!(
            service.delete_user(&root.id).await,
            Err(AuthError::Conflict(_))
        ));
        assert_eq!(service.get_user(&root.id).await.unwrap().role, Role::Admin);

        let second = service
            .register(new_user("Sam", "sam@x.com", "sampass", Role::Admin))
            .await
            .unwrap();
        service.update_user(&root.id, demote).await.unwrap();
        assert!(matches!(
            service.delete_user(&second.id).await,
            Err(AuthError::Conflict(_))
        ));
        service.delete_user(&root.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_user() {
        let service = service();
        let user = service.register(ann()).await.unwrap();

        service.delete_user(&user.id).await.unwrap();
        assert!(matches!(
            service.delete_user(&user.id).await,
            Err(AuthError::NotFound(_))
        ));
        assert!(matches!(
            service.login("ann@x.com", "secret1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_list_users() {
        let service = service();
        let ann = service.register(ann()).await.unwrap();
        let bob = service
            .register(new_user("Bob", "bob@x.com", "secret2", Role::Trainer))
            .await
            .unwrap();

        let ids: Vec<String> = service
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&ann.id));
        assert!(ids.contains(&bob.id));
    }

    #[tokio::test]
    async fn test_verify_token_rejects_garbage() {
        let service = service();
        assert!(matches!(
            service.verify_token("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_from_config_requires_secret() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let config = AuthConfig::builder()
            .password_hash(PasswordHashConfig {
                memory_kib: 256,
                iterations: 1,
                parallelism: 1,
            })
            .build();

        assert!(matches!(
            AuthService::from_config(Arc::clone(&store), &config),
            Err(AuthError::Config(_))
        ));

        let config = AuthConfig::builder()
            .jwt_secret("")
            .password_hash(config.password_hash)
            .build();
        assert!(matches!(
            AuthService::from_config(Arc::clone(&store), &config),
            Err(AuthError::Config(_))
        ));

        let config = AuthConfig::builder()
            .jwt_secret(SECRET)
            .password_hash(config.password_hash)
            .build();
        assert!(AuthService::from_config(store, &config).is_ok());
    }
}
