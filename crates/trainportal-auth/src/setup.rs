//! First-run admin provisioning.
//!
//! Public registration only ever creates employees, so the first admin comes
//! from the environment (or from `trainportal admin create`).

use rand::RngCore;

use crate::roles::Role;
use crate::service::AuthService;
use crate::user::{NewUser, User};
use crate::AuthError;

const DEFAULT_ADMIN_NAME: &str = "Administrator";

/// Create an admin from `TRAINPORTAL_ADMIN_*` env vars if no users exist.
///
/// # Errors
///
/// Returns error if user creation fails.
pub async fn bootstrap_admin_from_env(service: &AuthService) -> Result<Option<User>, AuthError> {
    bootstrap_admin(service, |key| std::env::var(key).ok()).await
}

/// Create an admin from `TRAINPORTAL_ADMIN_EMAIL`, `TRAINPORTAL_ADMIN_PASSWORD`
/// and optionally `TRAINPORTAL_ADMIN_NAME`, resolved through `lookup`.
///
/// Does nothing once any user exists or when email or password is unset.
///
/// # Errors
///
/// Returns error if user creation fails.
pub async fn bootstrap_admin<F>(service: &AuthService, lookup: F) -> Result<Option<User>, AuthError>
where
    F: Fn(&str) -> Option<String>,
{
    if service.user_count().await? > 0 {
        return Ok(None);
    }

    let Some(email) = lookup("TRAINPORTAL_ADMIN_EMAIL").filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    let Some(password) = lookup("TRAINPORTAL_ADMIN_PASSWORD").filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    let name = lookup("TRAINPORTAL_ADMIN_NAME")
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string());

    let admin = service
        .register(NewUser {
            name,
            email,
            password,
            role: Role::Admin,
        })
        .await?;

    tracing::info!(user_id = %admin.id, "Admin user created from environment variables");

    Ok(Some(admin))
}

/// Generate a secure random password.
#[must_use]
pub fn generate_password(length: usize) -> String {
    const CHARSET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = (rng.next_u32() as usize) % CHARSET.len();
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use trainportal_core::{PasswordHashConfig, SigningSecret};

    use super::*;
    use crate::password::PasswordHasher;
    use crate::store::MemoryCredentialStore;
    use crate::token::TokenIssuer;

    fn service() -> AuthService {
        let hasher = PasswordHasher::new(PasswordHashConfig {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let tokens = TokenIssuer::new(
            &SigningSecret::from("0123456789abcdef0123456789abcdef"),
            Duration::from_secs(3600),
        )
        .unwrap();
        AuthService::new(Arc::new(MemoryCredentialStore::new()), hasher, tokens).unwrap()
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[tokio::test]
    async fn test_bootstrap_creates_admin() {
        let service = service();
        let admin = bootstrap_admin(
            &service,
            env(&[
                ("TRAINPORTAL_ADMIN_EMAIL", "root@corp.io"),
                ("TRAINPORTAL_ADMIN_PASSWORD", "hunter22"),
            ]),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.name, DEFAULT_ADMIN_NAME);
        service.login("root@corp.io", "hunter22").await.unwrap();
    }

    #[tokio::test]
    async fn test_bootstrap_skipped_when_users_exist() {
        let service = service();
        service
            .register(NewUser {
                name: "Ann".to_string(),
                email: "ann@x.com".to_string(),
                password: "secret1".to_string(),
                role: Role::Employee,
            })
            .await
            .unwrap();

        let result = bootstrap_admin(
            &service,
            env(&[
                ("TRAINPORTAL_ADMIN_EMAIL", "root@corp.io"),
                ("TRAINPORTAL_ADMIN_PASSWORD", "hunter22"),
            ]),
        )
        .await
        .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_needs_both_vars() {
        let service = service();
        let result = bootstrap_admin(&service, env(&[("TRAINPORTAL_ADMIN_EMAIL", "root@corp.io")]))
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(service.user_count().await.unwrap(), 0);
    }

    #[test]
    fn test_generate_password() {
        let pwd1 = generate_password(16);
        let pwd2 = generate_password(16);

        assert_eq!(pwd1.len(), 16);
        assert_ne!(pwd1, pwd2);
    }
}
