//! Offline user administration against the local credential store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use trainportal_auth::{
    AuthService, CredentialStore, NewUser, PasswordHasher, Role, SledCredentialStore, TokenIssuer,
    User, generate_password,
};
use trainportal_core::{Config, SigningSecret};

use crate::ui;

const GENERATED_PASSWORD_LEN: usize = 16;

/// Arguments for admin commands.
pub struct AdminArgs {
    /// The admin action to perform.
    pub action: AdminAction,
    /// Data directory override.
    pub data_dir: Option<PathBuf>,
}

/// Admin actions.
pub enum AdminAction {
    /// Create a new user.
    Create {
        email: String,
        name: String,
        password: Option<String>,
        role: String,
        generate_password: bool,
    },
    /// List all users.
    List,
    /// Reset a user's password to a generated one.
    ResetPassword { email: String },
    /// Delete a user.
    Delete { email: String, yes: bool },
}

/// Run the admin command.
///
/// # Errors
///
/// Returns error if the operation fails.
pub async fn run_admin(args: AdminArgs, config: &Config) -> Result<()> {
    let data_dir = args.data_dir.unwrap_or_else(|| config.data_dir());
    std::fs::create_dir_all(&data_dir)?;
    tracing::debug!(data_dir = %data_dir.display(), "Opening credential store");

    let store: Arc<dyn CredentialStore> = Arc::new(
        SledCredentialStore::open(&data_dir).context("Failed to open credential store")?,
    );
    let service = offline_service(Arc::clone(&store), config)?;

    match args.action {
        AdminAction::Create {
            email,
            name,
            password,
            role,
            generate_password: gen_pwd,
        } => create_user(&service, email, name, password, &role, gen_pwd).await,
        AdminAction::List => list_users(&service).await,
        AdminAction::ResetPassword { email } => reset_password(&service, &*store, &email).await,
        AdminAction::Delete { email, yes } => delete_user(&service, &*store, &email, yes).await,
    }
}

/// The CLI never issues tokens, so the service gets a throwaway signing key
/// and works even before a secret is configured.
fn offline_service(store: Arc<dyn CredentialStore>, config: &Config) -> Result<AuthService> {
    let hasher = PasswordHasher::new(config.auth.password_hash)?;
    let tokens = TokenIssuer::new(
        &SigningSecret::new(TokenIssuer::generate_hex_secret()),
        config.auth.token_validity(),
    )?;
    Ok(AuthService::new(store, hasher, tokens)?)
}

async fn find_by_email(store: &dyn CredentialStore, email: &str) -> Result<User> {
    store
        .find_by_email(email)
        .await
        .context("Failed to find user")?
        .ok_or_else(|| anyhow::anyhow!("User not found: {email}"))
}

async fn create_user(
    service: &AuthService,
    email: String,
    name: String,
    password: Option<String>,
    role: &str,
    gen_pwd: bool,
) -> Result<()> {
    let role: Role = role
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid role: {role}. Use: employee, trainer, or admin"))?;

    let password = match password {
        Some(password) => password,
        None if gen_pwd => {
            let pwd = generate_password(GENERATED_PASSWORD_LEN);
            ui::success(&format!("Generated password: {pwd}"));
            pwd
        }
        None => ui::prompts::new_password("Password")?,
    };

    let user = service
        .register(NewUser {
            name,
            email,
            password,
            role,
        })
        .await
        .context("Failed to create user")?;

    ui::success(&format!(
        "Created user '{}' with role '{}'",
        user.email, user.role
    ));
    ui::kv("ID", &user.id);

    Ok(())
}

async fn list_users(service: &AuthService) -> Result<()> {
    let users = service.list_users().await.context("Failed to list users")?;

    if users.is_empty() {
        ui::info("No users configured.");
        ui::info(
            "Run 'trainportal admin create --email admin@example.com --role admin --generate-password'",
        );
        return Ok(());
    }

    ui::info(&format!("Users ({}):", users.len()));
    println!();
    println!(
        "{:<30} {:<20} {:<10} {:<20}",
        "EMAIL", "NAME", "ROLE", "CREATED"
    );
    println!("{}", "-".repeat(82));

    for user in users {
        let created = user.created_at.format("%Y-%m-%d %H:%M:%S");
        println!(
            "{:<30} {:<20} {:<10} {:<20}",
            user.email, user.name, user.role, created
        );
    }

    Ok(())
}

async fn reset_password(
    service: &AuthService,
    store: &dyn CredentialStore,
    email: &str,
) -> Result<()> {
    let user = find_by_email(store, email).await?;
    let new_password = generate_password(GENERATED_PASSWORD_LEN);

    service
        .update_password(&user.id, &new_password)
        .await
        .context("Failed to update password")?;

    ui::success(&format!("Password reset for user '{email}'"));
    ui::success(&format!("New password: {new_password}"));
    ui::warning("Tokens issued before the reset stay valid until they expire");

    Ok(())
}

async fn delete_user(
    service: &AuthService,
    store: &dyn CredentialStore,
    email: &str,
    yes: bool,
) -> Result<()> {
    let user = find_by_email(store, email).await?;

    if !yes && !ui::prompts::confirm(&format!("Delete user '{email}'?"))? {
        ui::info("Cancelled");
        return Ok(());
    }

    service
        .delete_user(&user.id)
        .await
        .context("Failed to delete user")?;

    ui::success(&format!("Deleted user '{email}'"));

    Ok(())
}
