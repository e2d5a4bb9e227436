//! Credential store contract and backends.
//!
//! The auth service only talks to [`CredentialStore`]; any backend that can
//! keep user records keyed by id with a unique email index can implement it.

mod memory;
mod sled_store;

pub use memory::MemoryCredentialStore;
pub use sled_store::SledCredentialStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::user::{User, UserUpdate};

/// Storage failures. "Not found" is never an error: lookups return `None`
/// and mutations return `false`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend I/O or engine failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// Record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Another record already owns this email.
    #[error("email already registered: {0}")]
    DuplicateEmail(String),
}

/// Durable mapping from user id to user record.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEmail` if the email is taken, or a backend error.
    async fn create(&self, user: &User) -> Result<(), StoreError>;

    /// Look up a user by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Look up a user by exact email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Apply the fields set in `update` to one record as a single atomic
    /// step, leaving every other field as currently stored. Returns the
    /// updated record, or `None` if no such id exists.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEmail` if the record moves to an email owned by
    /// another user.
    async fn update_profile(
        &self,
        id: &str,
        update: &UserUpdate,
    ) -> Result<Option<User>, StoreError>;

    /// Replace only the password hash. Returns `false` if no such id exists.
    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<bool, StoreError>;

    /// Delete a user. Returns `false` if no such id exists.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// All users.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Number of users.
    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.list().await?.len())
    }
}
