//! Embedded credential store backed by sled.

use std::path::Path;

use async_trait::async_trait;
use sled::Transactional;
use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree, abort,
};

use super::{CredentialStore, StoreError};
use crate::user::{User, UserUpdate};

const USERS_TREE: &str = "users";
const EMAIL_INDEX_TREE: &str = "user_emails";

type TxResult<T> = Result<T, ConflictableTransactionError<StoreError>>;

/// User store backed by sled.
///
/// Records live in the `users` tree keyed by id; the `user_emails` tree maps
/// email to id. Every mutation touches both trees inside one sled
/// transaction, so a record and its index entry never disagree and two
/// concurrent claims on one address cannot both succeed.
pub struct SledCredentialStore {
    db: sled::Db,
    users: sled::Tree,
    emails: sled::Tree,
}

impl SledCredentialStore {
    /// Open or create a store under `path/credentials`.
    ///
    /// # Errors
    ///
    /// Returns error if database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = sled::open(path.join("credentials"))
            .map_err(|e| StoreError::Backend(format!("Failed to open credential database: {e}")))?;
        Self::with_db(db)
    }

    /// Create a store on an existing sled database.
    ///
    /// # Errors
    ///
    /// Returns error if the trees cannot be opened.
    pub fn with_db(db: sled::Db) -> Result<Self, StoreError> {
        let users = db
            .open_tree(USERS_TREE)
            .map_err(|e| StoreError::Backend(format!("Failed to open users tree: {e}")))?;
        let emails = db
            .open_tree(EMAIL_INDEX_TREE)
            .map_err(|e| StoreError::Backend(format!("Failed to open email index: {e}")))?;

        Ok(Self { db, users, emails })
    }

    /// Get the underlying sled database.
    #[must_use]
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn get(&self, id: &str) -> Result<Option<User>, StoreError> {
        match self.users.get(id.as_bytes()) {
            Ok(Some(value)) => decode(&value).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Backend(format!("Get error: {e}"))),
        }
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush_async()
            .await
            .map_err(|e| StoreError::Backend(format!("Flush error: {e}")))?;
        Ok(())
    }
}

impl std::fmt::Debug for SledCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledCredentialStore")
            .field("users", &self.users.len())
            .finish_non_exhaustive()
    }
}

fn encode(user: &User) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(user).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode(value: &[u8]) -> Result<User, StoreError> {
    serde_json::from_slice(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn tx_get(users: &TransactionalTree, id: &str) -> TxResult<Option<User>> {
    users
        .get(id.as_bytes())?
        .map(|value| decode(&value))
        .transpose()
        .map_err(ConflictableTransactionError::Abort)
}

fn tx_put(users: &TransactionalTree, user: &User) -> TxResult<()> {
    let value = encode(user).map_err(ConflictableTransactionError::Abort)?;
    users.insert(user.id.as_bytes(), value)?;
    Ok(())
}

fn from_tx(err: TransactionError<StoreError>) -> StoreError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => StoreError::Backend(format!("Transaction error: {e}")),
    }
}

#[async_trait]
impl CredentialStore for SledCredentialStore {
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        (&self.users, &self.emails)
            .transaction(|(users, emails)| {
                if emails.get(user.email.as_bytes())?.is_some() {
                    return abort(StoreError::DuplicateEmail(user.email.clone()));
                }
                if users.get(user.id.as_bytes())?.is_some() {
                    return abort(StoreError::Backend(format!("duplicate id: {}", user.id)));
                }

                emails.insert(user.email.as_bytes(), user.id.as_bytes())?;
                tx_put(users, user)
            })
            .map_err(from_tx)?;

        self.flush().await?;
        tracing::debug!(user_id = %user.id, "User record created");
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.get(id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        match self.emails.get(email.as_bytes()) {
            Ok(Some(id_bytes)) => {
                let id = String::from_utf8_lossy(&id_bytes);
                self.get(&id)
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Backend(format!("Index lookup error: {e}"))),
        }
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &UserUpdate,
    ) -> Result<Option<User>, StoreError> {
        let updated = (&self.users, &self.emails)
            .transaction(|(users, emails)| {
                let Some(mut user) = tx_get(users, id)? else {
                    return Ok(None);
                };
                let previous_email = user.email.clone();
                user.apply(update);

                if user.email != previous_email {
                    if emails.get(user.email.as_bytes())?.is_some() {
                        return abort(StoreError::DuplicateEmail(user.email.clone()));
                    }
                    emails.remove(previous_email.as_bytes())?;
                    emails.insert(user.email.as_bytes(), user.id.as_bytes())?;
                }

                tx_put(users, &user)?;
                Ok(Some(user))
            })
            .map_err(from_tx)?;

        if updated.is_some() {
            self.flush().await?;
        }
        Ok(updated)
    }

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<bool, StoreError> {
        let updated = self
            .users
            .transaction(|users| {
                let Some(mut user) = tx_get(users, id)? else {
                    return Ok(false);
                };
                password_hash.clone_into(&mut user.password_hash);
                tx_put(users, &user)?;
                Ok(true)
            })
            .map_err(from_tx)?;

        if updated {
            self.flush().await?;
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let deleted = (&self.users, &self.emails)
            .transaction(|(users, emails)| {
                let Some(value) = users.remove(id.as_bytes())? else {
                    return Ok(false);
                };
                let user = decode(&value).map_err(ConflictableTransactionError::Abort)?;

                let owned = emails
                    .get(user.email.as_bytes())?
                    .is_some_and(|owner| *owner == *id.as_bytes());
                if owned {
                    emails.remove(user.email.as_bytes())?;
                }
                Ok(true)
            })
            .map_err(from_tx)?;

        if deleted {
            self.flush().await?;
        }
        Ok(deleted)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users = Vec::new();

        for result in &self.users {
            let (_, value) = result.map_err(|e| StoreError::Backend(format!("Iter error: {e}")))?;
            users.push(decode(&value)?);
        }

        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.users.len())
    }
}
