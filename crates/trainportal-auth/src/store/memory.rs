//! In-memory credential store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CredentialStore, StoreError};
use crate::user::{User, UserUpdate};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    /// email -> id
    emails: HashMap<String, String>,
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Inner>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCredentialStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        if inner.emails.contains_key(&user.email) {
            return Err(StoreError::DuplicateEmail(user.email.clone()));
        }
        if inner.users.contains_key(&user.id) {
            return Err(StoreError::Backend(format!("duplicate id: {}", user.id)));
        }

        inner.emails.insert(user.email.clone(), user.id.clone());
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .emails
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &UserUpdate,
    ) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.write().await;

        let Some(mut user) = inner.users.get(id).cloned() else {
            return Ok(None);
        };
        let previous_email = user.email.clone();
        user.apply(update);

        if user.email != previous_email {
            if inner.emails.contains_key(&user.email) {
                return Err(StoreError::DuplicateEmail(user.email.clone()));
            }
            inner.emails.remove(&previous_email);
            inner.emails.insert(user.email.clone(), user.id.clone());
        }

        inner.users.insert(user.id.clone(), user.clone());
        Ok(Some(user))
    }

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.users.remove(id) {
            Some(user) => {
                inner.emails.remove(&user.email);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.inner.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().await.users.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;

    fn user(email: &str) -> User {
        User::new("Test", email, "hash".to_string(), Role::Employee)
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryCredentialStore::new();
        let ann = user("ann@x.com");
        store.create(&ann).await.unwrap();

        assert_eq!(store.find_by_id(&ann.id).await.unwrap(), Some(ann.clone()));
        assert_eq!(store.find_by_email("ann@x.com").await.unwrap(), Some(ann));
        assert_eq!(store.find_by_email("ANN@x.com").await.unwrap(), None);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = MemoryCredentialStore::new();
        store.create(&user("ann@x.com")).await.unwrap();

        let result = store.create(&user("ann@x.com")).await;
        assert!(matches!(result, Err(StoreError::DuplicateEmail(_))));
    }

    fn email_update(email: &str) -> UserUpdate {
        UserUpdate {
            email: Some(email.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_update_moves_email_index() {
        let store = MemoryCredentialStore::new();
        let ann = user("ann@x.com");
        store.create(&ann).await.unwrap();

        let moved = store
            .update_profile(&ann.id, &email_update("ann@y.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.email, "ann@y.com");
        assert_eq!(moved.password_hash, ann.password_hash);

        assert!(store.find_by_email("ann@x.com").await.unwrap().is_none());
        assert_eq!(store.find_by_email("ann@y.com").await.unwrap().unwrap().id, ann.id);
    }

    #[tokio::test]
    async fn test_update_to_taken_email() {
        let store = MemoryCredentialStore::new();
        let ann = user("ann@x.com");
        store.create(&ann).await.unwrap();
        store.create(&user("bob@x.com")).await.unwrap();

        assert!(matches!(
            store.update_profile(&ann.id, &email_update("bob@x.com")).await,
            Err(StoreError::DuplicateEmail(_))
        ));
        assert_eq!(store.find_by_email("ann@x.com").await.unwrap().unwrap().id, ann.id);
    }

    #[tokio::test]
    async fn test_set_password_hash_keeps_profile() {
        let store = MemoryCredentialStore::new();
        let ann = user("ann@x.com");
        store.create(&ann).await.unwrap();

        assert!(store.set_password_hash(&ann.id, "new-hash").await.unwrap());

        let stored = store.find_by_id(&ann.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert_eq!(stored.email, ann.email);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = MemoryCredentialStore::new();
        assert!(store
            .update_profile("user_missing", &email_update("ghost@x.com"))
            .await
            .unwrap()
            .is_none());
        assert!(!store.set_password_hash("user_missing", "hash").await.unwrap());
        assert!(!store.delete("user_missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_frees_email() {
        let store = MemoryCredentialStore::new();
        let ann = user("ann@x.com");
        store.create(&ann).await.unwrap();

        assert!(store.delete(&ann.id).await.unwrap());
        assert!(store.find_by_email("ann@x.com").await.unwrap().is_none());
        store.create(&user("ann@x.com")).await.unwrap();
    }
}
