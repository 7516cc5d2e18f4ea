//! User registration.
//!
//! Creating a user and provisioning their key are one unit of work. The user
//! record goes in first (the directory rejects duplicate ids, which is what
//! keeps provisioning single-fire), then the key is provisioned. If
//! provisioning fails the record is removed again, so no user ever exists
//! without a key.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{NotevaultError, Result};
use crate::keys::MasterKey;
use crate::provision::{self, KeySource};
use crate::store::{KeyValueStore, UserKeyStore};

/// The application's record of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserRecord {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
        }
    }
}

/// Where user records live.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Insert a new user. Fails with `UserAlreadyExists` if the id is taken.
    async fn insert(&self, user: UserRecord) -> Result<()>;

    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>>;

    /// Returns true if a record was removed.
    async fn remove(&self, user_id: &str) -> Result<bool>;
}

#[async_trait]
impl<T: UserDirectory + ?Sized> UserDirectory for Arc<T> {
    async fn insert(&self, user: UserRecord) -> Result<()> {
        (**self).insert(user).await
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>> {
        (**self).get(user_id).await
    }

    async fn remove(&self, user_id: &str) -> Result<bool> {
        (**self).remove(user_id).await
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn insert(&self, user: UserRecord) -> Result<()> {
        let mut guard = self.users.write().await;
        if guard.contains_key(&user.id) {
            return Err(NotevaultError::UserAlreadyExists(user.id));
        }
        guard.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn remove(&self, user_id: &str) -> Result<bool> {
        Ok(self.users.write().await.remove(user_id).is_some())
    }
}

/// Create a user and provision their key, or neither.
pub async fn register_user<D, S, K>(
    master: &MasterKey,
    directory: &D,
    keys: &UserKeyStore<S>,
    source: &K,
    user: UserRecord,
) -> Result<UserRecord>
where
    D: UserDirectory + ?Sized,
    S: KeyValueStore,
    K: KeySource + ?Sized,
{
    if user.id.is_empty() {
        return Err(NotevaultError::Validation("user id is required".to_string()));
    }

    directory.insert(user.clone()).await?;

    if let Err(e) = provision::provision_user_key(master, keys, source, &user.id).await {
        tracing::error!(user_id = %user.id, error = %e, "failed to provision user key, rolling back user");
        if let Err(rollback) = directory.remove(&user.id).await {
            tracing::error!(user_id = %user.id, error = %rollback, "rollback of user record failed");
        }
        return Err(e);
    }

    tracing::info!(user_id = %user.id, "user registered");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::SystemKeySource;
    use crate::store::MemoryKeyValueStore;

    #[tokio::test]
    async fn test_duplicate_registration_rejected_without_reprovisioning() {
        let master = MasterKey::from_bytes([1u8; 32]);
        let directory = MemoryUserDirectory::new();
        let keys = UserKeyStore::new(MemoryKeyValueStore::new());

        register_user(&master, &directory, &keys, &SystemKeySource, UserRecord::new("u1", "a@x"))
            .await
            .unwrap();
        let before = keys.get("u1").await.unwrap();

        let again =
            register_user(&master, &directory, &keys, &SystemKeySource, UserRecord::new("u1", "a@x"))
                .await;
        assert!(matches!(again, Err(NotevaultError::UserAlreadyExists(_))));
        assert_eq!(keys.get("u1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_empty_id_rejected() {
        let master = MasterKey::from_bytes([1u8; 32]);
        let directory = MemoryUserDirectory::new();
        let keys = UserKeyStore::new(MemoryKeyValueStore::new());

        let result =
            register_user(&master, &directory, &keys, &SystemKeySource, UserRecord::new("", "a@x"))
                .await;
        assert!(matches!(result, Err(NotevaultError::Validation(_))));
    }
}
