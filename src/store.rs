//! User-key persistence.
//!
//! `KeyValueStore` is the seam to whatever backing store holds wrapped keys
//! (Redis, a KV service, a table). `UserKeyStore` puts a fixed namespace in
//! front of every key so wrapped user keys never collide with other data in
//! the same store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::DEFAULT_KEY_NAMESPACE;
use crate::error::Result;
use crate::keys::WrappedUserKey;

/// A string key-value backend. A single `get`/`set` is assumed atomic; no
/// multi-key transactions are required.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Last write wins.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Returns true if something was removed.
    async fn remove(&self, key: &str) -> Result<bool>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key).await
    }
}

/// In-process backend. Useful for tests and single-node deployments.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Every stored key, unordered. Lets tests inspect namespacing.
    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

/// Namespaced view of a `KeyValueStore` mapping user id to wrapped key.
#[derive(Debug)]
pub struct UserKeyStore<S> {
    backend: S,
    namespace: String,
}

impl<S: KeyValueStore> UserKeyStore<S> {
    /// Use the default `userkeys:` namespace.
    pub fn new(backend: S) -> Self {
        Self::with_namespace(backend, DEFAULT_KEY_NAMESPACE)
    }

    pub fn with_namespace(backend: S, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    fn storage_key(&self, user_id: &str) -> String {
        format!("{}{}", self.namespace, user_id)
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<WrappedUserKey>> {
        let value = self.backend.get(&self.storage_key(user_id)).await?;
        Ok(value.map(WrappedUserKey::new))
    }

    pub async fn set(&self, user_id: &str, wrapped: WrappedUserKey) -> Result<()> {
        self.backend
            .set(&self.storage_key(user_id), wrapped.into_string())
            .await
    }

    /// Dropping a user's wrapped key makes every note they own undecryptable.
    pub async fn remove(&self, user_id: &str) -> Result<bool> {
        self.backend.remove(&self.storage_key(user_id)).await
    }
}
