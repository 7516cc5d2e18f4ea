//! Key provisioning: generate, wrap, store. Runs once per user.
//!
//! This step is NOT idempotent. Provisioning the same user twice replaces
//! their key and makes every note sealed under the old one unreadable.
//! Callers must guarantee at-most-once invocation per user; see
//! `users::register_user`.

use crate::error::Result;
use crate::keys::{self, MasterKey, UserKey};
use crate::store::{KeyValueStore, UserKeyStore};

/// Source of fresh user keys.
pub trait KeySource: Send + Sync {
    fn generate(&self) -> Result<UserKey>;
}

/// Production key source backed by the system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemKeySource;

impl KeySource for SystemKeySource {
    fn generate(&self) -> Result<UserKey> {
        UserKey::generate()
    }
}

/// Generate a user key, wrap it under `master`, and write it to `store`.
///
/// Any failure is returned unchanged so the surrounding user-creation
/// workflow can abort as a whole.
pub async fn provision_user_key<S, K>(
    master: &MasterKey,
    store: &UserKeyStore<S>,
    source: &K,
    user_id: &str,
) -> Result<()>
where
    S: KeyValueStore,
    K: KeySource + ?Sized,
{
    let raw = source.generate()?;
    let wrapped = keys::wrap_key(master, &raw)?;
    drop(raw);

    store.set(user_id, wrapped).await?;
    tracing::info!(user_id = %user_id, "user key provisioned");
    Ok(())
}
