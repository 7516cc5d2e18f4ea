//! Key retrieval: fetch the wrapped key and unwrap it for one request.

use crate::error::{NotevaultError, Result};
use crate::keys::{self, MasterKey, UserKey};
use crate::store::{KeyValueStore, UserKeyStore};

/// Resolve a user's raw key, returning the typed failure.
pub async fn try_resolve_user_key<S: KeyValueStore>(
    master: &MasterKey,
    store: &UserKeyStore<S>,
    user_id: &str,
) -> Result<UserKey> {
    let wrapped = store
        .get(user_id)
        .await?
        .ok_or_else(|| NotevaultError::KeyNotProvisioned(user_id.to_string()))?;
    keys::unwrap_key(master, &wrapped)
}

/// Resolve a user's raw key, or `None` if it cannot be used.
///
/// Every failure is logged here and collapsed to `None`, so callers respond
/// with one generic error and never pass crypto detail to the request
/// boundary. A `None` is a server-side fault, not a client one.
pub async fn resolve_user_key<S: KeyValueStore>(
    master: &MasterKey,
    store: &UserKeyStore<S>,
    user_id: &str,
) -> Option<UserKey> {
    match try_resolve_user_key(master, store, user_id).await {
        Ok(key) => Some(key),
        Err(e) => {
            log_resolution_failure(user_id, &e);
            None
        }
    }
}

pub(crate) fn log_resolution_failure(user_id: &str, error: &NotevaultError) {
    match error {
        NotevaultError::KeyNotProvisioned(_) => {
            tracing::error!(user_id = %user_id, "encryption key not found for user");
        }
        e if e.is_crypto_rejection() => {
            tracing::error!(user_id = %user_id, error = %e, "failed to unwrap user key");
        }
        e => {
            tracing::error!(user_id = %user_id, error = %e, "user key lookup failed");
        }
    }
}
