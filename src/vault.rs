//! The vault: one owner for the master key, the stores, and the audit log.
//!
//! This is the surface the note CRUD layer calls. Each note operation
//! resolves the caller's key exactly once, uses it for the fields of that
//! one request, and drops it. No raw key outlives the call that resolved it.

use std::sync::{Mutex, MutexGuard};

use crate::audit::{AuditLog, AuditRecord, AuditSink, KeyEvent};
use crate::config::Config;
use crate::error::{NotevaultError, Result};
use crate::keys::{MasterKey, UserKey};
use crate::notes::{DecryptedNote, Note, NoteDraft, NoteId, NoteRepository};
use crate::provision::{KeySource, SystemKeySource};
use crate::retrieval;
use crate::store::{KeyValueStore, UserKeyStore};
use crate::users::{self, UserDirectory, UserRecord};

/// Owns the master key and the backends a notes service runs on.
///
/// Every note method returns generic errors for key and decryption failures
/// (`KeyUnavailable`, `NoteUnreadable`) and records the detail in the log
/// and the audit trail instead.
pub struct Vault<S, R, D> {
    master: MasterKey,
    keys: UserKeyStore<S>,
    notes: R,
    users: D,
    key_source: Box<dyn KeySource>,
    audit: Mutex<AuditLog>,
}

impl<S, R, D> Vault<S, R, D>
where
    S: KeyValueStore,
    R: NoteRepository,
    D: UserDirectory,
{
    /// Build a vault from loaded configuration and its three backends.
    pub fn new(config: Config, key_backend: S, notes: R, users: D) -> Self {
        let Config {
            master_key,
            key_namespace,
        } = config;
        Self {
            master: master_key,
            keys: UserKeyStore::with_namespace(key_backend, key_namespace),
            notes,
            users,
            key_source: Box::new(SystemKeySource),
            audit: Mutex::new(AuditLog::new()),
        }
    }

    /// Replace the source of fresh user keys.
    pub fn with_key_source(mut self, source: Box<dyn KeySource>) -> Self {
        self.key_source = source;
        self
    }

    /// Keep at most `retention` audit records in memory. Records already
    /// held are discarded; forward sinks are unaffected.
    pub fn with_audit_retention(self, retention: usize) -> Self {
        let mut log = AuditLog::with_retention(retention);
        let old = self.audit.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        for sink in old.into_sinks() {
            log.add_forward_sink(sink);
        }
        Self {
            audit: Mutex::new(log),
            ..self
        }
    }

    pub fn add_audit_sink(&self, sink: Box<dyn AuditSink>) {
        self.audit().add_forward_sink(sink);
    }

    /// A snapshot of every audit record so far.
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit().iter().cloned().collect()
    }

    pub fn key_store(&self) -> &UserKeyStore<S> {
        &self.keys
    }

    pub fn note_repository(&self) -> &R {
        &self.notes
    }

    fn audit(&self) -> MutexGuard<'_, AuditLog> {
        // A panic mid-append leaves the log intact; keep using it.
        self.audit.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -----------------------------------------------------------------------
    // Users and keys
    // -----------------------------------------------------------------------

    /// Create a user and provision their key. Nothing is created if either
    /// step fails.
    pub async fn register_user(&self, user: UserRecord) -> Result<UserRecord> {
        let user = users::register_user(
            &self.master,
            &self.users,
            &self.keys,
            self.key_source.as_ref(),
            user,
        )
        .await?;
        self.audit()
            .append(AuditRecord::now(user.id.as_str(), KeyEvent::Provisioned));
        Ok(user)
    }

    /// Resolve a user's key for one request. Failures are logged, audited,
    /// and collapsed to `None`.
    pub async fn resolve_user_key(&self, user_id: &str) -> Option<UserKey> {
        match retrieval::try_resolve_user_key(&self.master, &self.keys, user_id).await {
            Ok(key) => Some(key),
            Err(e) => {
                retrieval::log_resolution_failure(user_id, &e);
                let event = match &e {
                    NotevaultError::KeyNotProvisioned(_) => Some(KeyEvent::Missing),
                    e if e.is_crypto_rejection() => Some(KeyEvent::Rejected),
                    _ => None,
                };
                if let Some(event) = event {
                    self.audit().append(AuditRecord::now(user_id, event));
                }
                None
            }
        }
    }

    async fn require_user_key(&self, user_id: &str) -> Result<UserKey> {
        self.resolve_user_key(user_id)
            .await
            .ok_or(NotevaultError::KeyUnavailable)
    }

    // -----------------------------------------------------------------------
    // Notes
    // -----------------------------------------------------------------------

    /// Every note the user owns, newest first, decrypted.
    pub async fn list_notes(&self, user_id: &str) -> Result<Vec<DecryptedNote>> {
        let key = self.require_user_key(user_id).await?;
        let notes = self.notes.list(user_id).await?;
        notes
            .iter()
            .map(|note| self.open_note(user_id, note, &key))
            .collect()
    }

    pub async fn get_note(&self, user_id: &str, id: NoteId) -> Result<DecryptedNote> {
        let key = self.require_user_key(user_id).await?;
        let note = self
            .notes
            .get(user_id, id)
            .await?
            .ok_or(NotevaultError::NoteNotFound)?;
        self.open_note(user_id, &note, &key)
    }

    pub async fn create_note(&self, user_id: &str, draft: &NoteDraft) -> Result<DecryptedNote> {
        let key = self.require_user_key(user_id).await?;
        let sealed = draft.seal(&key)?;
        let note = self.notes.insert(user_id, sealed).await?;
        tracing::debug!(user_id = %user_id, note_id = %note.id, "note created");
        self.open_note(user_id, &note, &key)
    }

    pub async fn update_note(
        &self,
        user_id: &str,
        id: NoteId,
        draft: &NoteDraft,
    ) -> Result<DecryptedNote> {
        let key = self.require_user_key(user_id).await?;
        let sealed = draft.seal(&key)?;
        let note = self
            .notes
            .update(user_id, id, sealed)
            .await?
            .ok_or(NotevaultError::NoteNotFound)?;
        tracing::debug!(user_id = %user_id, note_id = %id, "note updated");
        self.open_note(user_id, &note, &key)
    }

    /// Open a stored note, collapsing a ciphertext rejection to
    /// `NoteUnreadable` after logging and auditing it.
    fn open_note(&self, user_id: &str, note: &Note, key: &UserKey) -> Result<DecryptedNote> {
        note.open(key).map_err(|e| {
            if !e.is_crypto_rejection() {
                return e;
            }
            tracing::error!(user_id = %user_id, note_id = %note.id, error = %e, "stored note failed to open");
            self.audit()
                .append(AuditRecord::now(user_id, KeyEvent::Rejected));
            NotevaultError::NoteUnreadable
        })
    }

    /// Deleting needs no key: nothing is decrypted.
    pub async fn delete_note(&self, user_id: &str, id: NoteId) -> Result<()> {
        if self.notes.delete(user_id, id).await? {
            tracing::debug!(user_id = %user_id, note_id = %id, "note deleted");
            Ok(())
        } else {
            Err(NotevaultError::NoteNotFound)
        }
    }
}
