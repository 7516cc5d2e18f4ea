//! Encrypted notes and their persistence seam.
//!
//! A stored `Note` only ever holds `EncryptedField`s. Every repository call
//! takes the owner's user id alongside the note id, and the in-memory
//! repository keys its map by both, so a query for another user's note has
//! nothing to match against.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{NotevaultError, Result};
use crate::field::{self, EncryptedField};
use crate::keys::UserKey;

pub type NoteId = Uuid;

/// A note as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub user_id: String,
    pub title: EncryptedField,
    pub content: Option<EncryptedField>,
    pub created_at: DateTime<Utc>,
}

/// A note as returned to the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedNote {
    pub id: NoteId,
    pub user_id: String,
    pub title: String,
    /// Empty when the note has no content.
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Caller input for creating or updating a note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: Option<&str>) -> Self {
        Self {
            title: title.into(),
            content: content.map(str::to_string),
        }
    }

    /// Encrypt the draft under `key`. The title is required; empty content
    /// is stored as no content at all.
    pub fn seal(&self, key: &UserKey) -> Result<SealedDraft> {
        if self.title.is_empty() {
            return Err(NotevaultError::Validation("title is required".to_string()));
        }

        let title = field::encrypt_field(&self.title, key)?;
        let content = match self.content.as_deref() {
            Some(text) if !text.is_empty() => Some(field::encrypt_field(text, key)?),
            _ => None,
        };
        Ok(SealedDraft { title, content })
    }
}

/// The encrypted fields of a draft, ready for the repository.
#[derive(Debug, Clone)]
pub struct SealedDraft {
    pub title: EncryptedField,
    pub content: Option<EncryptedField>,
}

impl Note {
    /// Decrypt both fields under `key`.
    pub fn open(&self, key: &UserKey) -> Result<DecryptedNote> {
        let title = field::decrypt_field(&self.title, key)?;
        let content = match &self.content {
            Some(blob) => field::decrypt_field(blob, key)?,
            None => String::new(),
        };

        Ok(DecryptedNote {
            id: self.id,
            user_id: self.user_id.clone(),
            title,
            content,
            created_at: self.created_at,
        })
    }
}

/// Note persistence. Every method is scoped by owner.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Store a new note for `user_id` and return it.
    async fn insert(&self, user_id: &str, sealed: SealedDraft) -> Result<Note>;

    /// All of a user's notes, newest first.
    async fn list(&self, user_id: &str) -> Result<Vec<Note>>;

    async fn get(&self, user_id: &str, id: NoteId) -> Result<Option<Note>>;

    /// Replace the fields of an existing note. `None` if the user owns no
    /// note with this id.
    async fn update(&self, user_id: &str, id: NoteId, sealed: SealedDraft) -> Result<Option<Note>>;

    /// Returns true if a note was removed.
    async fn delete(&self, user_id: &str, id: NoteId) -> Result<bool>;
}

#[async_trait]
impl<T: NoteRepository + ?Sized> NoteRepository for Arc<T> {
    async fn insert(&self, user_id: &str, sealed: SealedDraft) -> Result<Note> {
        (**self).insert(user_id, sealed).await
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Note>> {
        (**self).list(user_id).await
    }

    async fn get(&self, user_id: &str, id: NoteId) -> Result<Option<Note>> {
        (**self).get(user_id, id).await
    }

    async fn update(&self, user_id: &str, id: NoteId, sealed: SealedDraft) -> Result<Option<Note>> {
        (**self).update(user_id, id, sealed).await
    }

    async fn delete(&self, user_id: &str, id: NoteId) -> Result<bool> {
        (**self).delete(user_id, id).await
    }
}

/// In-process note repository keyed by `(user_id, note_id)`.
#[derive(Debug, Default)]
pub struct MemoryNoteRepository {
    notes: RwLock<HashMap<(String, NoteId), Note>>,
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored note regardless of owner, as a storage dump would see it.
    pub async fn raw_notes(&self) -> Vec<Note> {
        self.notes.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    async fn insert(&self, user_id: &str, sealed: SealedDraft) -> Result<Note> {
        let note = Note {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: sealed.title,
            content: sealed.content,
            created_at: Utc::now(),
        };
        self.notes
            .write()
            .await
            .insert((note.user_id.clone(), note.id), note.clone());
        Ok(note)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Note>> {
        let guard = self.notes.read().await;
        let mut notes: Vec<Note> = guard
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|(_, note)| note.clone())
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn get(&self, user_id: &str, id: NoteId) -> Result<Option<Note>> {
        Ok(self
            .notes
            .read()
            .await
            .get(&(user_id.to_string(), id))
            .cloned())
    }

    async fn update(&self, user_id: &str, id: NoteId, sealed: SealedDraft) -> Result<Option<Note>> {
        let mut guard = self.notes.write().await;
        Ok(guard.get_mut(&(user_id.to_string(), id)).map(|note| {
            note.title = sealed.title;
            note.content = sealed.content;
            note.clone()
        }))
    }

    async fn delete(&self, user_id: &str, id: NoteId) -> Result<bool> {
        Ok(self
            .notes
            .write()
            .await
            .remove(&(user_id.to_string(), id))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_title_rejected() {
        let key = UserKey::from_bytes([1u8; 32]);
        let result = NoteDraft::new("", Some("body")).seal(&key);
        assert!(matches!(result, Err(NotevaultError::Validation(_))));
    }

    #[test]
    fn test_empty_content_stored_as_none() {
        let key = UserKey::from_bytes([1u8; 32]);
        let sealed = NoteDraft::new("t", Some("")).seal(&key).unwrap();
        assert!(sealed.content.is_none());
    }

    #[tokio::test]
    async fn test_repository_scopes_by_owner() {
        let key = UserKey::from_bytes([1u8; 32]);
        let repo = MemoryNoteRepository::new();
        let note = repo
            .insert("alice", NoteDraft::new("t", None).seal(&key).unwrap())
            .await
            .unwrap();

        assert!(repo.get("bob", note.id).await.unwrap().is_none());
        assert!(!repo.delete("bob", note.id).await.unwrap());
        let update = NoteDraft::new("x", None).seal(&key).unwrap();
        assert!(repo.update("bob", note.id, update).await.unwrap().is_none());
        assert!(repo.list("bob").await.unwrap().is_empty());

        assert!(repo.get("alice", note.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_note_opens_only_under_its_key() {
        let key = UserKey::from_bytes([1u8; 32]);
        let other = UserKey::from_bytes([2u8; 32]);
        let repo = MemoryNoteRepository::new();
        let note = repo
            .insert("u1", NoteDraft::new("Groceries", Some("milk, eggs")).seal(&key).unwrap())
            .await
            .unwrap();

        let opened = note.open(&key).unwrap();
        assert_eq!(opened.title, "Groceries");
        assert_eq!(opened.content, "milk, eggs");
        assert!(matches!(note.open(&other), Err(NotevaultError::Integrity)));
    }
}
