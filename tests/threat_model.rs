use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use notevault::audit::KeyEvent;
use notevault::notes::NoteRepository;
use notevault::{
    Config, KeyValueStore, MasterKey, MemoryKeyValueStore, MemoryNoteRepository,
    MemoryUserDirectory, NoteDraft, NotevaultError, UserRecord, Vault, WrappedUserKey,
};

#[tokio::test]
async fn test_storage_dump_reveals_no_plaintext_or_raw_keys() {
    // Threat: database and key store are both exfiltrated, master key is not.
    let backend = Arc::new(MemoryKeyValueStore::new());
    let repo = Arc::new(MemoryNoteRepository::new());
    let vault = Vault::new(
        Config::new(MasterKey::from_bytes([7u8; 32])),
        Arc::clone(&backend),
        Arc::clone(&repo),
        MemoryUserDirectory::new(),
    );
    vault
        .register_user(UserRecord::new("u1", "u1@example.com"))
        .await
        .unwrap();
    vault
        .create_note("u1", &NoteDraft::new("bank pin", Some("4921")))
        .await
        .unwrap();

    let raw_key = vault.resolve_user_key("u1").await.unwrap();

    for key in backend.keys().await {
        let value = backend.get(&key).await.unwrap().unwrap();
        let decoded = STANDARD.decode(&value).unwrap();
        assert!(
            !decoded
                .windows(raw_key.as_bytes().len())
                .any(|w| w == raw_key.as_bytes()),
            "raw user key present in the key store"
        );
    }

    for note in repo.list("u1").await.unwrap() {
        let title = STANDARD.decode(note.title.as_str()).unwrap();
        assert!(!title.windows(8).any(|w| w == b"bank pin"));
    }
}

#[tokio::test]
async fn test_master_key_mismatch_blocks_every_note_operation() {
    // Threat: service restarted with the wrong master key. It must fail
    // closed, never hand back garbage.
    let backend = Arc::new(MemoryKeyValueStore::new());
    let repo = Arc::new(MemoryNoteRepository::new());

    let original = Vault::new(
        Config::new(MasterKey::from_bytes([1u8; 32])),
        Arc::clone(&backend),
        Arc::clone(&repo),
        MemoryUserDirectory::new(),
    );
    original
        .register_user(UserRecord::new("u1", "u1@example.com"))
        .await
        .unwrap();
    let note = original
        .create_note("u1", &NoteDraft::new("secret", None))
        .await
        .unwrap();

    let restarted = Vault::new(
        Config::new(MasterKey::from_bytes([2u8; 32])),
        Arc::clone(&backend),
        Arc::clone(&repo),
        MemoryUserDirectory::new(),
    );
    assert!(matches!(
        restarted.get_note("u1", note.id).await,
        Err(NotevaultError::KeyUnavailable)
    ));
    assert!(matches!(
        restarted.list_notes("u1").await,
        Err(NotevaultError::KeyUnavailable)
    ));

    let events: Vec<KeyEvent> = restarted.audit_records().iter().map(|r| r.event).collect();
    assert_eq!(events, vec![KeyEvent::Rejected, KeyEvent::Rejected]);
}

#[tokio::test]
async fn test_swapped_wrapped_keys_are_not_interchangeable() {
    // Threat: an attacker with write access to the key store copies their
    // own wrapped key over a victim's. The victim's notes stay sealed.
    let vault = Vault::new(
        Config::new(MasterKey::from_bytes([3u8; 32])),
        MemoryKeyValueStore::new(),
        MemoryNoteRepository::new(),
        MemoryUserDirectory::new(),
    );
    for id in ["victim", "attacker"] {
        vault
            .register_user(UserRecord::new(id, format!("{id}@example.com")))
            .await
            .unwrap();
    }
    let note = vault
        .create_note("victim", &NoteDraft::new("private", Some("words")))
        .await
        .unwrap();

    let attacker_key: WrappedUserKey = vault.key_store().get("attacker").await.unwrap().unwrap();
    vault.key_store().set("victim", attacker_key).await.unwrap();

    // The swapped key unwraps fine but opens nothing. The caller gets a
    // generic error; the rejection lands in the audit trail.
    let err = vault.get_note("victim", note.id).await.unwrap_err();
    assert!(matches!(err, NotevaultError::NoteUnreadable));
    assert_eq!(err.to_string(), "could not decrypt note");
    assert!(matches!(
        vault.list_notes("victim").await,
        Err(NotevaultError::NoteUnreadable)
    ));

    let victim_events: Vec<KeyEvent> = vault
        .audit_records()
        .iter()
        .filter(|r| r.user_id == "victim")
        .map(|r| r.event)
        .collect();
    assert_eq!(
        victim_events,
        vec![KeyEvent::Provisioned, KeyEvent::Rejected, KeyEvent::Rejected]
    );
}
