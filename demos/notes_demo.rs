//! Minimal example: notevault behind a notes service.
//!
//! Registers a user, writes and reads an encrypted note, and persists the
//! key audit log to a file.
//! Run with: `MASTER_ENCRYPTION_KEY=<64 hex chars> cargo run --example notes_demo`
//!
//! Without `MASTER_ENCRYPTION_KEY` set, a throwaway master key is generated
//! so the demo still runs.

use notevault::audit::FileAuditSink;
use notevault::{
    generate_master_key, Config, MemoryKeyValueStore, MemoryNoteRepository, MemoryUserDirectory,
    NoteDraft, UserRecord, Vault,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Setup
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "no usable master key in environment, generating one");
            Config::new(generate_master_key()?)
        }
    };

    let vault = Vault::new(
        config,
        MemoryKeyValueStore::new(),
        MemoryNoteRepository::new(),
        MemoryUserDirectory::new(),
    );

    let audit_path = std::env::temp_dir().join("notevault_audit.jsonl");
    vault.add_audit_sink(Box::new(FileAuditSink::new(&audit_path)?));

    // 2. Register a user (provisions their key)
    vault
        .register_user(UserRecord::new("u1", "u1@example.com"))
        .await?;

    // 3. Write and read back a note
    let note = vault
        .create_note("u1", &NoteDraft::new("Groceries", Some("milk, eggs")))
        .await?;
    println!("Created note {}", note.id);

    let stored = vault.note_repository().raw_notes().await;
    println!("Stored title ciphertext: {}", stored[0].title);

    for n in vault.list_notes("u1").await? {
        println!("  {}: {}", n.title, n.content);
    }

    // 4. An unknown user gets a generic failure
    if let Err(e) = vault.list_notes("intruder").await {
        println!("Unknown user: {}", e);
    }

    // 5. Audit log
    let records = vault.audit_records();
    println!("Audit log: {} record(s)", records.len());
    for record in &records {
        println!("  {} {:?} @ {}", record.user_id, record.event, record.timestamp);
    }
    println!("Full audit also written to: {}", audit_path.display());

    Ok(())
}
