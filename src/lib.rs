//! # notevault
//!
//! Envelope encryption for per-user note storage.
//!
//! Every user gets a random 256-bit key. Note titles and contents are sealed
//! under that key with AES-256-GCM before they reach storage, and the user
//! key is itself sealed under a server-held master key. Only the wrapped
//! form of a user key is ever persisted; the raw key is recovered for one
//! request and dropped.
//!
//! ## Public API
//!
//! The core operations are free functions so the CRUD layer can compose
//! them however it likes:
//!
//! - [`provision_user_key`] — once per user, at creation time
//! - [`resolve_user_key`] — once per note request
//! - [`encrypt_field`] / [`decrypt_field`] — per note field
//!
//! [`Vault`] bundles them with note and user persistence and a key audit
//! log.
//!
//! ## Wire format
//!
//! Wrapped keys and encrypted fields share one format, which is stable:
//!
//! ```text
//! base64( nonce (12 bytes) ‖ ciphertext ‖ GCM tag (16 bytes) )
//! ```

pub mod audit;
pub mod config;
pub(crate) mod crypto;
pub mod error;
pub mod field;
pub mod keys;
pub mod notes;
pub mod provision;
pub mod retrieval;
pub mod store;
pub mod users;
pub mod vault;

pub use config::Config;
pub use error::{NotevaultError, Result};
pub use field::{decrypt_field, encrypt_field, EncryptedField};
pub use keys::{unwrap_key, wrap_key, MasterKey, UserKey, WrappedUserKey};
pub use notes::{DecryptedNote, MemoryNoteRepository, Note, NoteDraft, NoteRepository};
pub use provision::{provision_user_key, KeySource, SystemKeySource};
pub use retrieval::{resolve_user_key, try_resolve_user_key};
pub use store::{KeyValueStore, MemoryKeyValueStore, UserKeyStore};
pub use users::{MemoryUserDirectory, UserDirectory, UserRecord};
pub use vault::Vault;

/// Generate a cryptographically secure master key.
///
/// In production the master key comes from configuration
/// ([`Config::from_env`]); this exists for tests, demos, and for producing
/// a key to put into that configuration.
pub fn generate_master_key() -> Result<MasterKey> {
    let bytes = crypto::generate_random_key()?;
    Ok(MasterKey::from_bytes(bytes))
}

/// Size in bytes of master and user keys.
pub const KEY_LEN: usize = crypto::KEY_LEN;
