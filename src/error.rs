//! Error types for notevault.
//!
//! Every variant is a distinct failure mode of the envelope-encryption core.
//! Messages are intentionally minimal: they say *what* failed without
//! revealing anything about key material or cryptographic state.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NotevaultError>;

/// The single error type for all notevault operations.
#[derive(Debug, Error)]
pub enum NotevaultError {
    /// The master key is missing, not hex, or not 32 bytes. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The authentication tag did not verify: tampered data, corrupted
    /// storage, or a different key than the one used to seal.
    #[error("integrity check failed")]
    Integrity,

    /// The encoded blob is malformed (bad base64, too short, wrong key
    /// length, or non-UTF-8 plaintext).
    #[error("malformed encrypted value")]
    Format,

    /// The user-key store has no entry for a user that should have one.
    #[error("no encryption key provisioned for user {0}")]
    KeyNotProvisioned(String),

    /// The backing key-value store or repository failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A raw key could not be bound to the cipher.
    #[error("invalid key")]
    InvalidKey,

    /// Sealing failed inside `ring`.
    #[error("encryption failed")]
    EncryptionFailure,

    /// The system random number generator failed to produce bytes.
    #[error("randomness source failed")]
    RandomnessFailure,

    /// Generic request-boundary failure when the user's key could not be
    /// resolved. Carries no detail on purpose.
    #[error("could not retrieve encryption key")]
    KeyUnavailable,

    /// Generic request-boundary failure when the key resolved but a stored
    /// note would not open under it. Carries no detail on purpose.
    #[error("could not decrypt note")]
    NoteUnreadable,

    /// No note with this id exists for the requesting user.
    #[error("note not found")]
    NoteNotFound,

    /// Caller input was rejected.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A user with this id is already registered.
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),
}

impl NotevaultError {
    /// True for failures that mean stored ciphertext could not be opened.
    /// Callers treat `Integrity` and `Format` identically.
    pub fn is_crypto_rejection(&self) -> bool {
        matches!(self, Self::Integrity | Self::Format)
    }
}
