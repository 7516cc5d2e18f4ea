//! Key ownership and the key-wrap codec.
//!
//! This module owns two responsibilities:
//! 1. Holding key material (`MasterKey`, `UserKey`) in types that are opaque,
//!    non-cloneable, and zeroised on drop.
//! 2. Wrapping and unwrapping per-user keys under the master key.
//!
//! ## Key hierarchy
//!
//! ```text
//! MasterKey (process-wide, from configuration)
//!     └── WrappedUserKey = base64(nonce ‖ AES-256-GCM(MasterKey, UserKey) ‖ tag)
//!             └── EncryptedField = base64(nonce ‖ AES-256-GCM(UserKey, text) ‖ tag)
//! ```
//!
//! The master key is never stored next to the data it protects. A raw
//! `UserKey` never leaves process memory and lives for one request.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{self, KEY_LEN};
use crate::error::{NotevaultError, Result};

// ---------------------------------------------------------------------------
// Master key
// ---------------------------------------------------------------------------

/// The server-held master key. All per-user keys are wrapped under it.
///
/// - Not `Clone`. Loaded once at startup and passed by reference.
/// - Zeroised on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Construct a `MasterKey` from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Parse a 64-character hex string.
    ///
    /// Anything else is a `Configuration` error: a bad master key must stop
    /// the process from starting, not surface at the first request.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let trimmed = hex_str.trim();
        if trimmed.len() != KEY_LEN * 2 {
            return Err(NotevaultError::Configuration(format!(
                "master key must be {} hex characters, got {}",
                KEY_LEN * 2,
                trimmed.len()
            )));
        }

        let mut bytes = [0u8; KEY_LEN];
        hex::decode_to_slice(trimmed, &mut bytes).map_err(|_| {
            NotevaultError::Configuration("master key is not valid hex".to_string())
        })?;
        Ok(Self { bytes })
    }

    /// `pub(crate)`: raw bytes never leave the crate.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

// ---------------------------------------------------------------------------
// User key
// ---------------------------------------------------------------------------

/// A raw per-user data-encryption key.
///
/// - Not `Clone`. Resolved per request and dropped at the end of it.
/// - Zeroised on drop.
/// - Never serialised.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct UserKey {
    bytes: [u8; KEY_LEN],
}

impl UserKey {
    /// Construct a `UserKey` from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Generate a fresh key from the system CSPRNG.
    pub fn generate() -> Result<Self> {
        Ok(Self {
            bytes: crypto::generate_random_key()?,
        })
    }

    /// Borrow the raw key bytes. Exposed so callers and tests can compare
    /// keys; the bytes must not be logged or persisted.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserKey(..)")
    }
}

// ---------------------------------------------------------------------------
// Wrapped user key
// ---------------------------------------------------------------------------

/// A `UserKey` encrypted under the `MasterKey`, in its persisted string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WrappedUserKey(String);

impl WrappedUserKey {
    /// Wrap a string read back from storage. No validation happens here;
    /// malformed values are rejected by [`unwrap_key`].
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for WrappedUserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encrypt a user key under the master key.
///
/// A fresh nonce is drawn for every call, so wrapping the same key twice
/// yields two different strings.
pub fn wrap_key(master: &MasterKey, raw: &UserKey) -> Result<WrappedUserKey> {
    let encoded = crypto::seal_to_string(master.as_bytes(), raw.as_bytes())?;
    Ok(WrappedUserKey(encoded))
}

/// Recover a user key from its wrapped form.
///
/// Fails with `Integrity` if the tag does not verify (tampering or a
/// different master key) and with `Format` if the blob is malformed or does
/// not contain exactly one key.
pub fn unwrap_key(master: &MasterKey, wrapped: &WrappedUserKey) -> Result<UserKey> {
    let mut plain = crypto::open_from_str(master.as_bytes(), wrapped.as_str())?;

    let result = <[u8; KEY_LEN]>::try_from(plain.as_slice())
        .map(UserKey::from_bytes)
        .map_err(|_| NotevaultError::Format);
    plain.zeroize();
    result
}
