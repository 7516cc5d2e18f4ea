//! Field codec: encryption of note titles and contents under a user key.
//!
//! Same construction and wire format as the key-wrap codec, applied to
//! arbitrary-length UTF-8 text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::error::{NotevaultError, Result};
use crate::keys::UserKey;

/// A note field as it is persisted: base64 of `nonce ‖ ciphertext ‖ tag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedField(String);

impl EncryptedField {
    /// Wrap a string read back from storage. Validation happens on decrypt.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncryptedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encrypt a text field. Every call uses a fresh nonce.
pub fn encrypt_field(plaintext: &str, key: &UserKey) -> Result<EncryptedField> {
    let encoded = crypto::seal_to_string(key.as_bytes(), plaintext.as_bytes())?;
    Ok(EncryptedField(encoded))
}

/// Decrypt a text field.
///
/// A wrong key or altered blob fails with `Integrity`; malformed input or
/// plaintext that is not UTF-8 fails with `Format`.
pub fn decrypt_field(blob: &EncryptedField, key: &UserKey) -> Result<String> {
    let plain = crypto::open_from_str(key.as_bytes(), blob.as_str())?;
    String::from_utf8(plain).map_err(|_| NotevaultError::Format)
}
