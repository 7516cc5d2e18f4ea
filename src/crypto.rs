//! Low-level cryptographic operations.
//!
//! This is the only module that imports `ring` directly. The key-wrap codec
//! (`keys`) and the field codec (`field`) both go through the functions here,
//! so the wire format is defined exactly once.
//!
//! Primitive choices:
//! - **Cipher**: AES-256-GCM (authenticated encryption)
//! - **Nonce**: 96-bit (12 bytes), generated fresh per operation via `SystemRandom`
//! - **Tag**: 128-bit (16 bytes), appended after the ciphertext
//! - **Key size**: 256 bits (32 bytes)
//! - **Encoding**: standard padded base64 of the whole sealed blob

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::aead::{self, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{NotevaultError, Result};

/// The AEAD algorithm used throughout notevault.
const ALGORITHM: &aead::Algorithm = &AES_256_GCM;

/// Size of the nonce in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Size of a master or user key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// A nonce generated for a single encryption operation.
/// Newtype to prevent accidental reuse — each `Nonce` is consumed on use.
struct OwnedNonce(Nonce);

/// Draw a fresh nonce from the system CSPRNG. There is no caching and no
/// counter: every call to `seal` gets its own.
fn generate_nonce() -> Result<OwnedNonce> {
    let rng = SystemRandom::new();
    let mut buf = [0u8; NONCE_LEN];
    rng.fill(&mut buf).map_err(|_| NotevaultError::RandomnessFailure)?;
    Ok(OwnedNonce(Nonce::assume_unique_for_key(buf)))
}

fn bind_key(key_bytes: &[u8; KEY_LEN]) -> Result<LessSafeKey> {
    let unbound = UnboundKey::new(ALGORITHM, key_bytes).map_err(|_| NotevaultError::InvalidKey)?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` with AES-256-GCM under `key_bytes`.
///
/// # Layout of returned bytes
/// ```text
/// [ nonce (12 bytes) ][ ciphertext ][ GCM tag (16 bytes) ]
/// ```
pub fn seal(key_bytes: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let key = bind_key(key_bytes)?;
    let nonce = generate_nonce()?;

    let mut output = Vec::with_capacity(NONCE_LEN + plaintext.len() + TAG_LEN);
    output.extend_from_slice(nonce.0.as_ref());
    output.extend_from_slice(plaintext);

    // Encrypts `output[NONCE_LEN..]` in place; the tag goes on the end.
    let tag = key
        .seal_in_place_separate_tag(nonce.0, aead::Aad::empty(), &mut output[NONCE_LEN..])
        .map_err(|_| NotevaultError::EncryptionFailure)?;
    output.extend_from_slice(tag.as_ref());

    Ok(output)
}

/// Decrypt a blob in the layout produced by [`seal`].
///
/// Inputs shorter than nonce + tag are a `Format` error. A tag that does not
/// verify is an `Integrity` error, and the caller receives no partial
/// plaintext.
pub fn open(key_bytes: &[u8; KEY_LEN], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(NotevaultError::Format);
    }

    let (nonce_bytes, body) = sealed.split_at(NONCE_LEN);
    let nonce_bytes: [u8; NONCE_LEN] =
        nonce_bytes.try_into().map_err(|_| NotevaultError::Format)?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let key = bind_key(key_bytes)?;
    let mut payload = body.to_vec();

    let plaintext = key
        .open_in_place(nonce, aead::Aad::empty(), &mut payload)
        .map_err(|_| NotevaultError::Integrity)?;

    Ok(plaintext.to_vec())
}

/// [`seal`] followed by base64 encoding. This string is the persisted form.
pub fn seal_to_string(key_bytes: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String> {
    let sealed = seal(key_bytes, plaintext)?;
    Ok(STANDARD.encode(sealed))
}

/// Base64-decode then [`open`]. Invalid base64 is a `Format` error.
pub fn open_from_str(key_bytes: &[u8; KEY_LEN], encoded: &str) -> Result<Vec<u8>> {
    let sealed = STANDARD
        .decode(encoded.trim())
        .map_err(|_| NotevaultError::Format)?;
    open(key_bytes, &sealed)
}

/// Generate a cryptographically secure random key.
pub fn generate_random_key() -> Result<[u8; KEY_LEN]> {
    let rng = SystemRandom::new();
    let mut key = [0u8; KEY_LEN];
    rng.fill(&mut key).map_err(|_| NotevaultError::RandomnessFailure)?;
    Ok(key)
}
