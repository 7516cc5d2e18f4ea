use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use notevault::{
    decrypt_field, encrypt_field, generate_master_key, unwrap_key, wrap_key, EncryptedField,
    MasterKey, NotevaultError, UserKey, WrappedUserKey,
};

const NONCE_LEN: usize = 12;

#[test]
fn test_wrap_unwrap_roundtrip() {
    let master = generate_master_key().unwrap();

    for raw in [[0u8; 32], [0xFF; 32], *UserKey::generate().unwrap().as_bytes()] {
        let key = UserKey::from_bytes(raw);
        let wrapped = wrap_key(&master, &key).unwrap();
        assert_eq!(unwrap_key(&master, &wrapped).unwrap().as_bytes(), key.as_bytes());
    }
}

#[test]
fn test_field_roundtrip_including_empty_and_multibyte() {
    let key = UserKey::generate().unwrap();

    for text in ["", "Groceries", "milk, eggs\nbread", "naïve café — ünïcödé", "日本語のメモ 📝"] {
        let blob = encrypt_field(text, &key).unwrap();
        assert_eq!(decrypt_field(&blob, &key).unwrap(), text);
    }
}

#[test]
fn test_encryption_is_not_deterministic() {
    let key = UserKey::generate().unwrap();

    let a = encrypt_field("same input", &key).unwrap();
    let b = encrypt_field("same input", &key).unwrap();
    assert_ne!(a, b, "two encryptions produced identical output");

    assert_eq!(decrypt_field(&a, &key).unwrap(), "same input");
    assert_eq!(decrypt_field(&b, &key).unwrap(), "same input");

    // Nonces differ, not just ciphertexts.
    let nonce_a = &STANDARD.decode(a.as_str()).unwrap()[..NONCE_LEN];
    let nonce_b = &STANDARD.decode(b.as_str()).unwrap()[..NONCE_LEN];
    assert_ne!(nonce_a, nonce_b);
}

#[test]
fn test_wrapping_is_not_deterministic() {
    let master = generate_master_key().unwrap();
    let key = UserKey::generate().unwrap();
    assert_ne!(wrap_key(&master, &key).unwrap(), wrap_key(&master, &key).unwrap());
}

#[test]
fn test_any_flipped_byte_fails_integrity() {
    let master = generate_master_key().unwrap();
    let key = UserKey::generate().unwrap();
    let wrapped = wrap_key(&master, &key).unwrap();
    let bytes = STANDARD.decode(wrapped.as_str()).unwrap();

    // Nonce, ciphertext, and tag: every position is covered by the tag.
    for i in 0..bytes.len() {
        let mut tampered = bytes.clone();
        tampered[i] ^= 0x01;
        let result = unwrap_key(&master, &WrappedUserKey::new(STANDARD.encode(&tampered)));
        assert!(
            matches!(result, Err(NotevaultError::Integrity)),
            "byte {} flipped but unwrap did not report an integrity failure",
            i
        );
    }
}

#[test]
fn test_truncated_blobs_are_format_errors() {
    let master = generate_master_key().unwrap();
    let key = UserKey::generate().unwrap();

    for len in [0, 1, NONCE_LEN, NONCE_LEN + 15] {
        let blob = STANDARD.encode(vec![0u8; len]);
        assert!(matches!(
            unwrap_key(&master, &WrappedUserKey::new(blob.clone())),
            Err(NotevaultError::Format)
        ));
        assert!(matches!(
            decrypt_field(&EncryptedField::new(blob), &key),
            Err(NotevaultError::Format)
        ));
    }

    assert!(matches!(
        decrypt_field(&EncryptedField::new("!!not base64!!"), &key),
        Err(NotevaultError::Format)
    ));
}

#[test]
fn test_cross_key_isolation() {
    let k1 = UserKey::from_bytes([1u8; 32]);
    let k2 = UserKey::from_bytes([2u8; 32]);

    let blob = encrypt_field("private thought", &k1).unwrap();
    assert!(matches!(decrypt_field(&blob, &k2), Err(NotevaultError::Integrity)));
}

#[test]
fn test_wrong_master_key_cannot_unwrap() {
    let m1 = MasterKey::from_bytes([1u8; 32]);
    let m2 = MasterKey::from_bytes([2u8; 32]);
    let key = UserKey::generate().unwrap();

    let wrapped = wrap_key(&m1, &key).unwrap();
    assert!(matches!(unwrap_key(&m2, &wrapped), Err(NotevaultError::Integrity)));
}

#[test]
fn test_wire_layout() {
    // nonce (12) ‖ ciphertext (32) ‖ tag (16)
    let master = generate_master_key().unwrap();
    let wrapped = wrap_key(&master, &UserKey::generate().unwrap()).unwrap();
    assert_eq!(STANDARD.decode(wrapped.as_str()).unwrap().len(), 12 + 32 + 16);

    let key = UserKey::generate().unwrap();
    let blob = encrypt_field("abcde", &key).unwrap();
    assert_eq!(STANDARD.decode(blob.as_str()).unwrap().len(), 12 + 5 + 16);
}
