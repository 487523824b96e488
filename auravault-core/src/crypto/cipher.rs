//! AES-256-GCM encryption and decryption for vault secrets.
//!
//! Uses AES-256-GCM with:
//! - 256-bit key
//! - 96-bit (12 byte) nonce, freshly random for every encryption
//! - 128-bit authentication tag, appended to the ciphertext
//!
//! The tag-appended layout is what WebCrypto produces, so records written by
//! earlier clients decrypt unchanged.

use crate::crypto::{CryptoError, Result, SessionKey};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};

/// Nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// Output of a single encryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Ciphertext with the authentication tag appended
    pub ciphertext: Vec<u8>,

    /// Nonce used for this encryption only
    pub nonce: [u8; NONCE_LEN],
}

/// Encrypt data using AES-256-GCM
///
/// The nonce is generated here from the OS RNG and never supplied by the
/// caller, so no two encryptions under one key share a nonce.
pub fn encrypt(key: &SessionKey, plaintext: &[u8]) -> Result<EncryptedPayload> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(format!("{}", e)))?;

    Ok(EncryptedPayload {
        ciphertext,
        nonce: nonce.into(),
    })
}

/// Decrypt data using AES-256-GCM
///
/// # Security
/// - Returns `AuthenticationFailed` if the tag doesn't verify: wrong key,
///   tampered or truncated ciphertext, or the wrong nonce
/// - A malformed nonce is reported separately as `InvalidNonce`
pub fn decrypt(key: &SessionKey, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
    let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| {
        CryptoError::InvalidNonce(format!(
            "expected {} bytes, got {}",
            NONCE_LEN,
            nonce.len()
        ))
    })?;

    let cipher = Aes256Gcm::new(key.as_bytes().into());

    cipher
        .decrypt(&Nonce::from(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

/// Encrypt a string
pub fn encrypt_string(key: &SessionKey, plaintext: &str) -> Result<EncryptedPayload> {
    encrypt(key, plaintext.as_bytes())
}

/// Decrypt to a string
pub fn decrypt_to_string(key: &SessionKey, ciphertext: &[u8], nonce: &[u8]) -> Result<String> {
    let bytes = decrypt(key, ciphertext, nonce)?;
    String::from_utf8(bytes).map_err(|_| CryptoError::DecryptionFailed("Invalid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::KEY_LEN;

    fn key(byte: u8) -> SessionKey {
        SessionKey::from_bytes([byte; KEY_LEN])
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = key(7);
        let plaintext = b"Aura-WiFi-5G!";

        let encrypted = encrypt(&key, plaintext).unwrap();
        assert_eq!(encrypted.ciphertext.len(), plaintext.len() + TAG_LEN);

        let decrypted = decrypt(&key, &encrypted.ciphertext, &encrypted.nonce).unwrap();
        assert_eq!(plaintext.to_vec(), decrypted);
    }

    #[test]
    fn test_encrypt_string_roundtrip() {
        let key = key(7);
        let encrypted = encrypt_string(&key, "9876").unwrap();
        let decrypted = decrypt_to_string(&key, &encrypted.ciphertext, &encrypted.nonce).unwrap();
        assert_eq!(decrypted, "9876");
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let key = key(7);
        let encrypted = encrypt(&key, b"").unwrap();
        assert_eq!(encrypted.ciphertext.len(), TAG_LEN);
        assert!(decrypt(&key, &encrypted.ciphertext, &encrypted.nonce)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_different_nonces() {
        let key = key(7);
        let plaintext = b"Same data";

        let encrypted1 = encrypt(&key, plaintext).unwrap();
        let encrypted2 = encrypt(&key, plaintext).unwrap();

        assert_ne!(encrypted1.nonce, encrypted2.nonce);
        assert_ne!(encrypted1.ciphertext, encrypted2.ciphertext);
    }

    #[test]
    fn test_wrong_key_is_authentication_failure() {
        let encrypted = encrypt(&key(1), b"Secret data").unwrap();

        let err = decrypt(&key(2), &encrypted.ciphertext, &encrypted.nonce).unwrap_err();
        assert!(err.is_authentication_failure());
    }

    #[test]
    fn test_tampering_detected() {
        let key = key(7);
        let mut encrypted = encrypt(&key, b"Original data").unwrap();
        encrypted.ciphertext[0] ^= 0xFF;

        let err = decrypt(&key, &encrypted.ciphertext, &encrypted.nonce).unwrap_err();
        assert!(err.is_authentication_failure());
    }

    #[test]
    fn test_mismatched_nonce_detected() {
        let key = key(7);
        let encrypted = encrypt(&key, b"Original data").unwrap();
        let mut nonce = encrypted.nonce;
        nonce[0] ^= 0x01;

        let err = decrypt(&key, &encrypted.ciphertext, &nonce).unwrap_err();
        assert!(err.is_authentication_failure());
    }

    #[test]
    fn test_truncated_ciphertext_detected() {
        let key = key(7);
        let encrypted = encrypt(&key, b"Original data").unwrap();

        let err = decrypt(&key, &encrypted.ciphertext[..TAG_LEN - 1], &encrypted.nonce).unwrap_err();
        assert!(err.is_authentication_failure());
    }

    #[test]
    fn test_malformed_nonce_is_not_authentication_failure() {
        let key = key(7);
        let encrypted = encrypt(&key, b"data").unwrap();

        let err = decrypt(&key, &encrypted.ciphertext, &encrypted.nonce[..8]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidNonce(_)));
        assert!(!err.is_authentication_failure());
    }

    #[test]
    fn test_invalid_utf8_is_decryption_failure() {
        let key = key(7);
        let encrypted = encrypt(&key, &[0xFF, 0xFE, 0xFD]).unwrap();

        let err = decrypt_to_string(&key, &encrypted.ciphertext, &encrypted.nonce).unwrap_err();
        assert!(matches!(err, CryptoError::DecryptionFailed(_)));
    }
}
