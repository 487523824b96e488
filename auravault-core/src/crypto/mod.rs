//! Cryptographic primitives for the vault.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 key derivation
//! - AES-256-GCM encryption/decryption
//! - The in-memory session key type

pub mod cipher;
pub mod kdf;
pub mod key;

pub use cipher::{decrypt, decrypt_to_string, encrypt, encrypt_string, EncryptedPayload};
pub use kdf::{derive_key, KdfParams};
pub use key::SessionKey;

use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KdfFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("Authentication failed - wrong key or tampered data")]
    AuthenticationFailed,

    #[error("Invalid encoding: {0}")]
    Encoding(String),
}

impl CryptoError {
    /// True when the ciphertext did not verify under the given key.
    ///
    /// This is the only class of failure that makes a legacy-key retry
    /// worthwhile; everything else (bad encoding, bad nonce, derivation
    /// failure) would fail the same way under any key.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, CryptoError::AuthenticationFailed)
    }
}

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;
