//! AuraVault Core Library
//!
//! A client-held secret vault: a passphrase that never leaves the process
//! is stretched into an AES-256-GCM key that seals a list of small secret
//! records. This crate holds key derivation, authenticated encryption, the
//! lock/unlock session state machine, passphrase rotation, legacy-salt
//! migration and inactivity auto-lock.

pub mod config;
pub mod crypto;
pub mod platform;
pub mod record;
pub mod service;
pub mod session;
pub mod storage;

pub use config::VaultConfig;
pub use crypto::{CryptoError, KdfParams, SessionKey};
pub use record::{DecryptedRecord, RecordSummary, VaultRecord};
pub use service::{ActivityHub, ActivitySource, AutoLockTimer, Subscription, VaultService};
pub use session::{VaultSession, VaultState};
pub use storage::{JsonFileStore, MemoryStore, RecordStore, StorageError};

use thiserror::Error;

/// Result type for vault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors surfaced to vault callers
///
/// Cryptographic failures are reclassified into these variants and never
/// carry key or ciphertext detail.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Decryption failed. Incorrect passphrase or corrupted data.")]
    UnlockFailed,

    #[error("Vault is locked")]
    NotUnlocked,

    #[error("Failed to change passphrase. The old passphrase might be incorrect.")]
    RotationFailed,

    #[error("Failed to encrypt secret")]
    EncryptionFailed,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
