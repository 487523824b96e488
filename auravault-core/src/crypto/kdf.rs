//! PBKDF2 key derivation for the vault passphrase.
//!
//! Uses PBKDF2 with:
//! - PRF: HMAC-SHA256
//! - Iterations: 100,000
//! - Output length: 32 bytes (256 bits)
//!
//! These parameters must not change: existing vault data was written with
//! them and is only readable by a byte-identical derivation.

use crate::crypto::{key::KEY_LEN, CryptoError, Result, SessionKey};
use hmac::Hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Reference iteration count
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Key size required by AES-256-GCM
pub const KEY_BITS: u32 = 256;

/// Salt all vault data is currently written under
pub const CURRENT_SALT: &str = "aura-secure-memory-vault-salt";

/// Deprecated salt, only read during unlock migration
pub const LEGACY_SALT: &str = "aura-vault-salt";

/// Parameters for PBKDF2 key derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Salt for key derivation
    pub salt: Vec<u8>,

    /// Number of PBKDF2 iterations
    pub iterations: u32,

    /// Output length in bits
    pub key_bits: u32,
}

impl KdfParams {
    pub fn new(salt: impl Into<Vec<u8>>, iterations: u32) -> Self {
        Self {
            salt: salt.into(),
            iterations,
            key_bits: KEY_BITS,
        }
    }

    /// Parameters for the current salt
    pub fn current() -> Self {
        Self::new(CURRENT_SALT, DEFAULT_ITERATIONS)
    }

    /// Parameters for the legacy salt
    pub fn legacy() -> Self {
        Self::new(LEGACY_SALT, DEFAULT_ITERATIONS)
    }

    /// Same parameters with a different iteration count
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Verify that parameters can produce a key for the cipher in use
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(CryptoError::KdfFailed(
                "Iteration count must be at least 1".to_string(),
            ));
        }
        if self.key_bits != KEY_BITS {
            return Err(CryptoError::KdfFailed(format!(
                "Unsupported key size: {} bits (expected {})",
                self.key_bits, KEY_BITS
            )));
        }
        if self.salt.is_empty() {
            return Err(CryptoError::KdfFailed("Salt must not be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::current()
    }
}

/// Derive a session key from a passphrase using PBKDF2-HMAC-SHA256
///
/// Deterministic: the same passphrase and parameters always yield the same
/// key. Any passphrase is accepted; only invalid parameters fail.
pub fn derive_key(passphrase: &str, params: &KdfParams) -> Result<SessionKey> {
    params.validate()?;

    let mut output = [0u8; KEY_LEN];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(
        passphrase.as_bytes(),
        &params.salt,
        params.iterations,
        &mut output,
    )
    .map_err(|e| CryptoError::KdfFailed(format!("PBKDF2 failed: {}", e)))?;

    Ok(SessionKey::from_bytes(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(params: KdfParams) -> KdfParams {
        params.with_iterations(1_000)
    }

    #[test]
    fn test_kdf_params_defaults() {
        let params = KdfParams::current();
        assert_eq!(params.iterations, 100_000);
        assert_eq!(params.key_bits, 256);
        assert_eq!(params.salt, CURRENT_SALT.as_bytes());
        assert!(params.validate().is_ok());

        let legacy = KdfParams::legacy();
        assert_ne!(legacy.salt, params.salt);
        assert_eq!(legacy.iterations, params.iterations);
    }

    #[test]
    fn test_kdf_params_validation() {
        let mut params = KdfParams::current();

        params.iterations = 0;
        assert!(params.validate().is_err());

        params.iterations = 1;
        params.key_bits = 128;
        assert!(params.validate().is_err());

        params.key_bits = 256;
        params.salt.clear();
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_invalid_params_yield_kdf_error() {
        let params = KdfParams::current().with_iterations(0);
        let err = derive_key("passphrase", &params).unwrap_err();
        assert!(matches!(err, CryptoError::KdfFailed(_)));
    }

    #[test]
    fn test_pbkdf2_sha256_known_answer() {
        // RFC 7914 section 11, first 32 bytes of the 64-byte output
        let params = KdfParams::new("salt", 1);
        let key = derive_key("passwd", &params).unwrap();
        assert_eq!(
            hex::encode(key.as_bytes()),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn test_derive_key_deterministic() {
        let params = fast(KdfParams::current());

        let key1 = derive_key("test_password_123!", &params).unwrap();
        let key2 = derive_key("test_password_123!", &params).unwrap();
        assert_eq!(key1, key2);

        let key3 = derive_key("different_password", &params).unwrap();
        assert_ne!(key1, key3);
    }

    #[test]
    fn test_salt_changes_key() {
        let current = derive_key("102030", &fast(KdfParams::current())).unwrap();
        let legacy = derive_key("102030", &fast(KdfParams::legacy())).unwrap();
        assert_ne!(current, legacy);
    }

    #[test]
    fn test_empty_and_unicode_passphrases_accepted() {
        let params = fast(KdfParams::current());
        assert!(derive_key("", &params).is_ok());
        assert!(derive_key("pässwörd 🔐", &params).is_ok());
    }
}
