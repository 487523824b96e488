//! The symmetric key held while the vault is unlocked.

use subtle::ConstantTimeEq;
use zeroize::ZeroizeOnDrop;

/// Length of a session key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Key derived from the vault passphrase.
///
/// Kept in memory only while the vault is unlocked and never persisted.
/// Deliberately not `Clone`: exactly one copy lives in the session.
#[derive(ZeroizeOnDrop)]
pub struct SessionKey {
    key: [u8; KEY_LEN],
}

impl SessionKey {
    /// Create a session key from raw bytes
    pub fn from_bytes(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Get a reference to the key bytes (use sparingly)
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.ct_eq(&other.key).into()
    }
}

impl Eq for SessionKey {}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}
