//! Vault session - the lock/unlock state machine over a record store
//!
//! A session owns the store handle, the session key (while unlocked) and
//! the plaintext cache. Every mutating operation takes `&mut self`, so a
//! single owner gets mutual exclusion from the borrow checker; shared
//! owners go through [`crate::service::VaultService`].


use crate::{
    config::VaultConfig,
    crypto::{self, CryptoError, KdfParams, SessionKey},
    record::{DecryptedRecord, RecordSummary, VaultRecord},
    storage::{RecordStore, StorageError},
    Result, VaultError,
};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

/// Lock state of a vault session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultState {
    Locked,
    Unlocking,
    Unlocked,
}

/// Internal failure of an unlock or rotation attempt, before it is
/// reclassified for the caller
#[derive(Error, Debug)]
enum AttemptError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

type Attempt<T> = std::result::Result<T, AttemptError>;

/// A single logical vault
pub struct VaultSession<S: RecordStore> {
    store: S,
    owner: String,
    current_kdf: KdfParams,
    legacy_kdf: KdfParams,
    state: VaultState,
    session_key: Option<SessionKey>,
    decrypted: Vec<DecryptedRecord>,
}

impl<S: RecordStore> VaultSession<S> {
    /// Create a locked session using the configured owner and KDF parameters
    pub fn new(store: S, config: &VaultConfig) -> Self {
        Self::with_params(
            store,
            &config.owner,
            config.current_kdf(),
            config.legacy_kdf(),
        )
    }

    /// Create a locked session with explicit KDF parameters
    pub fn with_params(
        store: S,
        owner: &str,
        current_kdf: KdfParams,
        legacy_kdf: KdfParams,
    ) -> Self {
        Self {
            store,
            owner: owner.to_string(),
            current_kdf,
            legacy_kdf,
            state: VaultState::Locked,
            session_key: None,
            decrypted: Vec::new(),
        }
    }

    pub fn state(&self) -> VaultState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == VaultState::Unlocked
    }

    /// Plaintext records; empty while locked
    pub fn decrypted_records(&self) -> &[DecryptedRecord] {
        &self.decrypted
    }

    /// Record metadata straight from the store (works while locked)
    pub fn list_records(&self) -> Result<Vec<RecordSummary>> {
        let records = self.store.load_records()?;
        Ok(records.iter().map(VaultRecord::summary).collect())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unlock the vault with a passphrase
    ///
    /// Records that fail authentication under the current salt are retried
    /// under the legacy salt; if that works they are rewritten under the
    /// current salt before the session opens. Any failure leaves the
    /// session locked and the store untouched. An empty passphrase is
    /// rejected without touching the session.
    pub fn unlock(&mut self, passphrase: &str) -> Result<()> {
        if passphrase.is_empty() {
            return Err(VaultError::InvalidInput(
                "Passphrase must not be empty".to_string(),
            ));
        }

        if self.state != VaultState::Locked {
            self.clear();
        }
        self.state = VaultState::Unlocking;

        match self.open_records(passphrase) {
            Ok((key, decrypted)) => {
                debug!("Decrypted {} records", decrypted.len());
                self.session_key = Some(key);
                self.decrypted = decrypted;
                self.state = VaultState::Unlocked;
                info!("Vault unlocked");
                Ok(())
            }
            Err(e) => {
                self.clear();
                warn!("Vault unlock failed: {}", e);
                Err(VaultError::UnlockFailed)
            }
        }
    }

    /// Lock the vault, dropping the key and all plaintext
    pub fn lock(&mut self) {
        let was_unlocked = self.is_unlocked();
        self.clear();
        if was_unlocked {
            info!("Vault locked");
        }
    }

    /// Encrypt and persist a new secret
    pub fn add_secret(&mut self, title: &str, content: &str) -> Result<DecryptedRecord> {
        let key = self.session_key()?;

        if title.trim().is_empty() {
            return Err(VaultError::InvalidInput("Title must not be empty".to_string()));
        }

        let payload = seal_content(key, content)?;
        let record = VaultRecord::seal(&self.owner, title, &payload);

        let mut records = self.store.load_records()?;
        records.push(record.clone());
        self.store.save_records(&records)?;

        let added = DecryptedRecord {
            id: record.id,
            title: record.title,
            content: content.to_string(),
        };
        self.decrypted.push(added.clone());

        debug!("Added secret {}", added.id);
        Ok(added)
    }

    /// Replace the content of an existing secret
    pub fn update_secret(&mut self, id: &str, content: &str) -> Result<()> {
        let key = self.session_key()?;

        let mut records = self.store.load_records()?;
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| VaultError::NotFound(format!("Secret {}", id)))?;

        let payload = seal_content(key, content)?;
        let updated = records[index].reseal(&payload, Utc::now());
        let title = updated.title.clone();
        records[index] = updated;
        self.store.save_records(&records)?;

        match self.decrypted.iter_mut().find(|r| r.id == id) {
            Some(cached) => {
                cached.content.zeroize();
                cached.content = content.to_string();
            }
            None => self.decrypted.push(DecryptedRecord {
                id: id.to_string(),
                title,
                content: content.to_string(),
            }),
        }

        debug!("Updated secret {}", id);
        Ok(())
    }

    /// Re-encrypt every record under a new passphrase
    ///
    /// Works whether or not the session is unlocked; the old passphrase must
    /// open every stored record. On success an unlocked session switches to
    /// the new key. On failure nothing is written and the key is kept.
    pub fn rotate_passphrase(&mut self, old_passphrase: &str, new_passphrase: &str) -> Result<()> {
        if old_passphrase.is_empty() || new_passphrase.is_empty() {
            return Err(VaultError::InvalidInput(
                "Old and new passphrase are both required".to_string(),
            ));
        }

        match self.rotate_records(old_passphrase, new_passphrase) {
            Ok((new_key, decrypted)) => {
                if self.is_unlocked() {
                    self.session_key = Some(new_key);
                    self.decrypted = decrypted;
                }
                info!("Vault passphrase rotated");
                Ok(())
            }
            Err(e) => {
                warn!("Passphrase rotation failed: {}", e);
                Err(VaultError::RotationFailed)
            }
        }
    }

    fn session_key(&self) -> Result<&SessionKey> {
        match (self.state, self.session_key.as_ref()) {
            (VaultState::Unlocked, Some(key)) => Ok(key),
            _ => Err(VaultError::NotUnlocked),
        }
    }

    fn clear(&mut self) {
        self.session_key = None;
        self.decrypted.clear();
        self.state = VaultState::Locked;
    }

    fn open_records(&self, passphrase: &str) -> Attempt<(SessionKey, Vec<DecryptedRecord>)> {
        let records = self.store.load_records()?;
        let key = crypto::derive_key(passphrase, &self.current_kdf)?;

        match decrypt_all(&key, &records) {
            Ok(decrypted) => Ok((key, decrypted)),
            Err(e) if e.is_authentication_failure() => {
                let decrypted = self.migrate_legacy(passphrase, &key, &records)?;
                Ok((key, decrypted))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open `records` under the legacy salt and persist them resealed under
    /// `current_key`. Derivation is deterministic, so `current_key` is the
    /// key a fresh current-salt derivation of the same passphrase yields.
    fn migrate_legacy(
        &self,
        passphrase: &str,
        current_key: &SessionKey,
        records: &[VaultRecord],
    ) -> Attempt<Vec<DecryptedRecord>> {
        debug!("Records did not open under the current salt, trying legacy salt");

        let legacy_key = crypto::derive_key(passphrase, &self.legacy_kdf)?;
        let decrypted = decrypt_all(&legacy_key, records)?;

        let migrated = reseal_all(current_key, records, &decrypted)?;
        self.store.save_records(&migrated)?;

        info!("Migrated {} records off the legacy salt", migrated.len());
        Ok(decrypted)
    }

    fn rotate_records(
        &self,
        old_passphrase: &str,
        new_passphrase: &str,
    ) -> Attempt<(SessionKey, Vec<DecryptedRecord>)> {
        let records = self.store.load_records()?;

        let old_key = crypto::derive_key(old_passphrase, &self.current_kdf)?;
        let decrypted = decrypt_all(&old_key, &records)?;
        drop(old_key);

        let new_key = crypto::derive_key(new_passphrase, &self.current_kdf)?;
        let rotated = reseal_all(&new_key, &records, &decrypted)?;
        self.store.save_records(&rotated)?;

        debug!("Re-encrypted {} records", rotated.len());
        Ok((new_key, decrypted))
    }
}

fn seal_content(key: &SessionKey, content: &str) -> Result<crypto::EncryptedPayload> {
    crypto::encrypt_string(key, content).map_err(|e| {
        warn!("Secret encryption failed: {}", e);
        VaultError::EncryptionFailed
    })
}

/// Decrypt every record or none
fn decrypt_all(key: &SessionKey, records: &[VaultRecord]) -> crypto::Result<Vec<DecryptedRecord>> {
    records.iter().map(|record| record.decrypt(key)).collect()
}

/// Reseal every record with a fresh nonce and a shared timestamp
fn reseal_all(
    key: &SessionKey,
    records: &[VaultRecord],
    decrypted: &[DecryptedRecord],
) -> crypto::Result<Vec<VaultRecord>> {
    let now = Utc::now();
    records
        .iter()
        .zip(decrypted)
        .map(|(record, plain)| {
            let payload = crypto::encrypt_string(key, &plain.content)?;
            Ok(record.reseal(&payload, now))
        })
        .collect()
}
