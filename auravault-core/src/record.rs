//! Persisted vault records and their plaintext views.

use crate::crypto::{self, CryptoError, EncryptedPayload, SessionKey};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A single encrypted secret as it is stored
///
/// Only `ciphertext` is secret. `title` is plaintext metadata and `nonce`
/// is public, but a given `(ciphertext, nonce)` pair only opens under the
/// key that sealed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    pub id: String,
    pub owner: String,
    pub title: String,
    /// Base64 of ciphertext with the GCM tag appended
    pub ciphertext: String,
    /// Base64 of the 12-byte nonce
    pub nonce: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VaultRecord {
    /// Build a new record around a freshly encrypted payload
    pub fn seal(owner: &str, title: &str, payload: &EncryptedPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            title: title.to_string(),
            ciphertext: STANDARD.encode(&payload.ciphertext),
            nonce: STANDARD.encode(payload.nonce),
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of this record carrying a new payload
    ///
    /// Identity, owner, title and creation time are preserved.
    pub fn reseal(&self, payload: &EncryptedPayload, now: DateTime<Utc>) -> Self {
        Self {
            ciphertext: STANDARD.encode(&payload.ciphertext),
            nonce: STANDARD.encode(payload.nonce),
            updated_at: now,
            ..self.clone()
        }
    }

    /// Decode and decrypt the secret content
    pub fn open(&self, key: &SessionKey) -> crypto::Result<String> {
        let ciphertext = decode_field("ciphertext", &self.ciphertext)?;
        let nonce = decode_field("nonce", &self.nonce)?;
        crypto::decrypt_to_string(key, &ciphertext, &nonce)
    }

    /// Plaintext view of this record
    pub fn decrypt(&self, key: &SessionKey) -> crypto::Result<DecryptedRecord> {
        Ok(DecryptedRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            content: self.open(key)?,
        })
    }

    /// Metadata that can be shown without a key
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn decode_field(field: &str, value: &str) -> crypto::Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| CryptoError::Encoding(format!("{}: {}", field, e)))
}

/// Plaintext view of a record, held only while the vault is unlocked
#[derive(Clone, PartialEq, Eq, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct DecryptedRecord {
    pub id: String,
    pub title: String,
    pub content: String,
}

impl std::fmt::Debug for DecryptedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedRecord")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("content", &"[REDACTED]")
            .finish()
    }
}

/// Record metadata, available while locked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{encrypt_string, key::KEY_LEN};

    fn key(byte: u8) -> SessionKey {
        SessionKey::from_bytes([byte; KEY_LEN])
    }

    #[test]
    fn test_seal_and_open() {
        let key = key(3);
        let payload = encrypt_string(&key, "Aura-WiFi-5G!").unwrap();
        let record = VaultRecord::seal("u1", "WiFi Password", &payload);

        assert_eq!(record.owner, "u1");
        assert_eq!(record.title, "WiFi Password");
        assert_eq!(record.created_at, record.updated_at);
        assert!(Uuid::parse_str(&record.id).is_ok());
        assert_eq!(record.open(&key).unwrap(), "Aura-WiFi-5G!");

        let decrypted = record.decrypt(&key).unwrap();
        assert_eq!(decrypted.id, record.id);
        assert_eq!(decrypted.title, "WiFi Password");
        assert_eq!(decrypted.content, "Aura-WiFi-5G!");
    }

    #[test]
    fn test_open_with_wrong_key_is_authentication_failure() {
        let payload = encrypt_string(&key(3), "9876").unwrap();
        let record = VaultRecord::seal("u1", "Bank PIN", &payload);

        let err = record.open(&key(4)).unwrap_err();
        assert!(err.is_authentication_failure());
    }

    #[test]
    fn test_reseal_preserves_identity() {
        let key = key(3);
        let record = VaultRecord::seal("u1", "Bank PIN", &encrypt_string(&key, "9876").unwrap());
        let later = record.updated_at + chrono::Duration::seconds(5);

        let resealed = record.reseal(&encrypt_string(&key, "1234").unwrap(), later);

        assert_eq!(resealed.id, record.id);
        assert_eq!(resealed.owner, record.owner);
        assert_eq!(resealed.title, record.title);
        assert_eq!(resealed.created_at, record.created_at);
        assert_eq!(resealed.updated_at, later);
        assert_ne!(resealed.nonce, record.nonce);
        assert_eq!(resealed.open(&key).unwrap(), "1234");
    }

    #[test]
    fn test_bad_base64_is_encoding_error() {
        let key = key(3);
        let mut record = VaultRecord::seal("u1", "x", &encrypt_string(&key, "y").unwrap());
        record.nonce = "not base64!!".to_string();

        let err = record.open(&key).unwrap_err();
        assert!(matches!(err, CryptoError::Encoding(_)));
        assert!(!err.is_authentication_failure());
    }

    #[test]
    fn test_wire_format() {
        let key = key(3);
        let record = VaultRecord::seal("u1", "WiFi", &encrypt_string(&key, "pw").unwrap());
        let json = serde_json::to_value(&record).unwrap();

        let object = json.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["ciphertext", "createdAt", "id", "nonce", "owner", "title", "updatedAt"]
        );
        assert_eq!(STANDARD.decode(object["nonce"].as_str().unwrap()).unwrap().len(), 12);

        let parsed: VaultRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_parses_iso_timestamps() {
        let json = r#"{
            "id": "v1",
            "owner": "u1",
            "title": "WiFi Password",
            "ciphertext": "AAAA",
            "nonce": "AAAAAAAAAAAAAAAA",
            "createdAt": "2023-11-20T00:00:00.000Z",
            "updatedAt": "2023-11-20T00:00:00.000Z"
        }"#;
        let record: VaultRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.created_at.to_rfc3339(), "2023-11-20T00:00:00+00:00");
    }

    #[test]
    fn test_decrypted_debug_hides_content() {
        let record = DecryptedRecord {
            id: "v1".into(),
            title: "Bank PIN".into(),
            content: "9876".into(),
        };
        assert!(!format!("{:?}", record).contains("9876"));
    }
}
