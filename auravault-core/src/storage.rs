//! Persistence of the encrypted record list.
//!
//! The vault only ever reads and writes the whole list; a store has no
//! knowledge of keys or plaintext.

use crate::record::VaultRecord;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

/// Errors raised by a record store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Durable storage for the ordered list of vault records
pub trait RecordStore: Send {
    /// Load every persisted record in stored order
    fn load_records(&self) -> Result<Vec<VaultRecord>, StorageError>;

    /// Replace the persisted list
    ///
    /// Must be all-or-nothing: on error the previous list stays intact.
    fn save_records(&self, records: &[VaultRecord]) -> Result<(), StorageError>;
}

/// In-memory store
///
/// Clones share the same list, which lets a caller keep a handle on what
/// a session persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<VaultRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records
    pub fn with_records(records: Vec<VaultRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }
}

impl RecordStore for MemoryStore {
    fn load_records(&self) -> Result<Vec<VaultRecord>, StorageError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StorageError::LockPoisoned("Failed to lock record list".to_string()))?;
        Ok(records.clone())
    }

    fn save_records(&self, records: &[VaultRecord]) -> Result<(), StorageError> {
        let mut stored = self
            .records
            .lock()
            .map_err(|_| StorageError::LockPoisoned("Failed to lock record list".to_string()))?;
        *stored = records.to_vec();
        Ok(())
    }
}

/// JSON file store
///
/// The file holds a JSON array of records. A missing file is an empty
/// vault. Saves are written to a temporary file beside the target and
/// renamed over it.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonFileStore {
    fn load_records(&self) -> Result<Vec<VaultRecord>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No record file at {:?}, starting empty", self.path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    fn save_records(&self, records: &[VaultRecord]) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_vec_pretty(records)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;

        debug!("Saved {} records to {:?}", records.len(), self.path);
        Ok(())
    }
}
