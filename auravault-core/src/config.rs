//! Vault configuration.

use crate::crypto::kdf::{KdfParams, CURRENT_SALT, DEFAULT_ITERATIONS, LEGACY_SALT};
use crate::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default inactivity timeout before auto-lock (5 minutes)
pub const DEFAULT_AUTO_LOCK_SECS: u64 = 300;

/// Default owner recorded on new secrets
pub const DEFAULT_OWNER: &str = "local";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub owner: String,
    pub auto_lock_secs: u64,
    pub kdf: KdfConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    pub iterations: u32,
    pub current_salt: String,
    pub legacy_salt: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            auto_lock_secs: DEFAULT_AUTO_LOCK_SECS,
            kdf: KdfConfig::default(),
        }
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            current_salt: CURRENT_SALT.to_string(),
            legacy_salt: LEGACY_SALT.to_string(),
        }
    }
}

impl VaultConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VaultError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| VaultError::Config(format!("Failed to parse {:?}: {}", path, e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auto_lock_secs == 0 {
            return Err(VaultError::Config(
                "auto_lock_secs must be greater than zero".to_string(),
            ));
        }
        if self.kdf.current_salt == self.kdf.legacy_salt {
            return Err(VaultError::Config(
                "current and legacy salts must differ".to_string(),
            ));
        }
        self.current_kdf()
            .validate()
            .and_then(|_| self.legacy_kdf().validate())
            .map_err(|e| VaultError::Config(e.to_string()))
    }

    pub fn auto_lock_timeout(&self) -> Duration {
        Duration::from_secs(self.auto_lock_secs)
    }

    pub fn current_kdf(&self) -> KdfParams {
        KdfParams::new(self.kdf.current_salt.as_bytes(), self.kdf.iterations)
    }

    pub fn legacy_kdf(&self) -> KdfParams {
        KdfParams::new(self.kdf.legacy_salt.as_bytes(), self.kdf.iterations)
    }
}
