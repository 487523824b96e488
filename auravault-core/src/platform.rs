//! Platform-specific paths for vault data and configuration

use std::path::PathBuf;

/// Get the platform-specific data directory for storing vault data
///
/// Returns:
/// - Windows: %LOCALAPPDATA%\AuraVault
/// - macOS: ~/Library/Application Support/AuraVault
/// - Linux/Other: ~/.local/share/AuraVault
pub fn get_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".data")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("AuraVault")
}

/// Get the platform-specific config directory
pub fn get_config_dir() -> PathBuf {
    let base = dirs::config_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("AuraVault")
}

/// Get the default record store path
pub fn get_default_store_path() -> PathBuf {
    get_data_dir().join("vault.json")
}

/// Get the default config file path
pub fn get_default_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}
