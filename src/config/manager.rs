//! Configuration manager for loading and saving scanner configuration
//!
//! This module provides functionality to load and save configuration to
//! %APPDATA%\AppScout\config.json with atomic writes to prevent corruption.

use crate::config::models::ScanConfig;
use crate::error::{AppScoutError, Result, StringError};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Configuration manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the path to the configuration file
    ///
    /// Returns: %APPDATA%\AppScout\config.json
    pub fn get_config_path() -> PathBuf {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join("AppScout").join("config.json")
    }

    /// Ensure the configuration directory exists
    ///
    /// Creates %APPDATA%\AppScout if it doesn't exist
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let config_path = Self::get_config_path();
        let config_dir = config_path
            .parent()
            .ok_or_else(|| AppScoutError::ConfigError(StringError::new("Invalid config path")))?;

        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist or is corrupt, returns default configuration.
    pub fn load() -> Result<ScanConfig> {
        let config_path = Self::get_config_path();

        if !config_path.exists() {
            info!("Configuration file not found, using defaults");
            return Ok(ScanConfig::default());
        }

        let json = std::fs::read_to_string(&config_path)?;

        match serde_json::from_str(&json) {
            Ok(config) => {
                info!("Configuration loaded from {}", config_path.display());
                Ok(config)
            }
            Err(e) => {
                warn!("Failed to parse configuration, using defaults: {}", e);
                Ok(ScanConfig::default())
            }
        }
    }

    /// Save configuration to disk with atomic write
    ///
    /// Writes to a temporary file in the same directory and persists it over
    /// the target so a crash never leaves a half-written file behind.
    pub fn save(config: &ScanConfig) -> Result<()> {
        let config_path = Self::get_config_path();
        let config_dir = Self::ensure_config_dir()?;

        let json = serde_json::to_string_pretty(config)?;
        let mut temp = tempfile::NamedTempFile::new_in(&config_dir)?;
        temp.write_all(json.as_bytes())?;
        temp.persist(&config_path)
            .map_err(|e| AppScoutError::ConfigError(Box::new(e)))?;

        info!("Configuration saved to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{AppdataGuard, create_test_dir};

    #[test]
    fn test_config_path() {
        let path = ConfigManager::get_config_path();
        assert!(path.to_string_lossy().contains("AppScout"));
        assert!(path.to_string_lossy().ends_with("config.json"));
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = create_test_dir();
        let _guard = AppdataGuard::new(&temp_dir);

        let config = ConfigManager::load().unwrap();
        assert_eq!(config.slow_scan_threshold_ms, 10_000);
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = create_test_dir();
        let _guard = AppdataGuard::new(&temp_dir);

        let mut config = ScanConfig::default();
        config.strategies.store_packages = false;
        config.common_directory_vendors = vec!["Contoso".to_string()];
        ConfigManager::save(&config).unwrap();

        let loaded = ConfigManager::load().unwrap();
        assert!(!loaded.strategies.store_packages);
        assert_eq!(loaded.common_directory_vendors, vec!["Contoso".to_string()]);
    }

    #[test]
    fn test_corrupt_config_falls_back_to_defaults() {
        let temp_dir = create_test_dir();
        let _guard = AppdataGuard::new(&temp_dir);

        ConfigManager::ensure_config_dir().unwrap();
        std::fs::write(ConfigManager::get_config_path(), "{ not json").unwrap();

        let config = ConfigManager::load().unwrap();
        assert!(config.strategies.desktop_shortcuts);
    }
}
