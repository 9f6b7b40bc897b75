//! Configuration data models
//!
//! This module defines the data structures used for scanner configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vendor directories scanned below each Program Files root by the
/// common-directories strategy
pub const DEFAULT_COMMON_DIRECTORY_VENDORS: &[&str] = &[
    "7-Zip",
    "Adobe",
    "Audacity",
    "BraveSoftware",
    "Git",
    "GIMP 2",
    "Google",
    "Inkscape",
    "JetBrains",
    "LibreOffice",
    "Microsoft Office",
    "Microsoft VS Code",
    "Mozilla Firefox",
    "Mozilla Thunderbird",
    "Notepad++",
    "obs-studio",
    "Steam",
    "VideoLAN",
    "WinRAR",
];

/// Top-level scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// A scan taking longer than this is reported at warn level
    pub slow_scan_threshold_ms: u64,
    /// Which discovery strategies are registered with the scanner
    pub strategies: StrategyToggles,
    /// Vendor subdirectory allow-list for the common-directories strategy
    pub common_directory_vendors: Vec<String>,
}

/// Per-strategy enable switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyToggles {
    /// Start Menu and Desktop shortcuts
    pub desktop_shortcuts: bool,
    /// Well-known vendor directories under Program Files
    pub common_directories: bool,
    /// Uninstall registry branches
    pub registry_uninstall: bool,
    /// Packaged apps (manifests, shell enumeration, package repository)
    pub packaged_apps: bool,
    /// Store package install directories
    pub store_packages: bool,
}

impl ScanConfig {
    /// Slow-scan threshold as a `Duration`
    pub fn slow_scan_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_scan_threshold_ms)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            slow_scan_threshold_ms: 10_000,
            strategies: StrategyToggles::default(),
            common_directory_vendors: DEFAULT_COMMON_DIRECTORY_VENDORS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl Default for StrategyToggles {
    fn default() -> Self {
        Self {
            desktop_shortcuts: true,
            common_directories: true,
            registry_uninstall: true,
            packaged_apps: true,
            store_packages: true,
        }
    }
}
