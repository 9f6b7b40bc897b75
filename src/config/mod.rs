//! Configuration management module
//!
//! This module handles loading and saving the scanner configuration.
//! Configuration is stored in %APPDATA%\AppScout\config.json with atomic writes
//! to prevent corruption.

pub mod manager;
pub mod models;

pub use manager::ConfigManager;
pub use models::{ScanConfig, StrategyToggles};
