//! `AppScout` - Installed application discovery for Windows
//!
//! Inventories every launchable application by querying several mutually
//! inconsistent sources (shortcuts, Program Files, the uninstall registry,
//! packaged-app manifests and the shell), merges them into one set keyed by
//! record id, and resolves a display icon for each entry.
//!
//! `AppScanner` runs one thread per discovery strategy, the strategies use
//! rayon for their inner fan-out, and `IconDispatcher` fetches slow icons in
//! the background.
//!
//! # Requirements
//!
//! - Windows 10 or later for live discovery; other platforms compile and
//!   return empty or generated results

// Module declarations
pub mod apps;
pub mod config;
pub mod discovery;
pub mod error;
pub mod icon;
pub mod layout;
pub mod scanner;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use apps::{ApplicationRecord, DiscoverySource, MissingApplication};
pub use error::{AppScoutError, Result};
pub use scanner::{AppScanner, ScanOutcome};
