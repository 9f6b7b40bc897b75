#![expect(
    clippy::unwrap_used,
    reason = "Test utilities use .unwrap() for brevity"
)]

//! Shared test utilities for `AppScout` unit tests.
//!
//! This module provides common test infrastructure used across multiple test modules.
//! It is only compiled during testing (`#[cfg(test)]`).

use crate::discovery::ScanRoots;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize tests that modify the APPDATA environment variable.
static APPDATA_LOCK: Mutex<()> = Mutex::new(());

/// Helper function to create a temporary test directory using tempfile.
/// Returns a `TempDir` that automatically cleans up when dropped.
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Create `path` (and its parents) filled with `size` bytes.
pub fn write_sized_file(path: &Path, size: usize) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, vec![0u8; size]).unwrap();
    path.to_path_buf()
}

/// Scan roots that all live below `base`, none of which exist yet.
pub fn roots_under(base: &Path) -> ScanRoots {
    ScanRoots {
        start_menu: base.join("user").join("Start Menu").join("Programs"),
        common_start_menu: base.join("common").join("Start Menu").join("Programs"),
        desktop: base.join("user").join("Desktop"),
        program_files: base.join("Program Files"),
        program_files_x86: base.join("Program Files (x86)"),
        user_windows_apps: base.join("user").join("WindowsApps"),
        machine_windows_apps: base.join("Program Files").join("WindowsApps"),
        system_root: base.join("Windows"),
    }
}

/// RAII guard that sets the APPDATA environment variable for a test scope
/// and restores the original value when dropped.
///
/// # Safety Considerations
///
/// `std::env::set_var` and `std::env::remove_var` are unsafe because other
/// threads may read the environment concurrently. The `APPDATA_LOCK` mutex
/// serializes every test that touches APPDATA, each test points it at its own
/// `TempDir`, and `Drop` restores the original value even on panic.
pub struct AppdataGuard {
    original: Option<String>,
    // Held for the lifetime of the guard to keep APPDATA access exclusive
    _lock: std::sync::MutexGuard<'static, ()>,
}

#[expect(
    unsafe_code,
    reason = "Test-only code that modifies environment variables with documented safety invariants. Safe in parallel test execution."
)]
impl AppdataGuard {
    /// Create a new guard that sets APPDATA to the given temp directory path.
    pub fn new(temp_dir: &TempDir) -> Self {
        let lock = APPDATA_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let original = std::env::var("APPDATA").ok();
        // SAFETY: serialized by APPDATA_LOCK, restored on drop
        unsafe {
            std::env::set_var("APPDATA", temp_dir.path());
        }
        Self {
            original,
            _lock: lock,
        }
    }
}

#[expect(
    unsafe_code,
    reason = "Test-only code that restores environment variables with documented safety invariants. Safe in parallel test execution."
)]
impl Drop for AppdataGuard {
    fn drop(&mut self) {
        // SAFETY: the lock is still held; see struct-level documentation
        if let Some(ref original) = self.original {
            unsafe {
                std::env::set_var("APPDATA", original);
            }
        } else {
            unsafe {
                std::env::remove_var("APPDATA");
            }
        }
    }
}
