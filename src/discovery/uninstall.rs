//! Uninstall registry entries
//!
//! Each entry with a display name and an install directory on disk becomes at
//! most one record. The executable is the entry's `DisplayIcon` when that
//! names an existing file, otherwise the smallest candidate executable
//! directly in the install directory.

use super::registry::{UninstallBranch, UninstallEntry};
use super::{DiscoveryStrategy, ScanContext, executable_record, is_candidate_executable};
use crate::apps::{ApplicationRecord, DiscoverySource};
use crate::utils::filters::is_excluded_executable;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Strip surrounding whitespace and one pair of quotes
fn unquote(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim()
}

/// Turn a raw `DisplayIcon` value into a path
///
/// Handles `"C:\App\app.exe",0`, `C:\App\app.exe,-101` and plain paths.
pub fn normalize_display_icon(raw: &str) -> Option<PathBuf> {
    let mut value = raw.trim();
    if let Some((path, index)) = value.rsplit_once(',')
        && index.trim().parse::<i32>().is_ok()
    {
        value = path;
    }
    let value = unquote(value);
    (!value.is_empty()).then(|| PathBuf::from(value))
}

/// `DisplayIcon` as the launch target, if it names an existing file
///
/// Any extension is accepted (`.ico`, `.dll`, `.exe`); uninstaller and setup
/// names are still rejected.
fn display_icon_executable(entry: &UninstallEntry) -> Option<PathBuf> {
    let path = normalize_display_icon(entry.display_icon.as_deref()?)?;
    (path.is_file() && !is_excluded_executable(&path)).then_some(path)
}

/// Smallest candidate executable directly inside `dir`
///
/// Ties go to the name that sorts first.
pub fn smallest_executable(dir: &Path) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {}: {e}", dir.display());
            return None;
        }
    };

    entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            let path = entry.path();
            (metadata.is_file() && is_candidate_executable(&path)).then(|| (metadata.len(), path))
        })
        .min()
        .map(|(_, path)| path)
}

/// Executable to launch for an uninstall entry
///
/// Requires a display name and an install location that is an existing
/// directory.
pub(crate) fn resolve_install_executable(entry: &UninstallEntry) -> Option<PathBuf> {
    if entry.display_name.trim().is_empty() {
        return None;
    }
    let location = unquote(&entry.install_location);
    if location.is_empty() {
        return None;
    }
    let install_dir = Path::new(location);
    if !install_dir.is_dir() {
        debug!(
            "Install location of {} does not exist: {location}",
            entry.key_name
        );
        return None;
    }

    display_icon_executable(entry).or_else(|| smallest_executable(install_dir))
}

/// Uninstall entries from every branch, skipping branches that cannot be read
pub(crate) fn read_uninstall_entries(ctx: &ScanContext) -> Vec<UninstallEntry> {
    UninstallBranch::ALL
        .into_iter()
        .flat_map(|branch| match ctx.registry.uninstall_entries(branch) {
            Ok(entries) => {
                debug!("{} entries in {}", entries.len(), branch.describe());
                entries
            }
            Err(e) => {
                warn!("Skipping uninstall branch: {e}");
                Vec::new()
            }
        })
        .collect()
}

/// Record for an uninstall entry, using the install-location rules above
pub(crate) fn record_for_entry(
    entry: &UninstallEntry,
    source: DiscoverySource,
    ctx: &ScanContext,
) -> Option<ApplicationRecord> {
    let executable = resolve_install_executable(entry)?;
    let name = entry.display_name.trim();
    Some(executable_record(&executable, name, source, &ctx.roots))
}

/// Reads the machine, 32-bit and per-user uninstall branches
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryUninstallStrategy;

impl DiscoveryStrategy for RegistryUninstallStrategy {
    fn name(&self) -> &'static str {
        "registry-uninstall"
    }

    fn scan(&self, ctx: &ScanContext) -> Vec<ApplicationRecord> {
        let entries = read_uninstall_entries(ctx);
        let records: Vec<ApplicationRecord> = entries
            .par_iter()
            .filter_map(|entry| record_for_entry(entry, DiscoverySource::RegistryUninstall, ctx))
            .collect();

        for record in &records {
            ctx.icons.defer(record);
        }

        info!(
            "Resolved {} of {} uninstall entries",
            records.len(),
            entries.len()
        );
        records
    }
}
