//! Packaged (UWP / MSIX) applications
//!
//! Three independent sub-scans, concatenated in this order:
//!
//! 1. `AppxManifest.xml` files inside the Start Menu program trees
//! 2. The shell's application list from `Get-StartApps`
//! 3. The package repository in the registry (current user, then machine)
//!
//! Shell and registry entries have no executable to extract an icon from and
//! carry the package badge instead.
//!
//! # Package Name Format
//!
//! - **Full Name**: `Name_Version_Architecture_ResourceId_PublisherId`
//!   - Example: `Microsoft.WindowsCalculator_10.2103.8.0_x64__8wekyb3d8bbwe`
//! - **Family Name**: `Name_PublisherId`
//!   - Example: `Microsoft.WindowsCalculator_8wekyb3d8bbwe`

use super::registry::{PackagedEntry, RegistryHive};
use super::shell::{PowerShellStartApps, StartAppsSource};
use super::{DiscoveryStrategy, ScanContext, file_name_string, is_candidate_executable, walk_files};
use crate::apps::{ApplicationRecord, DiscoverySource};
use crate::error::{AppScoutError, Result};
use crate::icon::generated::package_icon;
use crate::utils::filters::clean_package_display_name;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const MANIFEST_FILE_NAME: &str = "AppxManifest.xml";

/// Host executable names tried before falling back to any executable
pub const CONVENTIONAL_HOSTS: [&str; 4] = ["app.exe", "application.exe", "main.exe", "start.exe"];

/// Depth limit for the manifest search in the Start Menu
const MAX_MANIFEST_DEPTH: usize = 8;

/// Prefix that launches an application user model id through Explorer
pub const APPS_FOLDER_PREFIX: &str = "shell:AppsFolder\\";

/// Extract package family name from package full name
///
/// Keeps the first (`Name`) and last (`PublisherId`) components.
///
/// # Errors
///
/// Returns error if the full name has fewer than five `_`-separated parts or
/// an empty name or publisher id.
pub fn package_family_name(full_name: &str) -> Result<String> {
    let parts: Vec<&str> = full_name.split('_').collect();

    // ResourceId may be empty, which shows up as `__`
    if parts.len() < 5 {
        return Err(AppScoutError::PackageFamilyNameExtractionError(
            full_name.to_string(),
        ));
    }

    let name = parts[0];
    let publisher_id = parts[parts.len() - 1];
    if name.is_empty() || publisher_id.is_empty() {
        return Err(AppScoutError::PackageFamilyNameExtractionError(
            full_name.to_string(),
        ));
    }

    Ok(format!("{name}_{publisher_id}"))
}

/// Display name from the package repository, unless it is an indirect string
///
/// `ms-resource:` and `@{...}` values have to be resolved against the package
/// resources and are treated as absent.
pub fn usable_display_name(raw: Option<&str>) -> Option<&str> {
    let name = raw?.trim();
    if name.is_empty() || name.starts_with("ms-resource:") || name.starts_with("@{") {
        return None;
    }
    Some(name)
}

/// `Id` of the first `<Application>` element in a package manifest
///
/// Only the attribute is needed, so the manifest is scanned as text rather
/// than parsed. `<Applications>` (the container) is skipped.
pub fn first_application_id(manifest: &str) -> Option<&str> {
    const OPEN: &str = "<Application";

    let mut rest = manifest;
    while let Some(start) = rest.find(OPEN) {
        rest = &rest[start + OPEN.len()..];
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let end = rest.find('>')?;
        return attribute_value(&rest[..end], "Id");
    }
    None
}

/// Value of `name="..."` inside a single start tag
fn attribute_value<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("{name}=\"");
    let mut rest = tag;
    loop {
        let at = rest.find(&pattern)?;
        let value_start = at + pattern.len();
        // `Id=` must not be the tail of another attribute name
        if rest[..at].ends_with(char::is_whitespace) {
            let len = rest[value_start..].find('"')?;
            let value = rest[value_start..value_start + len].trim();
            return (!value.is_empty()).then_some(value);
        }
        rest = &rest[value_start..];
    }
}

/// Application id declared in the manifest under `root_folder`
fn manifest_application_id(root_folder: &str) -> Option<String> {
    let manifest = Path::new(root_folder.trim()).join(MANIFEST_FILE_NAME);
    match std::fs::read_to_string(&manifest) {
        Ok(text) => first_application_id(&text).map(str::to_string),
        Err(e) => {
            debug!("Cannot read {}: {e}", manifest.display());
            None
        }
    }
}

/// Host executable for a manifest directory
fn manifest_host(dir: &Path) -> Option<PathBuf> {
    CONVENTIONAL_HOSTS
        .iter()
        .map(|host| dir.join(host))
        .find(|path| path.is_file())
        .or_else(|| walk_files(dir, 1).find(|path| is_candidate_executable(path)))
}

/// Reads package manifests, the shell's app list and the package repository
#[derive(Clone)]
pub struct PackagedAppStrategy {
    shell: Arc<dyn StartAppsSource>,
}

impl Default for PackagedAppStrategy {
    fn default() -> Self {
        Self::new(Arc::new(PowerShellStartApps))
    }
}

impl std::fmt::Debug for PackagedAppStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackagedAppStrategy").finish_non_exhaustive()
    }
}

impl PackagedAppStrategy {
    /// Strategy reading the shell's app list from `shell`
    pub fn new(shell: Arc<dyn StartAppsSource>) -> Self {
        Self { shell }
    }

    fn manifest_records(ctx: &ScanContext) -> Vec<ApplicationRecord> {
        let mut records = Vec::new();

        for root in [&ctx.roots.start_menu, &ctx.roots.common_start_menu] {
            if root.as_os_str().is_empty() {
                continue;
            }
            let manifests = walk_files(root, MAX_MANIFEST_DEPTH).filter(|path| {
                path.file_name()
                    .is_some_and(|n| n.eq_ignore_ascii_case(MANIFEST_FILE_NAME))
            });

            for manifest in manifests {
                let Some(dir) = manifest.parent() else {
                    continue;
                };
                let Some(host) = manifest_host(dir) else {
                    debug!("No host executable next to {}", manifest.display());
                    continue;
                };

                let dir_text = dir.to_string_lossy();
                let dir_name = file_name_string(dir);
                let record = ApplicationRecord::new(
                    DiscoverySource::PackagedManifest.synthesize_id(&dir_text),
                    dir_name.as_str(),
                    host.to_string_lossy(),
                    DiscoverySource::PackagedManifest,
                )
                .with_display_name(clean_package_display_name(&dir_name));
                ctx.icons.defer(&record);
                records.push(record);
            }
        }

        records
    }

    fn shell_records(&self) -> Vec<ApplicationRecord> {
        let apps = match self.shell.start_apps() {
            Ok(apps) => apps,
            Err(e) => {
                warn!("Shell application list unavailable: {e}");
                return Vec::new();
            }
        };

        apps.into_iter()
            .map(|app| {
                ApplicationRecord::new(
                    DiscoverySource::PackagedShell.synthesize_id(&app.app_id),
                    app.name,
                    format!("{APPS_FOLDER_PREFIX}{}", app.app_id),
                    DiscoverySource::PackagedShell,
                )
                .with_icon(package_icon())
            })
            .collect()
    }

    fn registry_record(entry: &PackagedEntry) -> Option<ApplicationRecord> {
        let Some(name) = usable_display_name(entry.display_name.as_deref()) else {
            debug!("Package {} has no usable display name", entry.full_name);
            return None;
        };

        // The application id is only trusted when the manifest declares it
        let app_id = entry.root_folder.as_deref().and_then(manifest_application_id);
        let launch_target = match (package_family_name(&entry.full_name), app_id) {
            (Ok(family), Some(app_id)) => format!("{APPS_FOLDER_PREFIX}{family}!{app_id}"),
            (family, _) => {
                if let Err(e) = family {
                    debug!("{e}");
                }
                entry.root_folder.clone().unwrap_or_default()
            }
        };

        Some(
            ApplicationRecord::new(
                DiscoverySource::PackagedRegistry.synthesize_id(&entry.full_name),
                name,
                launch_target,
                DiscoverySource::PackagedRegistry,
            )
            .with_icon(package_icon()),
        )
    }

    fn registry_records(ctx: &ScanContext) -> Vec<ApplicationRecord> {
        RegistryHive::PACKAGE_ORDER
            .into_iter()
            .flat_map(|hive| match ctx.registry.packaged_entries(hive) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Skipping package repository: {e}");
                    Vec::new()
                }
            })
            .filter_map(|entry| Self::registry_record(&entry))
            .collect()
    }
}

impl DiscoveryStrategy for PackagedAppStrategy {
    fn name(&self) -> &'static str {
        "packaged-apps"
    }

    fn scan(&self, ctx: &ScanContext) -> Vec<ApplicationRecord> {
        let (manifests, (shell, registry)) = rayon::join(
            || Self::manifest_records(ctx),
            || rayon::join(|| self.shell_records(), || Self::registry_records(ctx)),
        );

        info!(
            "Packaged apps: {} from manifests, {} from shell, {} from registry",
            manifests.len(),
            shell.len(),
            registry.len()
        );

        let mut records = manifests;
        records.extend(shell);
        records.extend(registry);
        records
    }
}
