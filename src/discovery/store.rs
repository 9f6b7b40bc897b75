//! Store package directories
//!
//! Walks the per-user and per-machine `WindowsApps` roots, then picks up
//! uninstall entries that describe Store / MSIX installs. Icons are resolved
//! inline since package directories are few.

use super::uninstall::{read_uninstall_entries, record_for_entry};
use super::{
    DiscoveryStrategy, ScanContext, child_directories, file_name_string, is_candidate_executable,
    walk_files,
};
use crate::apps::{ApplicationRecord, DiscoverySource};
use crate::utils::filters::{clean_package_display_name, is_packaged_distribution_indicator};
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Package directory plus one level below it
const PACKAGE_DEPTH: usize = 2;

/// Reads `WindowsApps` package directories and Store-distributed uninstall entries
#[derive(Debug, Clone, Copy, Default)]
pub struct StorePackageStrategy;

impl StorePackageStrategy {
    fn package_record(dir: &Path, ctx: &ScanContext) -> Option<ApplicationRecord> {
        let executable = walk_files(dir, PACKAGE_DEPTH).find(|path| is_candidate_executable(path))?;
        let dir_name = file_name_string(dir);
        let executable_text = executable.to_string_lossy();
        let icon = ctx.icons.resolve_now(&executable_text);

        Some(
            ApplicationRecord::new(
                DiscoverySource::StorePackageDirectory.synthesize_id(&dir.to_string_lossy()),
                dir_name.as_str(),
                &*executable_text,
                DiscoverySource::StorePackageDirectory,
            )
            .with_display_name(clean_package_display_name(&dir_name))
            .with_icon(icon),
        )
    }

    fn directory_records(ctx: &ScanContext) -> Vec<ApplicationRecord> {
        let mut records = Vec::new();

        for root in [&ctx.roots.user_windows_apps, &ctx.roots.machine_windows_apps] {
            if root.as_os_str().is_empty() {
                continue;
            }
            let dirs = match child_directories(root) {
                Ok(dirs) => dirs,
                Err(e) => {
                    // The machine root denies listing to non-admin users
                    warn!("Cannot list package root {}: {e}", root.display());
                    continue;
                }
            };

            let found: Vec<ApplicationRecord> = dirs
                .par_iter()
                .filter_map(|dir| Self::package_record(dir, ctx))
                .collect();
            debug!("{} packages under {}", found.len(), root.display());
            records.extend(found);
        }

        records
    }

    fn uninstall_records(ctx: &ScanContext) -> Vec<ApplicationRecord> {
        read_uninstall_entries(ctx)
            .par_iter()
            .filter(|entry| {
                is_packaged_distribution_indicator(
                    &entry.display_name,
                    &entry.publisher,
                    &entry.install_location,
                )
            })
            .filter_map(|entry| {
                let record = record_for_entry(entry, DiscoverySource::StorePackageDirectory, ctx)?;
                let icon = ctx.icons.resolve_now(&record.executable_path);
                Some(record.with_icon(icon))
            })
            .collect()
    }
}

impl DiscoveryStrategy for StorePackageStrategy {
    fn name(&self) -> &'static str {
        "store-packages"
    }

    fn scan(&self, ctx: &ScanContext) -> Vec<ApplicationRecord> {
        let mut records = Self::directory_records(ctx);
        let from_directories = records.len();
        records.extend(Self::uninstall_records(ctx));

        info!(
            "Store packages: {} from directories, {} from uninstall entries",
            from_directories,
            records.len() - from_directories
        );
        records
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::discovery::registry::{StaticRegistry, UninstallBranch, UninstallEntry};
    use crate::icon::IconDispatcher;
    use crate::test_utils::{create_test_dir, roots_under, write_sized_file};
    use std::sync::Arc;

    fn context(base: &Path, registry: StaticRegistry) -> ScanContext {
        ScanContext::new(
            roots_under(base),
            ScanConfig::default(),
            IconDispatcher::default(),
            Arc::new(registry),
        )
    }

    #[test]
    fn test_package_directory_record() {
        let dir = create_test_dir();
        let ctx = context(dir.path(), StaticRegistry::new());
        let package = ctx
            .roots
            .machine_windows_apps
            .join("ContosoPhotoEditor_1.4.0.0_x64__8wekyb3d8bbwe");
        write_sized_file(&package.join("Helpers").join("crash-helper.exe"), 8);
        let exe = write_sized_file(&package.join("Editor").join("editor.exe"), 8);
        write_sized_file(&package.join("Editor").join("Deep").join("deep.exe"), 8);

        let records = StorePackageStrategy.scan(&ctx);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].display_name, "Contoso Photo Editor");
        assert_eq!(records[0].id, format!("store-package:{}", package.display()));
        assert_eq!(records[0].executable_path, exe.to_string_lossy());
        assert!(records[0].is_icon_resolved());
    }

    #[test]
    fn test_packages_without_executables_are_skipped() {
        let dir = create_test_dir();
        let ctx = context(dir.path(), StaticRegistry::new());
        write_sized_file(&ctx.roots.user_windows_apps.join("Empty.Package_1.0_x64__x").join("resources.pri"), 8);
        assert!(StorePackageStrategy.scan(&ctx).is_empty());
    }

    #[test]
    fn test_uninstall_pass_uses_indicators() {
        let dir = create_test_dir();
        let store_install = dir.path().join("Store App");
        let store_exe = write_sized_file(&store_install.join("storeapp.exe"), 8);
        let classic_install = dir.path().join("Classic");
        write_sized_file(&classic_install.join("classic.exe"), 8);

        let registry = StaticRegistry::new()
            .with_uninstall(
                UninstallBranch::CurrentUser,
                UninstallEntry {
                    key_name: "StoreApp".into(),
                    display_name: "Store App".into(),
                    publisher: "Microsoft Store".into(),
                    install_location: store_install.to_string_lossy().into_owned(),
                    display_icon: None,
                },
            )
            .with_uninstall(
                UninstallBranch::MachineNative,
                UninstallEntry {
                    key_name: "Classic".into(),
                    display_name: "Classic".into(),
                    publisher: "Contoso".into(),
                    install_location: classic_install.to_string_lossy().into_owned(),
                    display_icon: None,
                },
            );
        let ctx = context(dir.path(), registry);

        let records = StorePackageStrategy.scan(&ctx);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, store_exe.to_string_lossy());
        assert_eq!(records[0].source, DiscoverySource::StorePackageDirectory);
    }
}
