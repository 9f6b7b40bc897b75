//! Registry access
//!
//! Strategies read the registry through [`RegistryView`] so that the uninstall
//! and package repository logic can run against [`StaticRegistry`] in tests.
//! [`SystemRegistry`] reads the live registry with `winreg` and reports every
//! branch as unavailable on other platforms.

use crate::error::{AppScoutError, Result};
use std::collections::HashMap;

/// Which hive a branch lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryHive {
    /// `HKEY_CURRENT_USER`
    CurrentUser,
    /// `HKEY_LOCAL_MACHINE`
    LocalMachine,
}

impl RegistryHive {
    /// Hives in the order the package repository is read
    pub const PACKAGE_ORDER: [Self; 2] = [Self::CurrentUser, Self::LocalMachine];

    /// Short hive prefix for log messages
    pub fn label(self) -> &'static str {
        match self {
            Self::CurrentUser => "HKCU",
            Self::LocalMachine => "HKLM",
        }
    }

    /// Package repository key relative to the hive
    ///
    /// The per-user repository lives in the user's classes hive; the
    /// machine-wide one is kept under `AppModel\PackageRepository`.
    pub fn package_repository_path(self) -> &'static str {
        match self {
            Self::CurrentUser => USER_PACKAGE_REPOSITORY_PATH,
            Self::LocalMachine => MACHINE_PACKAGE_REPOSITORY_PATH,
        }
    }
}

/// Uninstall branches, in the order they are scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UninstallBranch {
    /// Native machine-wide installs
    MachineNative,
    /// 32-bit machine-wide installs on 64-bit Windows
    MachineWow64,
    /// Per-user installs
    CurrentUser,
}

impl UninstallBranch {
    /// Every branch, in scan order
    pub const ALL: [Self; 3] = [Self::MachineNative, Self::MachineWow64, Self::CurrentUser];

    /// Hive the branch lives in
    pub fn hive(self) -> RegistryHive {
        match self {
            Self::MachineNative | Self::MachineWow64 => RegistryHive::LocalMachine,
            Self::CurrentUser => RegistryHive::CurrentUser,
        }
    }

    /// Key path relative to the hive
    pub fn key_path(self) -> &'static str {
        match self {
            Self::MachineNative | Self::CurrentUser => {
                r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall"
            }
            Self::MachineWow64 => r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
        }
    }

    /// `HIVE\path` for log messages
    pub fn describe(self) -> String {
        format!("{}\\{}", self.hive().label(), self.key_path())
    }
}

/// Per-user package repository below `HKEY_CURRENT_USER`
pub const USER_PACKAGE_REPOSITORY_PATH: &str = r"Software\Classes\Local Settings\Software\Microsoft\Windows\CurrentVersion\AppModel\Repository\Packages";

/// Machine-wide package repository below `HKEY_LOCAL_MACHINE`
pub const MACHINE_PACKAGE_REPOSITORY_PATH: &str =
    r"SOFTWARE\Microsoft\Windows\CurrentVersion\AppModel\PackageRepository\Packages";

/// Values of one uninstall subkey
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallEntry {
    /// Subkey name
    pub key_name: String,
    /// `DisplayName`
    pub display_name: String,
    /// `Publisher`
    pub publisher: String,
    /// `InstallLocation`
    pub install_location: String,
    /// `DisplayIcon`, raw (may be quoted and carry a `,index` suffix)
    pub display_icon: Option<String>,
}

/// Values of one package repository subkey
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagedEntry {
    /// Subkey name, the package full name
    pub full_name: String,
    /// `DisplayName`, possibly an indirect `ms-resource:` / `@{...}` string
    pub display_name: Option<String>,
    /// `PackageRootFolder`, or `Path` in the machine-wide repository
    pub root_folder: Option<String>,
}

/// Read access to the branches discovery cares about
pub trait RegistryView: Send + Sync {
    /// Entries of one uninstall branch
    ///
    /// # Errors
    ///
    /// Returns [`AppScoutError::SourceUnavailable`] if the branch cannot be opened.
    fn uninstall_entries(&self, branch: UninstallBranch) -> Result<Vec<UninstallEntry>>;

    /// Entries of the package repository in one hive
    ///
    /// # Errors
    ///
    /// Returns [`AppScoutError::SourceUnavailable`] if the branch cannot be opened.
    fn packaged_entries(&self, hive: RegistryHive) -> Result<Vec<PackagedEntry>>;
}

/// Live registry
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRegistry;

#[cfg(windows)]
mod native {
    use super::{PackagedEntry, RegistryHive, UninstallEntry};
    use crate::error::{AppScoutError, Result};
    use tracing::debug;
    use winreg::RegKey;
    use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ};

    fn open(hive: RegistryHive, path: &str) -> Result<RegKey> {
        let root = match hive {
            RegistryHive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
            RegistryHive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
        };
        root.open_subkey_with_flags(path, KEY_READ).map_err(|e| {
            AppScoutError::source_unavailable(format!("{}\\{path}", hive.label()), e)
        })
    }

    fn string_value(key: &RegKey, name: &str) -> Option<String> {
        key.get_value::<String, _>(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Open every subkey of `parent`, skipping the ones that fail
    fn subkeys(parent: &RegKey) -> impl Iterator<Item = (String, RegKey)> + '_ {
        parent.enum_keys().filter_map(move |name| {
            let name = match name {
                Ok(name) => name,
                Err(e) => {
                    debug!("Skipping unreadable subkey name: {e}");
                    return None;
                }
            };
            match parent.open_subkey_with_flags(&name, KEY_READ) {
                Ok(key) => Some((name, key)),
                Err(e) => {
                    debug!("Skipping subkey {name}: {e}");
                    None
                }
            }
        })
    }

    pub(super) fn uninstall_entries(hive: RegistryHive, path: &str) -> Result<Vec<UninstallEntry>> {
        let branch = open(hive, path)?;
        Ok(subkeys(&branch)
            .map(|(key_name, key)| UninstallEntry {
                display_name: string_value(&key, "DisplayName").unwrap_or_default(),
                publisher: string_value(&key, "Publisher").unwrap_or_default(),
                install_location: string_value(&key, "InstallLocation").unwrap_or_default(),
                display_icon: string_value(&key, "DisplayIcon"),
                key_name,
            })
            .collect())
    }

    pub(super) fn packaged_entries(hive: RegistryHive, path: &str) -> Result<Vec<PackagedEntry>> {
        let branch = open(hive, path)?;
        Ok(subkeys(&branch)
            .map(|(full_name, key)| PackagedEntry {
                display_name: string_value(&key, "DisplayName"),
                root_folder: string_value(&key, "PackageRootFolder")
                    .or_else(|| string_value(&key, "Path")),
                full_name,
            })
            .collect())
    }
}

impl RegistryView for SystemRegistry {
    #[cfg(windows)]
    fn uninstall_entries(&self, branch: UninstallBranch) -> Result<Vec<UninstallEntry>> {
        native::uninstall_entries(branch.hive(), branch.key_path())
    }

    #[cfg(not(windows))]
    fn uninstall_entries(&self, branch: UninstallBranch) -> Result<Vec<UninstallEntry>> {
        Err(AppScoutError::source_unavailable(
            branch.describe(),
            crate::error::StringError::new("the registry is only available on Windows"),
        ))
    }

    #[cfg(windows)]
    fn packaged_entries(&self, hive: RegistryHive) -> Result<Vec<PackagedEntry>> {
        native::packaged_entries(hive, hive.package_repository_path())
    }

    #[cfg(not(windows))]
    fn packaged_entries(&self, hive: RegistryHive) -> Result<Vec<PackagedEntry>> {
        Err(AppScoutError::source_unavailable(
            format!("{}\\{}", hive.label(), hive.package_repository_path()),
            crate::error::StringError::new("the registry is only available on Windows"),
        ))
    }
}

/// Fixed registry contents
///
/// Branches that were never filled in report themselves as unavailable, the
/// same way a missing key does on a live system.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    uninstall: HashMap<UninstallBranch, Vec<UninstallEntry>>,
    packaged: HashMap<RegistryHive, Vec<PackagedEntry>>,
}

impl StaticRegistry {
    /// Registry with no readable branches
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an uninstall entry to `branch`
    #[must_use]
    pub fn with_uninstall(mut self, branch: UninstallBranch, entry: UninstallEntry) -> Self {
        self.uninstall.entry(branch).or_default().push(entry);
        self
    }

    /// Add a package repository entry to `hive`
    #[must_use]
    pub fn with_package(mut self, hive: RegistryHive, entry: PackagedEntry) -> Self {
        self.packaged.entry(hive).or_default().push(entry);
        self
    }
}

impl RegistryView for StaticRegistry {
    fn uninstall_entries(&self, branch: UninstallBranch) -> Result<Vec<UninstallEntry>> {
        self.uninstall.get(&branch).cloned().ok_or_else(|| {
            AppScoutError::source_unavailable(
                branch.describe(),
                crate::error::StringError::new("branch not present"),
            )
        })
    }

    fn packaged_entries(&self, hive: RegistryHive) -> Result<Vec<PackagedEntry>> {
        self.packaged.get(&hive).cloned().ok_or_else(|| {
            AppScoutError::source_unavailable(
                hive.label(),
                crate::error::StringError::new("branch not present"),
            )
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_uninstall_branch_paths() {
        assert_eq!(UninstallBranch::MachineNative.hive(), RegistryHive::LocalMachine);
        assert_eq!(UninstallBranch::CurrentUser.hive(), RegistryHive::CurrentUser);
        assert!(UninstallBranch::MachineWow64.key_path().contains("WOW6432Node"));
        assert!(UninstallBranch::CurrentUser.describe().starts_with("HKCU\\SOFTWARE"));
    }

    #[test]
    fn test_package_repository_path_differs_per_hive() {
        let user = RegistryHive::CurrentUser.package_repository_path();
        let machine = RegistryHive::LocalMachine.package_repository_path();
        assert!(user.starts_with(r"Software\Classes\Local Settings"));
        assert!(machine.starts_with(r"SOFTWARE\Microsoft\Windows"));
        assert!(machine.ends_with(r"PackageRepository\Packages"));
        assert!(!machine.contains("Local Settings"));
    }

    #[test]
    fn test_static_registry_missing_branch_is_unavailable() {
        let registry = StaticRegistry::new();
        let err = registry
            .uninstall_entries(UninstallBranch::MachineNative)
            .unwrap_err();
        assert!(matches!(err, AppScoutError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_static_registry_returns_entries() {
        let registry = StaticRegistry::new()
            .with_uninstall(
                UninstallBranch::CurrentUser,
                UninstallEntry {
                    key_name: "Contoso".into(),
                    display_name: "Contoso Editor".into(),
                    ..UninstallEntry::default()
                },
            )
            .with_package(RegistryHive::LocalMachine, PackagedEntry::default());

        let entries = registry
            .uninstall_entries(UninstallBranch::CurrentUser)
            .unwrap();
        assert_eq!(entries[0].display_name, "Contoso Editor");
        assert_eq!(
            registry
                .packaged_entries(RegistryHive::LocalMachine)
                .unwrap()
                .len(),
            1
        );
        assert!(registry.packaged_entries(RegistryHive::CurrentUser).is_err());
    }

    #[test]
    #[cfg(not(windows))]
    fn test_system_registry_unavailable_off_windows() {
        assert!(SystemRegistry.uninstall_entries(UninstallBranch::MachineNative).is_err());
        assert!(SystemRegistry.packaged_entries(RegistryHive::CurrentUser).is_err());
    }
}
