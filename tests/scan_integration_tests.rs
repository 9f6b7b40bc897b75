//! Integration tests for `AppScout`
//!
//! Builds a fake machine layout in a temporary directory, points every
//! strategy at it and runs full scans through `AppScanner`.

#![allow(clippy::unwrap_used)]

use appscout::{
    ApplicationRecord, DiscoverySource,
    apps::deduplicate_by_id,
    config::ScanConfig,
    discovery::{
        CommonDirectoriesStrategy, DesktopShortcutStrategy, DiscoveryStrategy, PackagedAppStrategy,
        RegistryUninstallStrategy, ScanContext, ScanRoots, ShortcutResolver, StorePackageStrategy,
        registry::{RegistryHive, StaticRegistry, UninstallBranch, UninstallEntry},
        shell::{StartApp, StartAppsSource},
        shortcut::ShortcutTargetQuery,
    },
    icon::{IconDispatcher, IconOrigin, IconResolver},
    layout::{LayoutSlot, reconcile},
    scanner::AppScanner,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tempfile::TempDir;

fn write_file(path: &Path, size: usize) -> PathBuf {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, vec![0u8; size]).unwrap();
    path.to_path_buf()
}

fn roots(base: &Path) -> ScanRoots {
    ScanRoots {
        start_menu: base.join("Roaming").join("Start Menu").join("Programs"),
        common_start_menu: base.join("ProgramData").join("Start Menu").join("Programs"),
        desktop: base.join("Desktop"),
        program_files: base.join("Program Files"),
        program_files_x86: base.join("Program Files (x86)"),
        user_windows_apps: base.join("Local").join("WindowsApps"),
        machine_windows_apps: base.join("Program Files").join("WindowsApps"),
        system_root: base.join("Windows"),
    }
}

/// Shortcuts named after an existing file resolve to it; the rest are broken
struct ByName(PathBuf);

impl ShortcutTargetQuery for ByName {
    fn query_targets(&self, shortcuts: &[PathBuf]) -> appscout::Result<HashMap<PathBuf, PathBuf>> {
        Ok(shortcuts
            .iter()
            .map(|shortcut| {
                let stem = shortcut.file_stem().unwrap().to_string_lossy().into_owned();
                (shortcut.clone(), self.0.join(format!("{stem}.exe")))
            })
            .collect())
    }
}

struct NoShellApps;

impl StartAppsSource for NoShellApps {
    fn start_apps(&self) -> appscout::Result<Vec<StartApp>> {
        Err(appscout::AppScoutError::ExternalProcess {
            program: "powershell".into(),
            reason: "not available in tests".into(),
        })
    }
}

struct OneShellApp;

impl StartAppsSource for OneShellApp {
    fn start_apps(&self) -> appscout::Result<Vec<StartApp>> {
        Ok(vec![StartApp {
            name: "Calculator".into(),
            app_id: "Microsoft.WindowsCalculator_8wekyb3d8bbwe!App".into(),
        }])
    }
}

/// A machine with one app reachable from three sources
struct Machine {
    dir: TempDir,
    registry: StaticRegistry,
    shared_exe: PathBuf,
}

impl Machine {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let roots = roots(dir.path());

        // Contoso Editor: shortcut, vendor folder and uninstall entry
        let install = roots.program_files.join("Contoso");
        let shared_exe = write_file(&install.join("Editor.exe"), 4096);
        write_file(&install.join("unins000.exe"), 16);
        write_file(&roots.start_menu.join("Contoso").join("Editor.lnk"), 8);

        // Broken shortcut
        write_file(&roots.desktop.join("Ghost.lnk"), 8);

        let registry = StaticRegistry::new()
            .with_uninstall(
                UninstallBranch::MachineNative,
                UninstallEntry {
                    key_name: "Contoso".into(),
                    display_name: "Contoso Editor".into(),
                    publisher: "Contoso Ltd".into(),
                    install_location: install.to_string_lossy().into_owned(),
                    display_icon: Some(format!("\"{}\",0", shared_exe.display())),
                },
            )
            .with_package(RegistryHive::CurrentUser, Default::default());

        Self {
            dir,
            registry,
            shared_exe,
        }
    }

    fn context(&self, config: ScanConfig) -> ScanContext {
        ScanContext::new(
            roots(self.dir.path()),
            config,
            IconDispatcher::default(),
            Arc::new(self.registry.clone()),
        )
    }

    fn config() -> ScanConfig {
        ScanConfig {
            common_directory_vendors: vec!["Contoso".into()],
            ..ScanConfig::default()
        }
    }

    fn scanner(&self) -> AppScanner {
        self.scanner_with(Self::config())
    }

    fn scanner_with(&self, config: ScanConfig) -> AppScanner {
        let install = roots(self.dir.path()).program_files.join("Contoso");
        let resolver = ShortcutResolver::new(Arc::new(ByName(install)));
        AppScanner::new(self.context(config))
            .with_strategy(Box::new(DesktopShortcutStrategy::new(resolver)))
            .with_strategy(Box::new(CommonDirectoriesStrategy))
            .with_strategy(Box::new(RegistryUninstallStrategy))
            .with_strategy(Box::new(PackagedAppStrategy::new(Arc::new(NoShellApps))))
            .with_strategy(Box::new(StorePackageStrategy))
    }
}

#[test]
fn test_same_app_from_three_sources_is_listed_once() {
    let machine = Machine::new();
    let outcome = machine.scanner().scan_with_report();

    let id = machine.shared_exe.to_string_lossy();
    let matching: Vec<&ApplicationRecord> =
        outcome.records.iter().filter(|r| r.id == id).collect();
    assert_eq!(matching.len(), 1);

    // Shortcut strategy is registered first and wins
    assert_eq!(matching[0].source, DiscoverySource::DesktopShortcut);
    assert_eq!(matching[0].name, "Editor");
    assert_eq!(outcome.report.duplicates_dropped, 2);
}

#[test]
fn test_broken_shortcut_and_uninstaller_are_not_listed() {
    let machine = Machine::new();
    let records = machine.scanner().scan_installed_applications();

    assert_eq!(records.len(), 1);
    assert!(records.iter().all(|r| !r.id.contains("Ghost")));
    assert!(records.iter().all(|r| !r.id.contains("unins000")));
}

#[test]
fn test_repeated_scans_yield_same_ids() {
    let machine = Machine::new();
    let scanner = machine.scanner();

    let first: HashSet<String> = scanner
        .scan_installed_applications()
        .into_iter()
        .map(|r| r.id)
        .collect();
    let second: HashSet<String> = scanner
        .scan_installed_applications()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(first, second);
}

#[test]
fn test_empty_machine_with_failing_sources() {
    let dir = tempfile::tempdir().unwrap();
    let context = ScanContext::new(
        roots(&dir.path().join("does-not-exist")),
        ScanConfig::default(),
        IconDispatcher::default(),
        Arc::new(StaticRegistry::new()),
    );
    let scanner = AppScanner::new(context)
        .with_strategy(Box::new(DesktopShortcutStrategy::default()))
        .with_strategy(Box::new(CommonDirectoriesStrategy))
        .with_strategy(Box::new(RegistryUninstallStrategy))
        .with_strategy(Box::new(PackagedAppStrategy::new(Arc::new(NoShellApps))))
        .with_strategy(Box::new(StorePackageStrategy));

    let outcome = scanner.scan_with_report();
    assert!(outcome.records.is_empty());
    assert!(outcome.report.panicked().next().is_none());
}

/// Restores directory permissions when the test ends, even on failure
#[cfg(unix)]
struct Unlock(Vec<PathBuf>);

#[cfg(unix)]
impl Drop for Unlock {
    fn drop(&mut self) {
        use std::os::unix::fs::PermissionsExt;
        for dir in &self.0 {
            let _ = std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755));
        }
    }
}

#[cfg(unix)]
#[test]
fn test_unreadable_directories_are_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let machine = Machine::new();
    let roots = roots(machine.dir.path());
    let locked_vendor = roots.program_files.join("Locked");
    write_file(&locked_vendor.join("Locked.exe"), 64);
    write_file(
        &roots
            .machine_windows_apps
            .join("Locked.App_1.0.0.0_x64__pub")
            .join("app.exe"),
        64,
    );

    let locked = Unlock(vec![locked_vendor.clone(), roots.machine_windows_apps.clone()]);
    for dir in &locked.0 {
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o000)).unwrap();
    }
    if std::fs::read_dir(&locked_vendor).is_ok() {
        // Running as root: permission bits are not enforced
        return;
    }

    let config = ScanConfig {
        common_directory_vendors: vec!["Contoso".into(), "Locked".into()],
        ..ScanConfig::default()
    };
    let outcome = machine.scanner_with(config).scan_with_report();

    assert!(outcome.report.panicked().next().is_none());
    assert!(outcome.records.iter().all(|r| !r.id.contains("Locked")));
    let shared = machine.shared_exe.to_string_lossy();
    assert!(outcome.records.iter().any(|r| r.id == shared));
    let common = outcome
        .report
        .strategies
        .iter()
        .find(|t| t.name == "common-directories")
        .unwrap();
    assert_eq!(common.produced, 1);
}

#[test]
fn test_smallest_executable_chosen_without_icon_path() {
    let dir = tempfile::tempdir().unwrap();
    let install = dir.path().join("Fabrikam");
    write_file(&install.join("Big.exe"), 2 * 1024 * 1024);
    let small = write_file(&install.join("Small.exe"), 200 * 1024);

    let registry = StaticRegistry::new().with_uninstall(
        UninstallBranch::MachineWow64,
        UninstallEntry {
            key_name: "Fabrikam".into(),
            display_name: "Fabrikam Suite".into(),
            publisher: "Fabrikam".into(),
            install_location: install.to_string_lossy().into_owned(),
            display_icon: None,
        },
    );
    let context = ScanContext::new(
        roots(dir.path()),
        ScanConfig::default(),
        IconDispatcher::default(),
        Arc::new(registry),
    );

    let records = RegistryUninstallStrategy.scan(&context);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].executable_path, small.to_string_lossy());
    assert_eq!(records[0].display_name, "Fabrikam Suite");
}

#[test]
fn test_store_package_display_name_is_cleaned() {
    let dir = tempfile::tempdir().unwrap();
    let roots = roots(dir.path());
    write_file(
        &roots
            .user_windows_apps
            .join("ContosoPhotoEditor_1.4.0.0_x64__8wekyb3d8bbwe")
            .join("PhotoEditor.exe"),
        64,
    );
    let context = ScanContext::new(
        roots,
        ScanConfig::default(),
        IconDispatcher::default(),
        Arc::new(StaticRegistry::new()),
    );

    let records = StorePackageStrategy.scan(&context);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].display_name, "Contoso Photo Editor");
    assert!(records[0].id.starts_with("store-package:"));
}

#[test]
fn test_deferred_icons_arrive_once_per_record() {
    let machine = Machine::new();
    let (tx, rx) = mpsc::channel();
    let icons = IconDispatcher::new(IconResolver::new()).with_updates(tx);
    let context = ScanContext::new(
        roots(machine.dir.path()),
        Machine::config(),
        icons.clone(),
        Arc::new(machine.registry.clone()),
    );

    let scanner = AppScanner::new(context).with_strategy(Box::new(CommonDirectoriesStrategy));
    let records = scanner.scan_installed_applications();
    assert!(icons.wait_idle(Duration::from_secs(10)));

    let updates: Vec<_> = rx.try_iter().collect();
    assert_eq!(updates.len(), records.len());
    for record in &records {
        assert!(record.is_icon_resolved());
        assert_ne!(record.icon().origin(), IconOrigin::Placeholder);
    }
}

#[test]
fn test_shell_apps_carry_package_badge() {
    let dir = tempfile::tempdir().unwrap();
    let context = ScanContext::new(
        roots(dir.path()),
        ScanConfig::default(),
        IconDispatcher::default(),
        Arc::new(StaticRegistry::new()),
    );
    let scanner = AppScanner::new(context)
        .with_strategy(Box::new(PackagedAppStrategy::new(Arc::new(OneShellApp))));

    let records = scanner.scan_installed_applications();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].icon().origin(), IconOrigin::Package);
    assert!(records[0].executable_path.starts_with("shell:AppsFolder\\"));
}

#[test]
fn test_layout_reconciliation_after_scan() {
    let machine = Machine::new();
    let records = machine.scanner().scan_installed_applications();
    let saved = vec![
        "C:\\Removed\\old.exe".to_string(),
        machine.shared_exe.to_string_lossy().into_owned(),
    ];

    let slots = reconcile(&saved, &records);
    assert!(matches!(&slots[0], LayoutSlot::Missing(m) if m.icon().origin() == IconOrigin::Missing));
    assert!(matches!(&slots[1], LayoutSlot::Present(r) if r.source == DiscoverySource::DesktopShortcut));
}

#[test]
fn test_deduplicate_is_stable_first_wins() {
    let records = vec![
        ApplicationRecord::new("x", "first", "x", DiscoverySource::PackagedShell),
        ApplicationRecord::new("y", "other", "y", DiscoverySource::PackagedShell),
        ApplicationRecord::new("x", "second", "x", DiscoverySource::PackagedRegistry),
    ];
    let merged = deduplicate_by_id(records);
    let names: Vec<_> = merged.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["first", "other"]);
}
