//! Application discovery strategies
//!
//! Each strategy reads one family of operating-system sources and returns
//! its own list of records. Strategies never return errors: sources that
//! cannot be opened and items that cannot be parsed are logged and skipped.
//!
//! | Strategy | Source |
//! |----------|--------|
//! | [`DesktopShortcutStrategy`] | `.lnk` files in the Start Menu and on the Desktop |
//! | [`CommonDirectoriesStrategy`] | vendor folders under Program Files |
//! | [`RegistryUninstallStrategy`] | uninstall registry branches |
//! | [`PackagedAppStrategy`] | package manifests, `Get-StartApps`, package repository |
//! | [`StorePackageStrategy`] | `WindowsApps` package directories |

pub mod common_dirs;
pub mod desktop;
pub mod packaged;
pub mod registry;
pub mod shell;
pub mod shortcut;
pub mod store;
pub mod uninstall;

pub use common_dirs::CommonDirectoriesStrategy;
pub use desktop::DesktopShortcutStrategy;
pub use packaged::PackagedAppStrategy;
pub use registry::{RegistryView, SystemRegistry};
pub use shortcut::ShortcutResolver;
pub use store::StorePackageStrategy;
pub use uninstall::RegistryUninstallStrategy;

use crate::apps::{ApplicationRecord, DiscoverySource};
use crate::config::ScanConfig;
use crate::icon::IconDispatcher;
use crate::utils::filters::{is_excluded_executable, is_system_location};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A single source family of installed applications
pub trait DiscoveryStrategy: Send + Sync {
    /// Short name used in logs and scan reports
    fn name(&self) -> &'static str;

    /// Enumerate the source and build records
    ///
    /// Must not fail; unavailable sources produce an empty list.
    fn scan(&self, ctx: &ScanContext) -> Vec<ApplicationRecord>;
}

/// Well-known directories the strategies read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRoots {
    /// `%APPDATA%\Microsoft\Windows\Start Menu\Programs`
    pub start_menu: PathBuf,
    /// `%ProgramData%\Microsoft\Windows\Start Menu\Programs`
    pub common_start_menu: PathBuf,
    /// `%USERPROFILE%\Desktop`
    pub desktop: PathBuf,
    /// `%ProgramFiles%`
    pub program_files: PathBuf,
    /// `%ProgramFiles(x86)%`
    pub program_files_x86: PathBuf,
    /// `%LOCALAPPDATA%\Microsoft\WindowsApps`
    pub user_windows_apps: PathBuf,
    /// `%ProgramFiles%\WindowsApps`
    pub machine_windows_apps: PathBuf,
    /// `%SystemRoot%`
    pub system_root: PathBuf,
}

impl ScanRoots {
    /// Derive the roots from the process environment
    ///
    /// Variables that are not set leave their root empty, which strategies
    /// treat like a directory that does not exist. Program Files and the
    /// Windows directory fall back to their usual locations.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var_os(name).map(PathBuf::from);
        let start_menu_under = |base: Option<PathBuf>| {
            base.map(|b| b.join("Microsoft").join("Windows").join("Start Menu").join("Programs"))
                .unwrap_or_default()
        };

        let program_files =
            var("ProgramFiles").unwrap_or_else(|| PathBuf::from("C:\\Program Files"));
        let program_files_x86 = var("ProgramFiles(x86)")
            .unwrap_or_else(|| PathBuf::from("C:\\Program Files (x86)"));

        Self {
            start_menu: start_menu_under(var("APPDATA")),
            common_start_menu: start_menu_under(var("ProgramData")),
            desktop: var("USERPROFILE")
                .map(|p| p.join("Desktop"))
                .unwrap_or_default(),
            user_windows_apps: var("LOCALAPPDATA")
                .map(|p| p.join("Microsoft").join("WindowsApps"))
                .unwrap_or_default(),
            machine_windows_apps: program_files.join("WindowsApps"),
            system_root: var("SystemRoot").unwrap_or_else(|| PathBuf::from("C:\\Windows")),
            program_files,
            program_files_x86,
        }
    }
}

/// Everything a strategy needs for one scan
pub struct ScanContext {
    /// Directories to read
    pub roots: ScanRoots,
    /// Scan settings
    pub config: ScanConfig,
    /// Icon resolution, inline or deferred
    pub icons: IconDispatcher,
    /// Registry access
    pub registry: Arc<dyn RegistryView>,
}

impl ScanContext {
    /// Bundle the pieces of a scan
    pub fn new(
        roots: ScanRoots,
        config: ScanConfig,
        icons: IconDispatcher,
        registry: Arc<dyn RegistryView>,
    ) -> Self {
        Self {
            roots,
            config,
            icons,
            registry,
        }
    }

    /// Context for the current machine
    pub fn system(config: ScanConfig, icons: IconDispatcher) -> Self {
        Self::new(ScanRoots::from_env(), config, icons, Arc::new(SystemRegistry))
    }
}

impl std::fmt::Debug for ScanContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanContext")
            .field("roots", &self.roots)
            .field("config", &self.config)
            .field("icons", &self.icons)
            .finish_non_exhaustive()
    }
}

/// Case-insensitive extension check
pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// True for `.exe` files whose name is not excluded
pub(crate) fn is_candidate_executable(path: &Path) -> bool {
    has_extension(path, "exe") && !is_excluded_executable(path)
}

/// Files below `root` down to `max_depth`, in name order
///
/// Entries that cannot be read are logged and skipped. A root that cannot
/// be listed is reported at `warn`; a missing root yields nothing.
pub(crate) fn walk_files(root: &Path, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => entry.file_type().is_file().then(|| entry.into_path()),
            Err(e) if e.depth() == 0 && !is_not_found(&e) => {
                warn!("Skipping unreadable directory: {e}");
                None
            }
            Err(e) => {
                debug!("Skipping unreadable entry: {e}");
                None
            }
        })
}

fn is_not_found(error: &walkdir::Error) -> bool {
    error
        .io_error()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
}

/// Immediate subdirectories of `root`, in name order
pub(crate) fn child_directories(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)?
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Final path component as text
pub(crate) fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Record for a conventional executable: `id` and launch target are its path
pub(crate) fn executable_record(
    path: &Path,
    name: impl Into<String>,
    source: DiscoverySource,
    roots: &ScanRoots,
) -> ApplicationRecord {
    let path_text = path.to_string_lossy();
    ApplicationRecord::new(&*path_text, name, &*path_text, source)
        .with_system_app(is_system_location(path, &roots.system_root))
}
