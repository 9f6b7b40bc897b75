//! Application record model
//!
//! An [`ApplicationRecord`] is one launchable application found during a scan.
//! Two records with the same `id` describe the same application, whichever
//! strategy produced them; equality and hashing only look at `id`.

use crate::icon::{AppIcon, generated};
use serde::Serialize;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Which discovery source produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    /// Start Menu or Desktop shortcut
    DesktopShortcut,
    /// Vendor directory under Program Files
    CommonDirectory,
    /// Uninstall registry entry
    RegistryUninstall,
    /// Packaged app manifest found in the Start Menu tree
    PackagedManifest,
    /// Packaged app reported by the shell enumeration command
    PackagedShell,
    /// Packaged app from the package repository registry branch
    PackagedRegistry,
    /// Directory under a Store package install root
    StorePackageDirectory,
}

impl DiscoverySource {
    /// Prefix used to synthesize ids for records that have no real file path
    pub fn id_tag(self) -> Option<&'static str> {
        match self {
            Self::PackagedManifest => Some("uwp-manifest"),
            Self::PackagedShell => Some("uwp-shell"),
            Self::PackagedRegistry => Some("uwp-registry"),
            Self::StorePackageDirectory => Some("store-package"),
            Self::DesktopShortcut | Self::CommonDirectory | Self::RegistryUninstall => None,
        }
    }

    /// Short label for listings
    pub fn label(self) -> &'static str {
        match self {
            Self::DesktopShortcut => "shortcut",
            Self::CommonDirectory => "program-files",
            Self::RegistryUninstall => "uninstall",
            Self::PackagedManifest => "package-manifest",
            Self::PackagedShell => "package-shell",
            Self::PackagedRegistry => "package-registry",
            Self::StorePackageDirectory => "store-package",
        }
    }

    /// Build a tagged id such as `uwp-shell:Microsoft.WindowsCalculator_8wekyb3d8bbwe!App`
    ///
    /// Sources without a tag use `value` unchanged.
    pub fn synthesize_id(self, value: &str) -> String {
        match self.id_tag() {
            Some(tag) => format!("{tag}:{value}"),
            None => value.to_string(),
        }
    }
}

/// One-shot icon holder shared by every clone of a record
///
/// Starts at a placeholder and can be completed exactly once.
#[derive(Clone)]
pub struct IconSlot {
    inner: Arc<IconSlotInner>,
}

struct IconSlotInner {
    placeholder: AppIcon,
    resolved: OnceLock<AppIcon>,
}

impl IconSlot {
    /// Slot showing `placeholder` until completed
    pub fn pending(placeholder: AppIcon) -> Self {
        Self {
            inner: Arc::new(IconSlotInner {
                placeholder,
                resolved: OnceLock::new(),
            }),
        }
    }

    /// Slot that is already complete
    pub fn resolved(icon: AppIcon) -> Self {
        let resolved = OnceLock::new();
        let _ = resolved.set(icon.clone());
        Self {
            inner: Arc::new(IconSlotInner {
                placeholder: icon,
                resolved,
            }),
        }
    }

    /// Resolved icon if available, otherwise the placeholder
    pub fn current(&self) -> AppIcon {
        self.inner
            .resolved
            .get()
            .unwrap_or(&self.inner.placeholder)
            .clone()
    }

    /// True once the slot has been completed
    pub fn is_resolved(&self) -> bool {
        self.inner.resolved.get().is_some()
    }

    /// Complete the slot; returns `false` if it was already complete
    pub fn complete(&self, icon: AppIcon) -> bool {
        self.inner.resolved.set(icon).is_ok()
    }
}

impl std::fmt::Debug for IconSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconSlot")
            .field("resolved", &self.is_resolved())
            .field("current", &self.current().origin())
            .finish()
    }
}

/// A discovered, launchable application
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationRecord {
    /// Canonical identity (executable path or tagged synthetic id)
    pub id: String,
    /// Name as found at the source
    pub name: String,
    /// Cleaned name for display
    pub display_name: String,
    /// Launch target; may be a `shell:AppsFolder\...` string for packaged apps
    pub executable_path: String,
    /// True for applications shipped with Windows
    pub is_system_app: bool,
    /// Strategy that produced the record
    pub source: DiscoverySource,
    #[serde(skip)]
    icon: IconSlot,
}

impl ApplicationRecord {
    /// Create a record showing the placeholder icon
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        executable_path: impl Into<String>,
        source: DiscoverySource,
    ) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            display_name: name.clone(),
            name,
            executable_path: executable_path.into(),
            is_system_app: false,
            source,
            icon: IconSlot::pending(generated::placeholder_icon()),
        }
    }

    /// Replace the display name
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Mark the record as a system application
    #[must_use]
    pub fn with_system_app(mut self, is_system_app: bool) -> Self {
        self.is_system_app = is_system_app;
        self
    }

    /// Attach an icon that is already resolved
    #[must_use]
    pub fn with_icon(mut self, icon: AppIcon) -> Self {
        self.icon = IconSlot::resolved(icon);
        self
    }

    /// Current icon (placeholder until resolved)
    pub fn icon(&self) -> AppIcon {
        self.icon.current()
    }

    /// Shared icon slot
    pub fn icon_slot(&self) -> &IconSlot {
        &self.icon
    }

    /// True once the icon has left its placeholder state
    pub fn is_icon_resolved(&self) -> bool {
        self.icon.is_resolved()
    }
}

impl PartialEq for ApplicationRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ApplicationRecord {}

impl Hash for ApplicationRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Drop records whose `id` was already seen, keeping the first occurrence
///
/// Order of the surviving records is preserved, so the order in which sources
/// were concatenated decides which duplicate wins. Matching is exact string
/// equality: different casings or path spellings are distinct ids.
pub fn deduplicate_by_id(
    records: impl IntoIterator<Item = ApplicationRecord>,
) -> Vec<ApplicationRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .collect()
}
