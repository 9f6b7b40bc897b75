//! Start Menu and Desktop shortcuts

use super::{DiscoveryStrategy, ScanContext, ShortcutResolver, executable_record, has_extension, walk_files};
use crate::apps::{ApplicationRecord, DiscoverySource};
use crate::utils::filters::is_excluded_executable;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Start Menu folders nest a few levels at most
const MAX_SHORTCUT_DEPTH: usize = 8;

/// Resolves `.lnk` files in the user's Start Menu and on the Desktop
#[derive(Debug, Clone, Default)]
pub struct DesktopShortcutStrategy {
    resolver: ShortcutResolver,
}

impl DesktopShortcutStrategy {
    /// Strategy using a specific resolver
    pub fn new(resolver: ShortcutResolver) -> Self {
        Self { resolver }
    }

    fn record_for(shortcut: &Path, target: &Path, ctx: &ScanContext) -> Option<ApplicationRecord> {
        if target == shortcut || !target.is_file() {
            debug!("Unresolved shortcut {}", shortcut.display());
            return None;
        }
        if is_excluded_executable(target) {
            debug!("Excluded shortcut target {}", target.display());
            return None;
        }

        let name = shortcut
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let icon = ctx.icons.resolve_now(&target.to_string_lossy());
        Some(
            executable_record(target, name, DiscoverySource::DesktopShortcut, &ctx.roots)
                .with_icon(icon),
        )
    }
}

impl DiscoveryStrategy for DesktopShortcutStrategy {
    fn name(&self) -> &'static str {
        "desktop-shortcuts"
    }

    fn scan(&self, ctx: &ScanContext) -> Vec<ApplicationRecord> {
        let shortcuts: Vec<PathBuf> = [&ctx.roots.start_menu, &ctx.roots.desktop]
            .into_iter()
            .filter(|root| !root.as_os_str().is_empty())
            .flat_map(|root| walk_files(root, MAX_SHORTCUT_DEPTH))
            .filter(|path| has_extension(path, "lnk"))
            .collect();

        // One batched lookup; only icon extraction fans out
        let targets = self.resolver.resolve_targets(&shortcuts);
        let records: Vec<ApplicationRecord> = shortcuts
            .par_iter()
            .zip(targets.par_iter())
            .filter_map(|(shortcut, target)| Self::record_for(shortcut, target, ctx))
            .collect();

        info!(
            "Resolved {} of {} shortcuts",
            records.len(),
            shortcuts.len()
        );
        records
    }
}
