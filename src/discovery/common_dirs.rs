//! Vendor folders under Program Files

use super::{DiscoveryStrategy, ScanContext, executable_record, is_candidate_executable, walk_files};
use crate::apps::{ApplicationRecord, DiscoverySource};
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Files directly in the vendor folder plus one level below it
const VENDOR_DEPTH: usize = 2;

/// Collects executables from an allow-list of vendor folders
///
/// Icons are fetched in the background.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonDirectoriesStrategy;

impl CommonDirectoriesStrategy {
    /// Existing vendor folders, 64-bit root first
    fn vendor_dirs(ctx: &ScanContext) -> Vec<PathBuf> {
        let mut roots = vec![&ctx.roots.program_files];
        if ctx.roots.program_files_x86 != ctx.roots.program_files {
            roots.push(&ctx.roots.program_files_x86);
        }

        roots
            .into_iter()
            .filter(|root| !root.as_os_str().is_empty())
            .flat_map(|root| {
                ctx.config
                    .common_directory_vendors
                    .iter()
                    .map(move |vendor| root.join(vendor))
            })
            .filter(|dir| {
                let exists = dir.is_dir();
                if !exists {
                    debug!("Vendor folder not present: {}", dir.display());
                }
                exists
            })
            .collect()
    }
}

impl DiscoveryStrategy for CommonDirectoriesStrategy {
    fn name(&self) -> &'static str {
        "common-directories"
    }

    fn scan(&self, ctx: &ScanContext) -> Vec<ApplicationRecord> {
        let dirs = Self::vendor_dirs(ctx);

        let per_dir: Vec<Vec<ApplicationRecord>> = dirs
            .par_iter()
            .map(|dir| {
                walk_files(dir, VENDOR_DEPTH)
                    .filter(|path| is_candidate_executable(path))
                    .map(|path| {
                        let name = path
                            .file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        executable_record(&path, name, DiscoverySource::CommonDirectory, &ctx.roots)
                    })
                    .collect()
            })
            .collect();

        let records: Vec<ApplicationRecord> = per_dir.into_iter().flatten().collect();
        for record in &records {
            ctx.icons.defer(record);
        }

        info!(
            "Found {} executables in {} vendor folders",
            records.len(),
            dirs.len()
        );
        records
    }
}
