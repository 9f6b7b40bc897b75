//! Shortcut target resolution
//!
//! Shortcuts are resolved in batches: every `.lnk` that has no sibling
//! executable goes into one query, so a scan starts at most one PowerShell
//! process no matter how many shortcuts the Start Menu holds.

use super::shell::{parse_json_rows, run_powershell};
use crate::error::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Environment variable carrying the path of the shortcut list file
const SHORTCUT_LIST_ENV: &str = "APPSCOUT_SHORTCUT_LIST";

const TARGETS_SCRIPT: &str = "[Console]::OutputEncoding = [System.Text.Encoding]::UTF8; \
     $shell = New-Object -ComObject WScript.Shell; \
     Get-Content -LiteralPath $env:APPSCOUT_SHORTCUT_LIST -Encoding UTF8 | \
     Where-Object { $_ } | \
     ForEach-Object { \
         $target = ''; \
         try { $target = $shell.CreateShortcut($_).TargetPath } catch { }; \
         [PSCustomObject]@{ Path = $_; Target = $target } \
     } | ConvertTo-Json -Compress";

/// Reads the targets stored in `.lnk` files
pub trait ShortcutTargetQuery: Send + Sync {
    /// Stored targets of `shortcuts`, keyed by the shortcut paths passed in
    ///
    /// Shortcuts without a file target are left out of the map.
    ///
    /// # Errors
    ///
    /// Returns an error if the shortcuts cannot be read at all.
    fn query_targets(&self, shortcuts: &[PathBuf]) -> Result<HashMap<PathBuf, PathBuf>>;
}

#[derive(Deserialize)]
struct RawShortcutTarget {
    #[serde(rename = "Path")]
    path: Option<String>,
    #[serde(rename = "Target")]
    target: Option<String>,
}

/// Map `ConvertTo-Json` rows of `{Path, Target}` back onto `shortcuts`
///
/// Rows naming a shortcut that was not asked for, or carrying an empty
/// target, are dropped.
pub(crate) fn parse_shortcut_targets(
    output: &str,
    shortcuts: &[PathBuf],
) -> Result<HashMap<PathBuf, PathBuf>> {
    let by_text: HashMap<String, &PathBuf> = shortcuts
        .iter()
        .map(|path| (path.to_string_lossy().into_owned(), path))
        .collect();

    let rows: Vec<RawShortcutTarget> = parse_json_rows(output)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let shortcut = by_text.get(row.path?.trim())?;
            let target = row.target?.trim().to_string();
            (!target.is_empty()).then(|| ((*shortcut).clone(), PathBuf::from(target)))
        })
        .collect())
}

/// Asks the Windows Script Host through a single PowerShell run
///
/// The shortcut paths are written to a temporary file whose path is handed
/// over in an environment variable, so no path is ever spliced into the
/// script and the list is not bound by the environment block size.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerShellShortcutQuery;

impl ShortcutTargetQuery for PowerShellShortcutQuery {
    fn query_targets(&self, shortcuts: &[PathBuf]) -> Result<HashMap<PathBuf, PathBuf>> {
        if shortcuts.is_empty() {
            return Ok(HashMap::new());
        }

        let mut list = tempfile::Builder::new()
            .prefix("appscout-shortcuts")
            .suffix(".txt")
            .tempfile()?;
        for shortcut in shortcuts {
            writeln!(list, "{}", shortcut.to_string_lossy())?;
        }
        list.flush()?;

        let stdout = run_powershell(TARGETS_SCRIPT, &[(SHORTCUT_LIST_ENV, list.path().as_os_str())])?;
        parse_shortcut_targets(&stdout, shortcuts)
    }
}

/// Maps shortcuts to the files they launch
#[derive(Clone)]
pub struct ShortcutResolver {
    query: Arc<dyn ShortcutTargetQuery>,
}

impl Default for ShortcutResolver {
    fn default() -> Self {
        Self::new(Arc::new(PowerShellShortcutQuery))
    }
}

impl ShortcutResolver {
    /// Resolver backed by `query`
    pub fn new(query: Arc<dyn ShortcutTargetQuery>) -> Self {
        Self { query }
    }

    /// Best-effort target of `shortcut`
    ///
    /// An `.exe` next to the shortcut with the same stem wins without reading
    /// the shortcut. Otherwise the stored target is used if it exists. When
    /// neither works the shortcut path itself comes back, which callers treat
    /// as unresolved.
    pub fn resolve_target(&self, shortcut: &Path) -> PathBuf {
        self.resolve_targets(&[shortcut.to_path_buf()])
            .pop()
            .unwrap_or_else(|| shortcut.to_path_buf())
    }

    /// [`ShortcutResolver::resolve_target`] for many shortcuts at once
    ///
    /// The result lines up with `shortcuts`. The underlying query runs at most
    /// once, and not at all when every shortcut has a sibling executable.
    pub fn resolve_targets(&self, shortcuts: &[PathBuf]) -> Vec<PathBuf> {
        let siblings: Vec<Option<PathBuf>> = shortcuts
            .iter()
            .map(|shortcut| {
                let sibling = shortcut.with_extension("exe");
                sibling.is_file().then_some(sibling)
            })
            .collect();

        let pending: Vec<PathBuf> = shortcuts
            .iter()
            .zip(&siblings)
            .filter(|(_, sibling)| sibling.is_none())
            .map(|(shortcut, _)| shortcut.clone())
            .collect();

        let stored = if pending.is_empty() {
            HashMap::new()
        } else {
            match self.query.query_targets(&pending) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!("Could not read {} shortcuts: {e}", pending.len());
                    HashMap::new()
                }
            }
        };

        shortcuts
            .iter()
            .zip(siblings)
            .map(|(shortcut, sibling)| {
                sibling.unwrap_or_else(|| existing_target(shortcut, stored.get(shortcut)))
            })
            .collect()
    }
}

/// Stored target if it exists, otherwise the shortcut itself
fn existing_target(shortcut: &Path, stored: Option<&PathBuf>) -> PathBuf {
    match stored {
        Some(target) if target.exists() => target.clone(),
        Some(target) => {
            debug!(
                "Shortcut {} points at missing {}",
                shortcut.display(),
                target.display()
            );
            shortcut.to_path_buf()
        }
        None => shortcut.to_path_buf(),
    }
}

impl std::fmt::Debug for ShortcutResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortcutResolver").finish_non_exhaustive()
    }
}
