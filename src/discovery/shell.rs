//! PowerShell helpers
//!
//! Runs short PowerShell scripts without a console window and parses the
//! JSON that `Get-StartApps | ConvertTo-Json` prints. Values are handed to
//! scripts through environment variables and never spliced into the script
//! text.

use crate::error::{AppScoutError, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::ffi::OsStr;
use std::process::{Command, Stdio};
use tracing::debug;

const POWERSHELL: &str = "powershell";

const START_APPS_SCRIPT: &str = "[Console]::OutputEncoding = [System.Text.Encoding]::UTF8; \
     Get-StartApps | Select-Object Name, AppID | ConvertTo-Json -Compress";

/// One entry reported by `Get-StartApps`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartApp {
    /// Display name
    pub name: String,
    /// Application user model id, e.g. `Microsoft.WindowsCalculator_8wekyb3d8bbwe!App`
    pub app_id: String,
}

#[derive(Deserialize)]
struct RawStartApp {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "AppID")]
    app_id: Option<String>,
}

/// `ConvertTo-Json` prints a bare object when there is exactly one result
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// Rows of `ConvertTo-Json` output, whether it printed an array or one object
///
/// Empty output (no rows at all) is an empty list.
pub(crate) fn parse_json_rows<T: DeserializeOwned>(output: &str) -> Result<Vec<T>> {
    // PowerShell may prefix UTF-8 output with a BOM
    let output = output.trim_start_matches('\u{feff}').trim();
    if output.is_empty() {
        return Ok(Vec::new());
    }

    Ok(match serde_json::from_str::<OneOrMany<T>>(output)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}

/// Parse `Get-StartApps` JSON output
///
/// Accepts an array or a single object. Empty output is an empty list.
/// Entries without a name or app id are dropped.
///
/// # Errors
///
/// Returns [`AppScoutError::JsonError`] if the output is not JSON of either shape.
pub fn parse_start_apps(output: &str) -> Result<Vec<StartApp>> {
    let raw: Vec<RawStartApp> = parse_json_rows(output)?;

    Ok(raw
        .into_iter()
        .filter_map(|item| {
            let name = item.name.map(|n| n.trim().to_string()).unwrap_or_default();
            let app_id = item.app_id.map(|a| a.trim().to_string()).unwrap_or_default();
            if name.is_empty() || app_id.is_empty() {
                let error = AppScoutError::malformed(
                    format!("{name:?} / {app_id:?}"),
                    "start app entry without Name or AppID",
                );
                debug!("Skipping: {error}");
                return None;
            }
            Some(StartApp { name, app_id })
        })
        .collect())
}

/// Source of the shell's application list
pub trait StartAppsSource: Send + Sync {
    /// Every entry the shell reports
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be obtained or parsed.
    fn start_apps(&self) -> Result<Vec<StartApp>>;
}

/// Runs `Get-StartApps` through PowerShell
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerShellStartApps;

impl StartAppsSource for PowerShellStartApps {
    fn start_apps(&self) -> Result<Vec<StartApp>> {
        let stdout = run_powershell(START_APPS_SCRIPT, &[])?;
        parse_start_apps(&stdout)
    }
}

/// Run a script to completion and return its stdout
///
/// # Errors
///
/// Returns [`AppScoutError::ExternalProcess`] if PowerShell cannot be started
/// or exits with a non-zero status.
pub(crate) fn run_powershell(script: &str, env: &[(&str, &OsStr)]) -> Result<String> {
    let mut command = Command::new(POWERSHELL);
    command
        .args(["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass", "-Command", script])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env {
        command.env(key, value);
    }
    hide_console_window(&mut command);

    let output = command.output().map_err(|e| AppScoutError::ExternalProcess {
        program: POWERSHELL.to_string(),
        reason: format!("failed to start: {e}"),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppScoutError::ExternalProcess {
            program: POWERSHELL.to_string(),
            reason: format!("{}: {}", output.status, stderr.trim()),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(windows)]
fn hide_console_window(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    use windows::Win32::System::Threading::CREATE_NO_WINDOW;

    command.creation_flags(CREATE_NO_WINDOW.0);
}

#[cfg(not(windows))]
fn hide_console_window(_command: &mut Command) {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array() {
        let output = r#"[{"Name":"Calculator","AppID":"Microsoft.WindowsCalculator_8wekyb3d8bbwe!App"},
                         {"Name":"Paint","AppID":"Microsoft.Paint_8wekyb3d8bbwe!App"}]"#;
        let apps = parse_start_apps(output).unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].name, "Calculator");
        assert_eq!(apps[1].app_id, "Microsoft.Paint_8wekyb3d8bbwe!App");
    }

    #[test]
    fn test_parse_single_object() {
        let output = "\u{feff}{\"Name\":\"Terminal\",\"AppID\":\"Microsoft.WindowsTerminal_8wekyb3d8bbwe!App\"}\r\n";
        let apps = parse_start_apps(output).unwrap();
        assert_eq!(
            apps,
            [StartApp {
                name: "Terminal".into(),
                app_id: "Microsoft.WindowsTerminal_8wekyb3d8bbwe!App".into(),
            }]
        );
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_start_apps("").unwrap().is_empty());
        assert!(parse_start_apps("  \r\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_drops_incomplete_entries() {
        let output = r#"[{"Name":"","AppID":"x"},{"Name":"Only name"},{"Name":"Ok","AppID":"ok!App"}]"#;
        let apps = parse_start_apps(output).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "Ok");
    }

    #[test]
    fn test_parse_malformed_is_error() {
        assert!(parse_start_apps("Get-StartApps : not recognized").is_err());
        assert!(parse_start_apps("[{\"Name\":").is_err());
        assert!(parse_start_apps("42").is_err());
    }
}
