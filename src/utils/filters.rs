//! Identity and filtering helpers
//!
//! Pure string heuristics shared by the discovery strategies. Paths are
//! handled as text with either separator so that Windows paths behave the
//! same way when the helpers run elsewhere.

use std::path::Path;

/// Filename fragments that mark installers, updaters and other support binaries
pub const EXCLUDED_KEYWORDS: &[&str] = &[
    "install", "unins", "setup", "update", "helper", "service", "runtime", "launcher", "crash",
    "debug", "diagnos", "repair", "redist",
];

/// Publisher or location fragments that mark Store / MSIX distributed apps
pub const PACKAGED_INDICATORS: &[&str] = &[
    "microsoft store",
    "windows store",
    "appx",
    "msix",
    "windowsapps",
];

/// Name of the directory packaged apps are installed under
pub const PACKAGED_ROOT_NAME: &str = "WindowsApps";

/// Final path component, splitting on both `\` and `/`
fn file_name(path: &str) -> &str {
    path.rfind(['\\', '/']).map_or(path, |pos| &path[pos + 1..])
}

/// True when the executable's filename looks like a support binary
///
/// Only the filename is inspected, so an app installed under
/// `C:\Setup Files\` is not excluded because of its directory.
pub fn is_excluded_executable(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref().to_string_lossy();
    let name = file_name(&path).to_lowercase();
    EXCLUDED_KEYWORDS.iter().any(|keyword| name.contains(keyword))
}

/// True when an uninstall entry describes a Store / MSIX distributed app
///
/// The display name is accepted for symmetry with the uninstall entry but
/// does not influence the result.
pub fn is_packaged_distribution_indicator(
    _display_name: &str,
    publisher: &str,
    install_location: &str,
) -> bool {
    let publisher = publisher.to_lowercase();
    let location = install_location.to_lowercase();

    PACKAGED_INDICATORS
        .iter()
        .any(|indicator| publisher.contains(indicator) || location.contains(indicator))
        || install_location.contains(PACKAGED_ROOT_NAME)
}

/// Turn a package directory name into something readable
///
/// Everything from the first `_` on is dropped (version, architecture and
/// publisher hash), then a space is inserted at every lowercase to uppercase
/// transition. A name that would come out empty is returned trimmed instead.
pub fn clean_package_display_name(dir_name: &str) -> String {
    let base = dir_name.split('_').next().unwrap_or_default().trim();
    if base.is_empty() {
        return dir_name.trim().to_string();
    }

    let mut cleaned = String::with_capacity(base.len() + 4);
    let mut previous_lower = false;
    for ch in base.chars() {
        if previous_lower && ch.is_uppercase() {
            cleaned.push(' ');
        }
        previous_lower = ch.is_lowercase();
        cleaned.push(ch);
    }
    cleaned
}

/// True when `path` lives below the Windows directory
///
/// Comparison ignores case and separator style.
pub fn is_system_location(path: impl AsRef<Path>, system_root: impl AsRef<Path>) -> bool {
    let normalize = |p: &Path| {
        p.to_string_lossy()
            .replace('/', "\\")
            .trim_end_matches('\\')
            .to_lowercase()
    };

    let root = normalize(system_root.as_ref());
    if root.is_empty() {
        return false;
    }
    let path = normalize(path.as_ref());
    path.strip_prefix(&root)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_executables() {
        assert!(is_excluded_executable("C:\\Apps\\MyApp-Uninstall.exe"));
        assert!(is_excluded_executable("SETUP.EXE"));
        assert!(is_excluded_executable("C:\\Tools\\UpdateHelper.exe"));
        assert!(is_excluded_executable("vc_redist.x64.exe"));
        assert!(is_excluded_executable("CrashReporter.exe"));
        assert!(!is_excluded_executable("C:\\Apps\\MyApp.exe"));
    }

    #[test]
    fn test_exclusion_ignores_directory() {
        assert!(!is_excluded_executable("C:\\Setup Files\\Editor.exe"));
        assert!(!is_excluded_executable("/opt/installer/bin/editor.exe"));
    }

    #[test]
    fn test_packaged_indicator_by_publisher() {
        assert!(is_packaged_distribution_indicator("App", "Microsoft Store", ""));
        assert!(is_packaged_distribution_indicator("App", "Contoso (MSIX)", ""));
        assert!(!is_packaged_distribution_indicator("App", "Contoso Ltd", "C:\\Apps"));
    }

    #[test]
    fn test_packaged_indicator_by_location() {
        assert!(is_packaged_distribution_indicator(
            "App",
            "",
            "C:\\Program Files\\WindowsApps\\Contoso.App_1.0.0.0_x64__abc"
        ));
        assert!(is_packaged_distribution_indicator("App", "", "D:\\Deploy\\app.appx"));
    }

    #[test]
    fn test_packaged_indicator_ignores_display_name() {
        assert!(!is_packaged_distribution_indicator("Windows Store Helper", "Contoso", "C:\\Apps"));
    }

    #[test]
    fn test_clean_package_display_name() {
        assert_eq!(
            clean_package_display_name("ContosoPhotoEditor_1.4.0.0_x64__8wekyb3d8bbwe"),
            "Contoso Photo Editor"
        );
        assert_eq!(clean_package_display_name("Notepad"), "Notepad");
        assert_eq!(clean_package_display_name("Microsoft.WindowsCalculator_11.0_x64__8w"), "Microsoft.Windows Calculator");
        assert_eq!(clean_package_display_name("HTMLViewer"), "HTMLViewer");
    }

    #[test]
    fn test_clean_package_display_name_degenerate() {
        assert_eq!(clean_package_display_name("_1.0_x64"), "_1.0_x64");
        assert_eq!(clean_package_display_name(""), "");
    }

    #[test]
    fn test_is_system_location() {
        assert!(is_system_location("C:\\Windows\\System32\\notepad.exe", "C:\\Windows"));
        assert!(is_system_location("c:/windows/explorer.exe", "C:\\Windows\\"));
        assert!(!is_system_location("C:\\WindowsApps\\x.exe", "C:\\Windows"));
        assert!(!is_system_location("C:\\Apps\\x.exe", ""));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any filename containing an excluded keyword is excluded, regardless of case
            #[test]
            fn keyword_in_filename_is_excluded(
                prefix in "[A-Za-z0-9]{0,8}",
                suffix in "[A-Za-z0-9]{0,8}",
                index in 0..EXCLUDED_KEYWORDS.len(),
                upper in any::<bool>(),
            ) {
                let keyword = if upper {
                    EXCLUDED_KEYWORDS[index].to_uppercase()
                } else {
                    EXCLUDED_KEYWORDS[index].to_string()
                };
                let path = format!("C:\\Program Files\\Vendor\\{prefix}{keyword}{suffix}.exe");
                prop_assert!(is_excluded_executable(&path));
            }

            /// Directory names never influence exclusion
            #[test]
            fn directory_never_excludes(dir in "[a-z ]{0,12}") {
                let path = format!("C:\\{dir}setup\\App.exe");
                prop_assert!(!is_excluded_executable(&path));
            }

            /// Cleaned names never contain the version tail
            #[test]
            fn cleaned_name_has_no_underscore(
                name in "[A-Za-z][A-Za-z.]{0,20}",
                version in "[0-9.]{1,10}",
            ) {
                let cleaned = clean_package_display_name(&format!("{name}_{version}_x64__8wekyb3d8bbwe"));
                prop_assert!(!cleaned.contains('_'));
                prop_assert_eq!(cleaned.replace(' ', ""), name);
            }
        }
    }
}
