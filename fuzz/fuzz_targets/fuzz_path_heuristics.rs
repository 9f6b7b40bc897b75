#![no_main]

use appscout::discovery::uninstall::normalize_display_icon;
use appscout::utils::filters::{
    clean_package_display_name, is_excluded_executable, is_packaged_distribution_indicator,
    is_system_location,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Registry values and directory names feed these helpers unvalidated
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = normalize_display_icon(s);
        let _ = is_excluded_executable(s);
        let _ = is_packaged_distribution_indicator(s, s, s);
        let _ = is_system_location(s, "C:\\Windows");
        let cleaned = clean_package_display_name(s);
        assert!(cleaned.len() <= s.len() * 2 + 1);
    }
});
