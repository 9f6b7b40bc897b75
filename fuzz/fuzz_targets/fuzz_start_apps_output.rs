#![no_main]

use appscout::discovery::shell::parse_start_apps;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // PowerShell output is untrusted text; parsing must never panic
    let output = String::from_utf8_lossy(data);
    if let Ok(apps) = parse_start_apps(&output) {
        for app in apps {
            assert!(!app.name.is_empty());
            assert!(!app.app_id.is_empty());
        }
    }
});
