#![no_main]

use appscout::config::ScanConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary config files must parse or fail cleanly
    if let Ok(s) = std::str::from_utf8(data) {
        let _result: Result<ScanConfig, _> = serde_json::from_str(s);
    }
});
