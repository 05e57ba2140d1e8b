//! Fuzz target for repository locator resolution.

#![no_main]

use ferry_migrate::locator::{resolve, ssh_to_https};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(locator) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok((project, slug)) = resolve(locator) {
        assert!(!project.is_empty());
        assert!(!slug.is_empty());
    }

    let https = ssh_to_https(locator);
    assert_eq!(ssh_to_https(&https), https);
});
