//! Fuzz testing for path and prefix validation.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use repository_http::validation::{
    normalize_resource_path, validate_namespace_uri, validate_prefix, validate_segment,
};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    let _ = validate_segment(s);
    let _ = validate_prefix(s);
    let _ = validate_namespace_uri(s);

    // A normalized path normalizes to itself.
    if let Ok(path) = normalize_resource_path(s) {
        assert_eq!(normalize_resource_path(&path).ok().as_deref(), Some(path.as_str()));
    }
});
