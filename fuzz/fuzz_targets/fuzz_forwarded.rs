//! Fuzz testing for forwarding header parsing.
//!
//! Arbitrary header values must never panic, and the resulting override must
//! always produce a parseable URI that is stable under a second rewrite.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_forwarded -- -max_total_time=60
//! ```

#![no_main]

use axum::http::{HeaderMap, HeaderValue};
use libfuzzer_sys::fuzz_target;
use repository_http::uri_info::forwarded::{parse_forwarded, parse_host_port};
use repository_http::uri_info::{ForwardingHeader, OriginOverride};
use url::Url;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    let _ = parse_forwarded(s);
    let _ = parse_host_port(s);

    let Ok(value) = HeaderValue::from_str(s) else {
        return;
    };

    let Ok(original) = Url::parse("http://10.0.0.7:8080/rest/a?x=1") else {
        return;
    };

    for header in ForwardingHeader::PRECEDENCE {
        let mut headers = HeaderMap::new();
        headers.insert(header.name(), value.clone());

        let origin = OriginOverride::from_headers(&headers);
        let once = origin.rewrite_url(&original);
        let twice = origin.rewrite_url(&once);
        assert_eq!(once, twice);
        assert_eq!(once.path(), original.path());
        assert_eq!(once.query(), original.query());
    }
});
