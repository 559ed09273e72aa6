//! Client-facing origin derived from reverse-proxy forwarding headers.
//!
//! # Security
//!
//! **The headers are trusted as-is.** Deploy behind a proxy that overwrites
//! `X-Forwarded-*` and `Forwarded` rather than appending to client-supplied
//! values, or disable forwarding support with `FORWARDED_HEADERS_ENABLED=false`.
//!
//! # Single hop
//!
//! Only the first value of a repeated header is read, and only the first
//! element of a comma-separated `Forwarded` list (the hop nearest the client).

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::http::HeaderMap;
use axum::http::uri::Authority;
use tracing::{debug, trace};
use url::Url;

use super::{UriBuilder, UriReference};
use crate::metrics;

/// Forwarding headers, in the order they are applied. Later entries win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardingHeader {
    XForwardedProto,
    XForwardedHost,
    Forwarded,
}

impl ForwardingHeader {
    /// Application order: the last header that supplies a field decides it.
    pub const PRECEDENCE: [Self; 3] = [Self::XForwardedProto, Self::XForwardedHost, Self::Forwarded];

    /// Lowercase header name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::XForwardedProto => "x-forwarded-proto",
            Self::XForwardedHost => "x-forwarded-host",
            Self::Forwarded => "forwarded",
        }
    }
}

/// Parameters read from a `Forwarded` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardedParam {
    Host,
    Proto,
}

impl ForwardedParam {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Proto => "proto",
        }
    }
}

/// Port replacement.
///
/// `NoPort` and `Unset` are different things: the first strips any explicit
/// port from the URI, the second leaves it alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortOverride {
    #[default]
    Unset,
    NoPort,
    Port(u16),
}

impl PortOverride {
    /// The port a URI with `original` should end up with.
    pub fn apply(self, original: Option<u16>) -> Option<u16> {
        match self {
            Self::Unset => original,
            Self::NoPort => None,
            Self::Port(port) => Some(port),
        }
    }
}

/// Scheme, host and port to substitute into every outgoing URI.
///
/// Built once per request with [`OriginOverride::from_headers`] and never
/// changed afterwards. Each field is applied independently.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OriginOverride {
    scheme: Option<String>,
    host: Option<String>,
    port: PortOverride,
}

impl OriginOverride {
    /// An override that changes nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Derive the override from request headers.
    ///
    /// Malformed values are logged and skipped; this never fails.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut origin = Self::default();

        for header in ForwardingHeader::PRECEDENCE {
            let Some(value) = first_value(headers, header) else {
                continue;
            };

            match header {
                ForwardingHeader::XForwardedProto => origin.set_scheme(value, header),
                ForwardingHeader::XForwardedHost => origin.set_host(value, header),
                ForwardingHeader::Forwarded => {
                    let params = parse_forwarded(value);
                    if let Some(host) = params.get(ForwardedParam::Host.name()) {
                        origin.set_host(host, header);
                    }
                    if let Some(proto) = params.get(ForwardedParam::Proto.name()) {
                        origin.set_scheme(proto, header);
                    }
                }
            }
        }

        if !origin.is_empty() {
            trace!(
                scheme = ?origin.scheme,
                host = ?origin.host,
                port = ?origin.port,
                "Forwarded origin override"
            );
        }
        origin
    }

    pub fn is_empty(&self) -> bool {
        self.scheme.is_none() && self.host.is_none() && self.port == PortOverride::Unset
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> PortOverride {
        self.port
    }

    /// Replace the overridden fields of `url`, keeping everything else.
    ///
    /// A field the URI library refuses (e.g. switching a special scheme to a
    /// non-special one) keeps its original value.
    pub fn rewrite_url(&self, url: &Url) -> Url {
        let mut rewritten = url.clone();

        if let Some(scheme) = &self.scheme
            && rewritten.set_scheme(scheme).is_err()
        {
            debug!(%url, %scheme, "Cannot apply forwarded scheme, keeping original");
        }

        if let Some(host) = &self.host
            && let Err(e) = rewritten.set_host(Some(host))
        {
            debug!(%url, %host, error = %e, "Cannot apply forwarded host, keeping original");
        }

        let port = self.port.apply(rewritten.port());
        if port != rewritten.port() && rewritten.set_port(port).is_err() {
            debug!(%url, ?port, "Cannot apply forwarded port, keeping original");
        }

        rewritten
    }

    /// Same substitution as [`OriginOverride::rewrite_url`], on a builder.
    ///
    /// A buildable builder goes through `rewrite_url`, so fields the URI
    /// library refuses are kept exactly as there.
    pub fn rewrite_builder(&self, builder: UriBuilder) -> UriBuilder {
        if let Ok(url) = builder.build() {
            return UriBuilder::from_url(&self.rewrite_url(&url));
        }

        // No URI to keep consistent with yet; set the fields directly.
        let port = self.port.apply(builder.current_port());
        let builder = match &self.scheme {
            Some(scheme) => builder.scheme(scheme.as_str()),
            None => builder,
        };
        let builder = match &self.host {
            Some(host) => builder.host(host.as_str()),
            None => builder,
        };
        builder.port(port)
    }

    /// Rewrite an absolute reference; relative references have no origin.
    pub fn rewrite_reference(&self, reference: UriReference) -> UriReference {
        match reference {
            UriReference::Absolute(url) => UriReference::Absolute(self.rewrite_url(&url)),
            relative @ UriReference::Relative(_) => relative,
        }
    }

    fn set_scheme(&mut self, value: &str, source: ForwardingHeader) {
        match parse_scheme(value) {
            Some(scheme) => {
                self.scheme = Some(scheme);
                metrics::record_forwarded_override(source.name(), ForwardedParam::Proto.name());
            }
            None => parse_failure(source, value, "invalid scheme"),
        }
    }

    fn set_host(&mut self, value: &str, source: ForwardingHeader) {
        match parse_host_port(value) {
            Ok((host, port)) => {
                self.host = Some(host);
                self.port = port.map_or(PortOverride::NoPort, PortOverride::Port);
                metrics::record_forwarded_override(source.name(), ForwardedParam::Host.name());
            }
            Err(reason) => parse_failure(source, value, &reason),
        }
    }
}

/// First value of `header`, if present and visible ASCII.
fn first_value(headers: &HeaderMap, header: ForwardingHeader) -> Option<&str> {
    let value = headers.get(header.name())?;
    match value.to_str() {
        Ok(value) => Some(value.trim()),
        Err(_) => {
            parse_failure(header, "<non-ascii>", "header value is not visible ASCII");
            None
        }
    }
}

fn parse_failure(header: ForwardingHeader, value: &str, reason: &str) {
    debug!(
        header = header.name(),
        value, reason, "Ignoring malformed forwarding header"
    );
    metrics::record_forwarded_parse_failure(header.name());
}

/// Split `host[:port]` by parsing it as the authority of an `http` URI.
///
/// IPv6 literals must be bracketed. The port is read from the authority as
/// written: an explicit `:80` stays `Some(80)` even though it is the `http`
/// default, since the scheme may be overridden too.
pub fn parse_host_port(value: &str) -> Result<(String, Option<u16>), String> {
    let value = value.trim();
    let authority = Authority::from_str(value).map_err(|e| e.to_string())?;

    let candidate = format!("http://{value}");
    let url = Url::parse(&candidate).map_err(|e| e.to_string())?;
    let host = url.host_str().ok_or_else(|| "no host".to_string())?;
    Ok((host.to_string(), authority.port_u16()))
}

/// Lowercased scheme if `value` is `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
pub fn parse_scheme(value: &str) -> Option<String> {
    let mut chars = value.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| value.to_ascii_lowercase())
}

/// Parse the first element of a `Forwarded` header into lowercase keys and
/// trimmed, unquoted values. Pairs without `=` are skipped; a repeated key
/// keeps its last value.
pub fn parse_forwarded(value: &str) -> BTreeMap<String, String> {
    let first_hop = value.split(',').next().unwrap_or_default();

    first_hop
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.split('=');
            let key = parts.next()?.trim();
            let value = parts.next()?.trim();
            Some((key.to_ascii_lowercase(), unquote(value).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_no_headers_is_empty() {
        let origin = OriginOverride::from_headers(&HeaderMap::new());
        assert!(origin.is_empty());
        assert_eq!(origin, OriginOverride::none());
    }

    #[test]
    fn test_x_forwarded_proto() {
        let origin = OriginOverride::from_headers(&headers(&[("x-forwarded-proto", "HTTPS")]));
        assert_eq!(origin.scheme(), Some("https"));
        assert_eq!(origin.host(), None);
        assert_eq!(origin.port(), PortOverride::Unset);
    }

    #[test]
    fn test_x_forwarded_host_with_port() {
        let origin =
            OriginOverride::from_headers(&headers(&[("x-forwarded-host", "example.org:9000")]));
        assert_eq!(origin.host(), Some("example.org"));
        assert_eq!(origin.port(), PortOverride::Port(9000));
        assert_eq!(origin.scheme(), None);
    }

    #[test]
    fn test_x_forwarded_host_without_port_means_no_port() {
        let origin = OriginOverride::from_headers(&headers(&[("x-forwarded-host", "example.org")]));
        assert_eq!(origin.port(), PortOverride::NoPort);
    }

    #[test]
    fn test_x_forwarded_host_ipv6() {
        let origin =
            OriginOverride::from_headers(&headers(&[("x-forwarded-host", "[2001:db8::1]:8443")]));
        assert_eq!(origin.host(), Some("[2001:db8::1]"));
        assert_eq!(origin.port(), PortOverride::Port(8443));
    }

    #[test]
    fn test_forwarded_wins_over_x_forwarded() {
        let origin = OriginOverride::from_headers(&headers(&[
            ("x-forwarded-host", "a.com"),
            ("x-forwarded-proto", "http"),
            ("forwarded", "host=b.com;proto=https"),
        ]));
        assert_eq!(origin.host(), Some("b.com"));
        assert_eq!(origin.scheme(), Some("https"));
    }

    #[test]
    fn test_forwarded_only_overrides_fields_it_carries() {
        let origin = OriginOverride::from_headers(&headers(&[
            ("x-forwarded-proto", "https"),
            ("forwarded", "host=b.com"),
        ]));
        assert_eq!(origin.host(), Some("b.com"));
        assert_eq!(origin.scheme(), Some("https"));
    }

    #[test]
    fn test_forwarded_keys_are_case_insensitive_and_trimmed() {
        let origin =
            OriginOverride::from_headers(&headers(&[("forwarded", " Host = b.com:81 ; PROTO= https ")]));
        assert_eq!(origin.host(), Some("b.com"));
        assert_eq!(origin.port(), PortOverride::Port(81));
        assert_eq!(origin.scheme(), Some("https"));
    }

    #[test]
    fn test_forwarded_quoted_ipv6_host() {
        let params = parse_forwarded(r#"for=192.0.2.60;host="[::1]:8080";proto=https"#);
        assert_eq!(params.get("host").map(String::as_str), Some("[::1]:8080"));
        assert_eq!(params.get("for").map(String::as_str), Some("192.0.2.60"));
    }

    #[test]
    fn test_forwarded_reads_first_hop_only() {
        let params = parse_forwarded("host=first.example;proto=https, host=second.example");
        assert_eq!(params.get("host").map(String::as_str), Some("first.example"));
    }

    #[test]
    fn test_forwarded_skips_pairs_without_value() {
        let params = parse_forwarded("secret;host=b.com;;");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("host").map(String::as_str), Some("b.com"));
    }

    #[test]
    fn test_repeated_header_uses_first_value() {
        let origin = OriginOverride::from_headers(&headers(&[
            ("x-forwarded-host", "first.example"),
            ("x-forwarded-host", "second.example"),
        ]));
        assert_eq!(origin.host(), Some("first.example"));
    }

    #[test]
    fn test_malformed_host_fails_open() {
        let origin = OriginOverride::from_headers(&headers(&[("x-forwarded-host", ":::garbage")]));
        assert!(origin.is_empty());
    }

    #[test]
    fn test_malformed_forwarded_host_keeps_earlier_value() {
        let origin = OriginOverride::from_headers(&headers(&[
            ("x-forwarded-host", "a.com:8443"),
            ("forwarded", "host=:::garbage"),
        ]));
        assert_eq!(origin.host(), Some("a.com"));
        assert_eq!(origin.port(), PortOverride::Port(8443));
    }

    #[test]
    fn test_invalid_scheme_fails_open() {
        let origin = OriginOverride::from_headers(&headers(&[("x-forwarded-proto", "ht tp")]));
        assert!(origin.is_empty());
        assert_eq!(parse_scheme(""), None);
        assert_eq!(parse_scheme("1http"), None);
        assert_eq!(parse_scheme("coap+tcp"), Some("coap+tcp".to_string()));
    }

    #[test]
    fn test_parse_host_port() {
        assert_eq!(
            parse_host_port("example.org:9000").unwrap(),
            ("example.org".to_string(), Some(9000))
        );
        assert_eq!(
            parse_host_port("example.org:80").unwrap(),
            ("example.org".to_string(), Some(80))
        );
        assert_eq!(
            parse_host_port("example.org").unwrap(),
            ("example.org".to_string(), None)
        );
        assert!(parse_host_port("example.org/path").is_err());
        assert!(parse_host_port("example.org:99999").is_err());
        assert!(parse_host_port("").is_err());
    }

    #[test]
    fn test_explicit_default_port_survives_scheme_override() {
        let origin = OriginOverride::from_headers(&headers(&[
            ("x-forwarded-proto", "https"),
            ("x-forwarded-host", "example.org:80"),
        ]));
        assert_eq!(origin.port(), PortOverride::Port(80));

        let original = url("http://internal:8080/rest/a");
        assert_eq!(
            origin.rewrite_url(&original).as_str(),
            "https://example.org:80/rest/a"
        );
    }

    #[test]
    fn test_explicit_default_port_without_scheme_override() {
        let origin = OriginOverride::from_headers(&headers(&[("x-forwarded-host", "example.org:80")]));
        let original = url("http://internal:8080/rest/a");
        assert_eq!(
            origin.rewrite_url(&original).as_str(),
            "http://example.org/rest/a"
        );
    }

    #[test]
    fn test_port_override_apply() {
        assert_eq!(PortOverride::Unset.apply(Some(8080)), Some(8080));
        assert_eq!(PortOverride::NoPort.apply(Some(8080)), None);
        assert_eq!(PortOverride::Port(9000).apply(None), Some(9000));
    }

    #[test]
    fn test_rewrite_url_identity_without_override() {
        let original = url("http://internal:8080/rest/a?x=1#f");
        assert_eq!(OriginOverride::none().rewrite_url(&original), original);
    }

    #[test]
    fn test_rewrite_url_replaces_origin_only() {
        let origin = OriginOverride::from_headers(&headers(&[
            ("x-forwarded-proto", "https"),
            ("x-forwarded-host", "example.org:9000"),
        ]));
        let rewritten = origin.rewrite_url(&url("http://internal:8080/rest/a?x=1#f"));
        assert_eq!(rewritten.as_str(), "https://example.org:9000/rest/a?x=1#f");
    }

    #[test]
    fn test_rewrite_url_scheme_only_keeps_port() {
        let origin = OriginOverride::from_headers(&headers(&[("x-forwarded-proto", "https")]));
        let rewritten = origin.rewrite_url(&url("http://internal:8080/a"));
        assert_eq!(rewritten.as_str(), "https://internal:8080/a");
    }

    #[test]
    fn test_rewrite_url_is_idempotent() {
        let origin = OriginOverride::from_headers(&headers(&[
            ("forwarded", "host=b.com:8443;proto=https"),
        ]));
        let once = origin.rewrite_url(&url("http://internal:8080/a/b"));
        let twice = origin.rewrite_url(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rewrite_url_keeps_scheme_it_cannot_apply() {
        let origin = OriginOverride::from_headers(&headers(&[("x-forwarded-proto", "custom")]));
        let rewritten = origin.rewrite_url(&url("http://internal/a"));
        assert_eq!(rewritten.scheme(), "http");
    }

    #[test]
    fn test_rewrite_builder_matches_rewrite_url() {
        let origin = OriginOverride::from_headers(&headers(&[
            ("x-forwarded-host", "example.org"),
            ("x-forwarded-proto", "https"),
        ]));
        let original = url("http://internal:8080/rest/?q=1");

        let from_builder = origin
            .rewrite_builder(UriBuilder::from_url(&original))
            .build()
            .unwrap();
        assert_eq!(from_builder, origin.rewrite_url(&original));
        assert_eq!(from_builder.as_str(), "https://example.org/rest/?q=1");
    }

    #[test]
    fn test_rewrite_builder_keeps_scheme_the_url_refuses() {
        let origin = OriginOverride::from_headers(&headers(&[("x-forwarded-proto", "custom")]));
        assert_eq!(origin.scheme(), Some("custom"));
        let original = url("http://internal:8080/rest/a");

        let from_url = origin.rewrite_url(&original);
        let from_builder = origin
            .rewrite_builder(UriBuilder::from_url(&original))
            .build()
            .unwrap();
        assert_eq!(from_builder, from_url);
        assert_eq!(from_builder.as_str(), "http://internal:8080/rest/a");
    }

    #[test]
    fn test_rewrite_reference_leaves_relative_alone() {
        let origin = OriginOverride::from_headers(&headers(&[("x-forwarded-host", "example.org")]));
        let relative = UriReference::Relative("child".to_string());
        assert_eq!(origin.rewrite_reference(relative.clone()), relative);
    }
}
