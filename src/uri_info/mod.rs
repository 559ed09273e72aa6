//! Request URI context and reverse-proxy aware URI rewriting.
//!
//! Handlers never build absolute URIs from the server's own bind address.
//! They ask a [`UriInfo`] for the request, base and absolute-path URIs (or a
//! [`UriBuilder`] seeded from them) and get back the address the client
//! actually used, as reported by the proxy in front of the server.
//!
//! # Layers
//!
//! ```text
//!   handler
//!      │  UriInfo
//!      ▼
//! ┌──────────────────────────┐
//! │ ForwardedUriInfo<U>      │ ← rewrites scheme/host/port of every URI
//! │   origin: OriginOverride │   (built once from forwarding headers)
//! └────────────┬─────────────┘
//!              │  UriInfo (pass-through for paths, params, matches)
//!              ▼
//! ┌──────────────────────────┐
//! │ RequestUriInfo           │ ← what the server itself sees
//! └──────────────────────────┘
//! ```
//!
//! # Header precedence
//!
//! Later sources win, field by field:
//!
//! 1. the request's own scheme and `Host`
//! 2. `X-Forwarded-Proto` / `X-Forwarded-Host`
//! 3. `Forwarded: proto=...;host=...`
//!
//! Malformed forwarding headers are logged and ignored; they never fail a request.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use url::Url;

pub mod builder;
pub mod forwarded;
pub mod request;
pub mod wrapper;

pub use builder::UriBuilder;
pub use forwarded::{ForwardedParam, ForwardingHeader, OriginOverride, PortOverride};
pub use request::RequestUriInfo;
pub use wrapper::ForwardedUriInfo;

/// Multi-valued parameter map (path, query or matrix parameters).
pub type ParamMap = BTreeMap<String, Vec<String>>;

/// Errors produced while building or resolving URIs.
#[derive(Error, Debug)]
pub enum UriError {
    #[error("`{uri}` is not a valid URI: {source}")]
    Parse {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("`{0}` has no host")]
    MissingHost(String),
}

impl UriError {
    pub(crate) fn parse(uri: impl Into<String>, source: url::ParseError) -> Self {
        Self::Parse {
            uri: uri.into(),
            source,
        }
    }
}

/// Result of [`UriInfo::relativize`].
///
/// A URI on the same origin as the request comes back as a relative
/// reference. Anything else stays absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriReference {
    Absolute(Url),
    Relative(String),
}

impl UriReference {
    /// The absolute URI, if this reference is one.
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Self::Absolute(url) => Some(url),
            Self::Relative(_) => None,
        }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, Self::Absolute(_))
    }
}

impl fmt::Display for UriReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(url) => f.write_str(url.as_str()),
            Self::Relative(reference) => f.write_str(reference),
        }
    }
}

/// One `/`-delimited segment of the request path.
///
/// Matrix parameters (`;name=value`) are split off the segment text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathSegment {
    path: String,
    matrix_parameters: ParamMap,
}

impl PathSegment {
    /// Parse a raw (percent-encoded) segment.
    pub fn parse(raw: &str, decode: bool) -> Self {
        let mut parts = raw.split(';');
        let path = parts.next().unwrap_or_default();

        let mut matrix_parameters = ParamMap::new();
        for param in parts.filter(|p| !p.is_empty()) {
            let (name, value) = param.split_once('=').unwrap_or((param, ""));
            matrix_parameters
                .entry(maybe_decode(name, decode))
                .or_default()
                .push(maybe_decode(value, decode));
        }

        Self {
            path: maybe_decode(path, decode),
            matrix_parameters,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn matrix_parameters(&self) -> &ParamMap {
        &self.matrix_parameters
    }
}

/// Accessors for the URI of the request being handled.
///
/// Implemented by [`RequestUriInfo`] (the server's own view) and by
/// [`ForwardedUriInfo`], which decorates any other implementation and can be
/// used wherever the undecorated one was.
pub trait UriInfo {
    /// Request path relative to the base URI, without a leading `/`.
    fn path(&self, decode: bool) -> String;

    /// [`UriInfo::path`] split into segments.
    fn path_segments(&self, decode: bool) -> Vec<PathSegment>;

    /// Absolute request URI including the query string.
    fn request_uri(&self) -> Url;

    fn request_uri_builder(&self) -> UriBuilder;

    /// Absolute request URI without query or fragment.
    fn absolute_path(&self) -> Url;

    fn absolute_path_builder(&self) -> UriBuilder;

    /// Base URI of the application. Always ends with `/`.
    fn base_uri(&self) -> Url;

    fn base_uri_builder(&self) -> UriBuilder;

    /// Values captured by the matched route.
    fn path_parameters(&self, decode: bool) -> ParamMap;

    fn query_parameters(&self, decode: bool) -> ParamMap;

    /// Request path matched by the router, relative to the base URI.
    ///
    /// Routes do not nest, so this holds exactly one entry.
    fn matched_uris(&self, decode: bool) -> Vec<String>;

    /// Route templates that matched the request.
    fn matched_resources(&self) -> Vec<String>;

    /// Resolve a (possibly relative) reference against the base URI.
    fn resolve(&self, reference: &str) -> Result<Url, UriError>;

    /// Make `uri` relative to the request URI where both share an origin.
    ///
    /// A relative `uri` is resolved against the base URI first.
    fn relativize(&self, uri: &str) -> Result<UriReference, UriError>;
}

/// Percent-decode `raw` when asked to, keeping the raw text if it does not
/// decode to UTF-8.
pub(crate) fn maybe_decode(raw: &str, decode: bool) -> String {
    if !decode {
        return raw.to_string();
    }
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
