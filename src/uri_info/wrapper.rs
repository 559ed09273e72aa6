//! [`UriInfo`] decorator that reports the client-facing origin.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use url::Url;

use super::{
    OriginOverride, ParamMap, PathSegment, RequestUriInfo, UriBuilder, UriError, UriInfo,
    UriReference,
};
use crate::error::AppError;
use crate::state::AppState;

/// Wraps another [`UriInfo`] and rewrites the scheme, host and port of every
/// URI it hands out according to the request's forwarding headers.
///
/// Paths, parameters and matches are forwarded untouched. One instance per
/// request; the override is fixed at construction.
///
/// ```rust
/// use axum::http::{HeaderMap, HeaderValue};
/// use repository_http::uri_info::{ForwardedUriInfo, RequestUriInfo, UriInfo};
/// use url::Url;
///
/// let inner = RequestUriInfo::new(
///     Url::parse("http://10.0.0.7:8080/").unwrap(),
///     Url::parse("http://10.0.0.7:8080/rest/a").unwrap(),
/// );
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-host", HeaderValue::from_static("repo.example.org"));
/// headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
///
/// let info = ForwardedUriInfo::new(inner, &headers);
/// assert_eq!(info.request_uri().as_str(), "https://repo.example.org/rest/a");
/// assert_eq!(info.path(true), "rest/a");
/// ```
#[derive(Debug, Clone)]
pub struct ForwardedUriInfo<U> {
    inner: U,
    origin: OriginOverride,
}

impl<U: UriInfo> ForwardedUriInfo<U> {
    /// Derive the override from `headers` and wrap `inner`.
    pub fn new(inner: U, headers: &HeaderMap) -> Self {
        Self::with_override(inner, OriginOverride::from_headers(headers))
    }

    pub fn with_override(inner: U, origin: OriginOverride) -> Self {
        Self { inner, origin }
    }

    pub fn origin(&self) -> &OriginOverride {
        &self.origin
    }

    pub fn inner(&self) -> &U {
        &self.inner
    }

    pub fn into_inner(self) -> U {
        self.inner
    }
}

impl<U: UriInfo> UriInfo for ForwardedUriInfo<U> {
    fn path(&self, decode: bool) -> String {
        self.inner.path(decode)
    }

    fn path_segments(&self, decode: bool) -> Vec<PathSegment> {
        self.inner.path_segments(decode)
    }

    fn request_uri(&self) -> Url {
        self.origin.rewrite_url(&self.inner.request_uri())
    }

    fn request_uri_builder(&self) -> UriBuilder {
        self.origin
            .rewrite_builder(self.inner.request_uri_builder())
    }

    fn absolute_path(&self) -> Url {
        self.origin.rewrite_url(&self.inner.absolute_path())
    }

    fn absolute_path_builder(&self) -> UriBuilder {
        self.origin
            .rewrite_builder(self.inner.absolute_path_builder())
    }

    fn base_uri(&self) -> Url {
        self.origin.rewrite_url(&self.inner.base_uri())
    }

    fn base_uri_builder(&self) -> UriBuilder {
        self.origin.rewrite_builder(self.inner.base_uri_builder())
    }

    fn path_parameters(&self, decode: bool) -> ParamMap {
        self.inner.path_parameters(decode)
    }

    fn query_parameters(&self, decode: bool) -> ParamMap {
        self.inner.query_parameters(decode)
    }

    fn matched_uris(&self, decode: bool) -> Vec<String> {
        self.inner.matched_uris(decode)
    }

    fn matched_resources(&self) -> Vec<String> {
        self.inner.matched_resources()
    }

    fn resolve(&self, reference: &str) -> Result<Url, UriError> {
        self.inner
            .resolve(reference)
            .map(|url| self.origin.rewrite_url(&url))
    }

    fn relativize(&self, uri: &str) -> Result<UriReference, UriError> {
        self.inner
            .relativize(uri)
            .map(|reference| self.origin.rewrite_reference(reference))
    }
}

/// Per-request extractor used by the handlers.
///
/// Forwarding headers are ignored when `FORWARDED_HEADERS_ENABLED=false`.
impl FromRequestParts<AppState> for ForwardedUriInfo<RequestUriInfo> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let inner = RequestUriInfo::from_request_parts(parts, state).await?;

        let origin = if state.config.forwarded_headers_enabled {
            OriginOverride::from_headers(&parts.headers)
        } else {
            OriginOverride::none()
        };

        Ok(Self::with_override(inner, origin))
    }
}
