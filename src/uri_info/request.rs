//! The server's own view of the request URI.

use std::str::FromStr;

use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{FromRequestParts, MatchedPath, OriginalUri, RawPathParams};
use axum::http::header::HOST;
use axum::http::uri::Authority;
use axum::http::request::Parts;
use url::Url;

use super::{ParamMap, PathSegment, UriBuilder, UriError, UriInfo, UriReference, maybe_decode};
use crate::error::AppError;
use crate::state::AppState;

/// [`UriInfo`] for one request, built from what reached this server.
///
/// Behind a proxy the origin here is the internal one; wrap it in
/// [`super::ForwardedUriInfo`] before producing URIs for clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUriInfo {
    base: Url,
    request: Url,
    path_params: Vec<(String, String)>,
    matched_template: Option<String>,
}

impl RequestUriInfo {
    /// Create from an absolute request URI and the application base URI.
    ///
    /// A base without a trailing `/` gets one.
    pub fn new(base: Url, request: Url) -> Self {
        let base = if base.path().ends_with('/') {
            base
        } else {
            let mut base = base;
            let path = format!("{}/", base.path());
            base.set_path(&path);
            base
        };

        Self {
            base,
            request,
            path_params: Vec::new(),
            matched_template: None,
        }
    }

    /// Attach decoded route captures.
    pub fn with_path_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.path_params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_matched_template(mut self, template: impl Into<String>) -> Self {
        self.matched_template = Some(template.into());
        self
    }

    /// Build from request parts.
    ///
    /// The origin is taken from an absolute-form request target, else a
    /// `Host` header that is a well-formed authority, else `fallback_authority`. The scheme defaults to `http`.
    ///
    /// # Errors
    ///
    /// Returns [`UriError`] if the pieces do not form a valid URI.
    pub fn from_parts(
        parts: &Parts,
        fallback_authority: &str,
        base_path: &str,
    ) -> Result<Self, UriError> {
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);

        let scheme = uri.scheme_str().unwrap_or("http");
        let authority = uri
            .authority()
            .map(|a| a.as_str())
            .or_else(|| {
                parts
                    .headers
                    .get(HOST)
                    .and_then(|h| h.to_str().ok())
                    .filter(|h| Authority::from_str(h).is_ok())
            })
            .unwrap_or(fallback_authority);
        let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());

        let raw = format!("{scheme}://{authority}{path_and_query}");
        let request = Url::parse(&raw).map_err(|e| UriError::parse(raw, e))?;

        let base_path = format!("/{}/", base_path.trim_matches('/')).replace("//", "/");
        let base = request
            .join(&base_path)
            .map_err(|e| UriError::parse(base_path, e))?;

        let mut info = Self::new(base, request);
        if let Some(matched) = parts.extensions.get::<MatchedPath>() {
            info = info.with_matched_template(matched.as_str());
        }
        Ok(info)
    }

    /// Path below the base URI, still percent-encoded, no leading `/`.
    fn relative_path(&self) -> &str {
        let path = self.request.path();
        let base = self.base.path();
        path.strip_prefix(base)
            .or_else(|| path.strip_prefix(base.trim_end_matches('/')))
            .unwrap_or(path)
            .trim_start_matches('/')
    }
}

impl UriInfo for RequestUriInfo {
    fn path(&self, decode: bool) -> String {
        maybe_decode(self.relative_path(), decode)
    }

    fn path_segments(&self, decode: bool) -> Vec<PathSegment> {
        self.relative_path()
            .split('/')
            .map(|segment| PathSegment::parse(segment, decode))
            .collect()
    }

    fn request_uri(&self) -> Url {
        self.request.clone()
    }

    fn request_uri_builder(&self) -> UriBuilder {
        UriBuilder::from_url(&self.request)
    }

    fn absolute_path(&self) -> Url {
        let mut absolute = self.request.clone();
        absolute.set_query(None);
        absolute.set_fragment(None);
        absolute
    }

    fn absolute_path_builder(&self) -> UriBuilder {
        UriBuilder::from_url(&self.absolute_path())
    }

    fn base_uri(&self) -> Url {
        self.base.clone()
    }

    fn base_uri_builder(&self) -> UriBuilder {
        UriBuilder::from_url(&self.base)
    }

    fn path_parameters(&self, decode: bool) -> ParamMap {
        let mut params = ParamMap::new();
        for (name, value) in &self.path_params {
            let value = if decode {
                value.clone()
            } else {
                value
                    .split('/')
                    .map(|segment| urlencoding::encode(segment).into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            };
            params.entry(name.clone()).or_default().push(value);
        }
        params
    }

    fn query_parameters(&self, decode: bool) -> ParamMap {
        let mut params = ParamMap::new();
        let Some(query) = self.request.query() else {
            return params;
        };

        if decode {
            for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
                params
                    .entry(name.into_owned())
                    .or_default()
                    .push(value.into_owned());
            }
        } else {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                params
                    .entry(name.to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }
        params
    }

    fn matched_uris(&self, decode: bool) -> Vec<String> {
        // Routes are flat: the single match is the whole relative path.
        vec![self.path(decode)]
    }

    fn matched_resources(&self) -> Vec<String> {
        self.matched_template.iter().cloned().collect()
    }

    fn resolve(&self, reference: &str) -> Result<Url, UriError> {
        self.base
            .join(reference)
            .map_err(|e| UriError::parse(reference, e))
    }

    fn relativize(&self, uri: &str) -> Result<UriReference, UriError> {
        let target = self.resolve(uri)?;
        Ok(match self.request.make_relative(&target) {
            Some(relative) => UriReference::Relative(relative),
            None => UriReference::Absolute(target),
        })
    }
}

impl FromRequestParts<AppState> for RequestUriInfo {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let config = &state.config;
        let info = Self::from_parts(parts, &config.server_addr(), &config.base_path)?;

        let params = match RawPathParams::from_request_parts(parts, state).await {
            Ok(raw) => raw
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
            Err(RawPathParamsRejection::InvalidUtf8InPathParam(e)) => {
                return Err(AppError::BadRequest(e.body_text()));
            }
            // Routes without captures have nothing to add here.
            Err(_) => Vec::new(),
        };

        Ok(info.with_path_params(params))
    }
}
