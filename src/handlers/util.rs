//! Shared utilities for handlers.

use axum::http::HeaderValue;
use url::Url;

use crate::error::{AppError, AppResult};
use crate::uri_info::UriInfo;

/// Name of the resource tree below the base URI.
pub const RESOURCE_ROOT: &str = "rest";

/// Client-facing URI of the resource stored at `path`.
pub fn resource_uri(uri_info: &impl UriInfo, path: &str) -> AppResult<Url> {
    Ok(uri_info
        .base_uri_builder()
        .path(RESOURCE_ROOT)
        .path(path)
        .build()?)
}

/// Normalized resource path captured by the `{*path}` route, or the root.
pub fn captured_path(uri_info: &impl UriInfo) -> AppResult<String> {
    let raw = uri_info
        .path_parameters(true)
        .remove("path")
        .and_then(|values| values.into_iter().next())
        .unwrap_or_default();
    crate::validation::normalize_resource_path(&raw)
}

/// Header value holding a URI.
pub fn uri_header(uri: &Url) -> AppResult<HeaderValue> {
    HeaderValue::from_str(uri.as_str())
        .map_err(|e| AppError::Internal(format!("URI {uri} is not a valid header value: {e}")))
}

/// `Link` header value pointing at `uri` with the given relation.
pub fn link_header(uri: &Url, rel: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(&format!("<{uri}>; rel=\"{rel}\""))
        .map_err(|e| AppError::Internal(format!("Link to {uri} is not a valid header value: {e}")))
}
