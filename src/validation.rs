use url::Url;

use crate::error::{AppError, AppResult};
use crate::uri_info::UriError;

// =============================================================================
// Validation Constants
// =============================================================================

/// Maximum length of one resource path segment.
pub const MAX_SEGMENT_LENGTH: usize = 255;

/// Maximum number of segments in a resource path.
pub const MAX_PATH_DEPTH: usize = 64;

/// Maximum length of a namespace prefix.
pub const MAX_PREFIX_LENGTH: usize = 64;

/// Validate one resource path segment (also used for `Slug` values).
///
/// Rules:
/// - Must be between 1 and 255 characters
/// - Can contain ASCII alphanumerics, dots, underscores, hyphens and tildes
/// - Cannot be `.` or `..`
pub fn validate_segment(segment: &str) -> AppResult<()> {
    if segment.is_empty() {
        return Err(AppError::BadRequest(
            "path segment cannot be empty".to_string(),
        ));
    }

    if segment.len() > MAX_SEGMENT_LENGTH {
        return Err(AppError::BadRequest(format!(
            "path segment cannot exceed {MAX_SEGMENT_LENGTH} characters"
        )));
    }

    if segment == "." || segment == ".." {
        return Err(AppError::BadRequest(format!(
            "path segment `{segment}` is not allowed"
        )));
    }

    if let Some(c) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '~')))
    {
        return Err(AppError::BadRequest(format!(
            "path segment `{segment}` contains invalid character {c:?}"
        )));
    }

    Ok(())
}

/// Normalize a resource path: strip surrounding slashes and validate each
/// segment. The empty string is the repository root.
pub fn normalize_resource_path(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.len() > MAX_PATH_DEPTH {
        return Err(AppError::BadRequest(format!(
            "resource path cannot be deeper than {MAX_PATH_DEPTH} segments"
        )));
    }
    for segment in &segments {
        validate_segment(segment)?;
    }

    Ok(segments.join("/"))
}

/// Validate a namespace prefix.
///
/// A prefix must be an XML `NCName` (letter or `_`, then letters, digits,
/// `.`, `-`, `_`) and must not start with `xml` in any case.
pub fn validate_prefix(prefix: &str) -> AppResult<()> {
    if prefix.is_empty() {
        return Err(AppError::InvalidPrefix(
            "namespace prefix cannot be empty".to_string(),
        ));
    }

    if prefix.chars().count() > MAX_PREFIX_LENGTH {
        return Err(AppError::InvalidPrefix(format!(
            "namespace prefix cannot exceed {MAX_PREFIX_LENGTH} characters"
        )));
    }

    let mut chars = prefix.chars();
    let starts_ok = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_');
    let rest_ok = chars.all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if !starts_ok || !rest_ok {
        return Err(AppError::InvalidPrefix(format!(
            "namespace prefix `{prefix}` is not a valid NCName"
        )));
    }

    if prefix
        .get(..3)
        .is_some_and(|head| head.eq_ignore_ascii_case("xml"))
    {
        return Err(AppError::InvalidPrefix(format!(
            "namespace prefix `{prefix}` is reserved"
        )));
    }

    Ok(())
}

/// Validate that a namespace is an absolute URI.
pub fn validate_namespace_uri(namespace: &str) -> AppResult<Url> {
    let namespace = namespace.trim();
    Url::parse(namespace).map_err(|e| AppError::from(UriError::parse(namespace, e)))
}
