use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{Level, debug};

use crate::metrics;
use crate::uri_info::UriError;

/// Content type of every error body.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Body sent instead of the message when a kind does not expose it.
const GENERIC_INTERNAL_MESSAGE: &str =
    "An internal error occurred. Please contact support if the issue persists.";

/// Application-wide error types.
///
/// Every variant is turned into an HTTP response by the same policy: a status
/// code, a plain-text body carrying the error message, and a fixed content
/// type. See [`AppError::policy`] for the per-kind table.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid namespace prefix: {0}")]
    InvalidPrefix(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(#[from] UriError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    ItemExists(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// How one error kind is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub status: StatusCode,
    /// Whether the error message is safe to show to clients.
    pub expose_message: bool,
}

impl ErrorPolicy {
    const fn client(status: StatusCode) -> Self {
        Self {
            status,
            expose_message: true,
        }
    }

    const fn server(status: StatusCode) -> Self {
        Self {
            status,
            expose_message: false,
        }
    }
}

impl AppError {
    /// Stable machine-readable name, used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPrefix(_) => "invalid_prefix",
            Self::InvalidUri(_) => "invalid_uri",
            Self::NotFound(_) => "not_found",
            Self::ItemExists(_) => "item_exists",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal_error",
            Self::ConfigError(_) => "config_error",
        }
    }

    pub fn policy(&self) -> ErrorPolicy {
        match self {
            Self::InvalidPrefix(_) | Self::InvalidUri(_) | Self::BadRequest(_) => {
                ErrorPolicy::client(StatusCode::BAD_REQUEST)
            }
            Self::NotFound(_) => ErrorPolicy::client(StatusCode::NOT_FOUND),
            Self::ItemExists(_) => ErrorPolicy::client(StatusCode::CONFLICT),
            Self::Internal(_) | Self::ConfigError(_) => {
                ErrorPolicy::server(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// The message without the kind prefix of the `Display` output.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidPrefix(msg)
            | Self::NotFound(msg)
            | Self::ItemExists(msg)
            | Self::BadRequest(msg)
            | Self::Internal(msg)
            | Self::ConfigError(msg) => msg.clone(),
            Self::InvalidUri(e) => e.to_string(),
        }
    }

    /// Body sent to the client.
    pub fn body(&self) -> String {
        if self.policy().expose_message {
            self.message()
        } else {
            GENERIC_INTERNAL_MESSAGE.to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let policy = self.policy();
        let kind = self.kind();

        tracing::error!(kind, status = policy.status.as_u16(), error = %self, "Request failed");
        log_error_chain(&self);
        metrics::record_error_response(kind, policy.status.as_u16());

        (policy.status, [(CONTENT_TYPE, TEXT_PLAIN_UTF8)], self.body()).into_response()
    }
}

/// Dump the error and its causes when debug logging is on.
fn log_error_chain(error: &dyn StdError) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }

    debug!(error = ?error, "Error details");
    let mut depth = 0;
    let mut source = error.source();
    while let Some(cause) = source {
        depth += 1;
        debug!(depth, cause = %cause, "Caused by");
        source = cause.source();
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
