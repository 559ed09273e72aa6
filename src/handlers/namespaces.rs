//! Namespace prefix registry endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use tracing::instrument;

use super::util::uri_header;
use crate::error::AppResult;
use crate::models::NamespacesResponse;
use crate::repository::Registration;
use crate::state::AppState;
use crate::uri_info::{ForwardedUriInfo, RequestUriInfo, UriInfo};

/// List all registered prefixes.
#[instrument(skip(state))]
pub async fn list_namespaces(State(state): State<AppState>) -> Json<NamespacesResponse> {
    let repository = state.repository.read().await;
    Json(NamespacesResponse {
        namespaces: repository.namespaces().clone(),
    })
}

/// Register or replace a prefix. The body is the namespace URI.
///
/// Returns 201 with a `Location` for a new prefix, 204 when an existing one
/// was replaced.
#[instrument(skip(state, uri_info, body))]
pub async fn put_namespace(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
    uri_info: ForwardedUriInfo<RequestUriInfo>,
    body: String,
) -> AppResult<Response> {
    let registration = state
        .repository
        .write()
        .await
        .register_namespace(&prefix, &body)?;

    Ok(match registration {
        Registration::Created => {
            let location = uri_header(&uri_info.absolute_path())?;
            (StatusCode::CREATED, [(LOCATION, location)]).into_response()
        }
        Registration::Replaced => StatusCode::NO_CONTENT.into_response(),
    })
}

/// Remove a prefix.
#[instrument(skip(state))]
pub async fn delete_namespace(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> AppResult<StatusCode> {
    state.repository.write().await.remove_namespace(&prefix)?;
    Ok(StatusCode::NO_CONTENT)
}
