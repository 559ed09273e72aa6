//! Resource tree endpoints.
//!
//! Every URI in a response body or header is built from the
//! forwarding-aware [`ForwardedUriInfo`], so clients behind a reverse proxy
//! see their own scheme, host and port.

use axum::Json;
use axum::extract::State;
use axum::http::header::{LINK, LOCATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{info, instrument};
use uuid::Uuid;

use super::util::{captured_path, link_header, resource_uri, uri_header};
use crate::error::{AppError, AppResult};
use crate::models::ResourceResponse;
use crate::repository::{Repository, Resource};
use crate::state::AppState;
use crate::uri_info::{ForwardedUriInfo, RequestUriInfo, UriInfo};
use crate::validation::validate_segment;

/// Header carrying the client's preferred name for a new child.
pub const SLUG: &str = "slug";

type RequestContext = ForwardedUriInfo<RequestUriInfo>;

fn describe(
    uri_info: &impl UriInfo,
    repository: &Repository,
    resource: &Resource,
) -> AppResult<ResourceResponse> {
    let parent = Repository::parent_of(&resource.path)
        .map(|parent| resource_uri(uri_info, parent).map(String::from))
        .transpose()?;

    let children = repository
        .children(&resource.path)
        .into_iter()
        .map(|child| resource_uri(uri_info, &child.path).map(String::from))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ResourceResponse {
        id: resource_uri(uri_info, &resource.path)?.into(),
        parent,
        children,
        created: resource.created,
    })
}

fn created(uri_info: &impl UriInfo, repository: &Repository, path: &str) -> AppResult<Response> {
    let resource = repository.get(path)?;
    let body = describe(uri_info, repository, resource)?;
    let location = uri_header(&resource_uri(uri_info, path)?)?;

    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(body)).into_response())
}

/// Name for a new child: the `Slug` header when present, else a random UUID.
fn child_name(headers: &HeaderMap) -> AppResult<String> {
    match headers.get(SLUG) {
        Some(value) => {
            let slug = value
                .to_str()
                .map_err(|_| AppError::BadRequest("Slug header is not visible ASCII".to_string()))?
                .trim();
            validate_segment(slug)?;
            Ok(slug.to_string())
        }
        None => Ok(Uuid::new_v4().to_string()),
    }
}

/// Describe a resource and its children.
#[instrument(skip(state, uri_info), fields(path = %uri_info.path(true)))]
pub async fn get_resource(
    State(state): State<AppState>,
    uri_info: RequestContext,
) -> AppResult<Response> {
    let path = captured_path(&uri_info)?;
    let repository = state.repository.read().await;

    let resource = repository.get(&path)?;
    let body = describe(&uri_info, &repository, resource)?;
    let link = link_header(&resource_uri(&uri_info, &path)?, "self")?;

    Ok(([(LINK, link)], Json(body)).into_response())
}

/// Create a child of the addressed container.
#[instrument(skip(state, uri_info, headers), fields(path = %uri_info.path(true)))]
pub async fn create_child(
    State(state): State<AppState>,
    uri_info: RequestContext,
    headers: HeaderMap,
) -> AppResult<Response> {
    let parent = captured_path(&uri_info)?;
    let name = child_name(&headers)?;
    let path = if parent.is_empty() {
        name
    } else {
        format!("{parent}/{name}")
    };

    let mut repository = state.repository.write().await;
    if !repository.contains(&parent) {
        return Err(AppError::NotFound(format!("/{parent}")));
    }
    repository.create(&path)?;
    info!(path = %path, "Created resource");

    created(&uri_info, &repository, &path)
}

/// Create a resource at the addressed path.
#[instrument(skip(state, uri_info), fields(path = %uri_info.path(true)))]
pub async fn put_resource(
    State(state): State<AppState>,
    uri_info: RequestContext,
) -> AppResult<Response> {
    let path = captured_path(&uri_info)?;

    let mut repository = state.repository.write().await;
    repository.create(&path)?;
    info!(path = %path, "Created resource");

    created(&uri_info, &repository, &path)
}

/// Delete a resource and everything below it.
#[instrument(skip(state, uri_info), fields(path = %uri_info.path(true)))]
pub async fn delete_resource(
    State(state): State<AppState>,
    uri_info: RequestContext,
) -> AppResult<StatusCode> {
    let path = captured_path(&uri_info)?;
    state.repository.write().await.delete(&path)?;

    Ok(StatusCode::NO_CONTENT)
}
