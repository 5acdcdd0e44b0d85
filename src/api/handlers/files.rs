//! Per-identity file routes.
//!
//! Every route is scoped by the `{handle}` path segment and needs an
//! authenticated session for that same handle. Uploads are recorded by name,
//! media type and size; the payload bytes are counted and dropped.

use super::{
    principal::require_owner,
    state::AppState,
    types::{ErrorResponse, FileEntry, UploadForm},
};
use crate::vault::FileDescriptor;
use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        Extension, Path,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

#[utoipa::path(
    get,
    path = "/v1/identities/{handle}/files",
    params(
        ("handle" = String, Path, description = "Owner handle")
    ),
    responses(
        (status = 200, description = "Files in upload order", body = [FileEntry]),
        (status = 401, description = "No authenticated session"),
        (status = 404, description = "Handle does not belong to the session"),
    ),
    tag = "files"
)]
#[instrument(skip(headers, state))]
pub async fn list_files(
    headers: HeaderMap,
    Path(handle): Path<String>,
    state: Extension<Arc<AppState>>,
) -> Response {
    if let Err(status) = require_owner(&headers, &state, &handle).await {
        return status.into_response();
    }

    let entries: Vec<FileEntry> = state
        .files()
        .list_for(&handle)
        .await
        .into_iter()
        .map(FileEntry::from)
        .collect();

    (StatusCode::OK, Json(entries)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/identities/{handle}/files",
    params(
        ("handle" = String, Path, description = "Owner handle")
    ),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Records created in submitted order", body = [FileEntry]),
        (status = 400, description = "Malformed multipart body or no file parts", body = ErrorResponse),
        (status = 401, description = "No authenticated session"),
        (status = 404, description = "Handle does not belong to the session"),
        (status = 413, description = "Upload exceeds the body limit", body = ErrorResponse),
    ),
    tag = "files"
)]
#[instrument(skip(headers, state, multipart))]
pub async fn upload_files(
    headers: HeaderMap,
    Path(handle): Path<String>,
    state: Extension<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    // Authorization is decided before the body is looked at.
    if let Err(status) = require_owner(&headers, &state, &handle).await {
        return status.into_response();
    }

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("rejected upload: {rejection}");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(rejection.body_text())),
            )
                .into_response();
        }
    };

    let descriptors = match read_descriptors(&mut multipart).await {
        Ok(descriptors) => descriptors,
        Err(err) => {
            debug!("failed to read upload: {err}");
            return (err.status(), Json(ErrorResponse::new(err.body_text()))).into_response();
        }
    };

    if descriptors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("No files in upload.")),
        )
            .into_response();
    }

    let created: Vec<FileEntry> = state
        .files()
        .append(&handle, descriptors)
        .await
        .into_iter()
        .map(FileEntry::from)
        .collect();

    info!(handle = %handle, count = created.len(), "files uploaded");

    (StatusCode::CREATED, Json(created)).into_response()
}

#[utoipa::path(
    delete,
    path = "/v1/identities/{handle}/files/{storage_id}",
    params(
        ("handle" = String, Path, description = "Owner handle"),
        ("storage_id" = String, Path, description = "Storage identifier of the file")
    ),
    responses(
        (status = 204, description = "File removed"),
        (status = 401, description = "No authenticated session"),
        (status = 404, description = "Unknown file or handle does not belong to the session", body = ErrorResponse),
    ),
    tag = "files"
)]
#[instrument(skip(headers, state))]
pub async fn delete_file(
    headers: HeaderMap,
    Path((handle, storage_id)): Path<(String, String)>,
    state: Extension<Arc<AppState>>,
) -> Response {
    if let Err(status) = require_owner(&headers, &state, &handle).await {
        return status.into_response();
    }

    match state.files().remove(&handle, &storage_id).await {
        Some(record) => {
            info!(handle = %handle, storage_id = %record.storage_id, "file removed");
            StatusCode::NO_CONTENT.into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("File not found.")),
        )
            .into_response(),
    }
}

/// One descriptor per part that carries a filename, in submitted order.
async fn read_descriptors(
    multipart: &mut Multipart,
) -> Result<Vec<FileDescriptor>, MultipartError> {
    let mut descriptors = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        let Some(name) = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            continue;
        };
        let media_type = field
            .content_type()
            .map_or_else(|| DEFAULT_MEDIA_TYPE.to_string(), str::to_string);

        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
        }

        descriptors.push(FileDescriptor::new(name, media_type, size));
    }

    Ok(descriptors)
}
