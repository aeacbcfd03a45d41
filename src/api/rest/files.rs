//! File operations routes
//!
//! The five endpoints of the facade: upload, listing, metadata, download,
//! delete. Each handler translates one HTTP exchange into store calls;
//! nothing is cached across requests.

use crate::api::AppState;
use crate::store::RawListing;
use axum::body::{Body, Bytes};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};

use super::error::ApiError;
use super::types::{FileMetadata, ListFilesResponse, PutFileResponse, RawListQuery};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

// ============================================================================
// ROUTES
// ============================================================================

pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/files", get(list_files))
        .route(
            "/v1/files/*file_path",
            put(upload_file)
                .get(download_file)
                .head(get_file_metadata)
                .delete(delete_file),
        )
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Upload a file, overwriting any existing object at the path.
///
/// The existence probe and the write are two separate store calls; a
/// concurrent writer in between can flip the created/updated signal. The
/// store offers no conditional put here, so the race is accepted.
async fn upload_file(
    State(state): State<AppState>,
    Path(file_path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<PutFileResponse>), ApiError> {
    let already_exists = state.store.exists(&file_path).await?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    state.store.put(&file_path, body, content_type).await?;

    let (status, message) = if already_exists {
        (StatusCode::OK, format!("Existing file updated at /{file_path}"))
    } else {
        (StatusCode::CREATED, format!("New file uploaded at /{file_path}"))
    };

    tracing::info!(path = %file_path, created = !already_exists, "uploaded file");

    Ok((status, Json(PutFileResponse { file_path, message })))
}

/// List files with pagination.
async fn list_files(
    State(state): State<AppState>,
    query: Result<Query<RawListQuery>, QueryRejection>,
) -> Result<Json<ListFilesResponse>, ApiError> {
    // A query string that fails to deserialize (e.g. non-integer
    // page_size) is a validation failure, not a routing one.
    let Query(raw) = query.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let query = raw.validate()?;

    let listing = match &query.page_token {
        // Continue mode: the token already encodes position and filter
        // state from the prior call, so no prefix is passed.
        Some(token) => state.store.list_from(token, query.page_size).await?,
        None => state.store.list(&query.directory, query.page_size).await?,
    };

    Ok(Json(assemble_listing(listing)))
}

/// Retrieve file metadata.
///
/// Note: by convention, HEAD responses MUST NOT carry a body.
async fn get_file_metadata(
    State(state): State<AppState>,
    Path(file_path): Path<String>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    if !state.store.exists(&file_path).await? {
        return Err(ApiError::NotFound);
    }

    let meta = state.store.head(&file_path).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&meta.content_type)
            .unwrap_or(HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.content_length));
    let last_modified = meta
        .last_modified
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    headers.insert(
        header::LAST_MODIFIED,
        HeaderValue::from_str(&last_modified)
            .unwrap_or(HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT")),
    );

    Ok((StatusCode::OK, headers))
}

/// Retrieve a file, streaming the stored bytes straight through. The body
/// is never buffered whole, so memory use is independent of object size.
async fn download_file(
    State(state): State<AppState>,
    Path(file_path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.store.exists(&file_path).await? {
        return Err(ApiError::NotFound);
    }

    let object = state.store.get(&file_path).await?;

    let content_type = HeaderValue::from_str(&object.meta.content_type)
        .unwrap_or(HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        Body::from_stream(object.body),
    ))
}

/// Delete a file.
///
/// A delete racing another delete (or a repeated delete) reports 404
/// rather than succeeding idempotently; double deletes are surfaced to
/// the caller on purpose.
async fn delete_file(
    State(state): State<AppState>,
    Path(file_path): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.store.exists(&file_path).await? {
        return Err(ApiError::NotFound);
    }

    state.store.delete(&file_path).await?;
    tracing::info!(path = %file_path, "deleted file");

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// LISTING ASSEMBLY
// ============================================================================

/// Map a raw store listing to the external representation. Entries keep
/// the store's order and values verbatim; the continuation token is
/// surfaced only when the store signalled more results.
fn assemble_listing(listing: RawListing) -> ListFilesResponse {
    let files = listing
        .items
        .into_iter()
        .map(|item| FileMetadata {
            file_path: item.key,
            last_modified: item.last_modified,
            size_bytes: item.size,
        })
        .collect();

    ListFilesResponse {
        files,
        next_page_token: listing.next_token.filter(|t| !t.is_empty()),
    }
}
