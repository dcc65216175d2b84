//! File API handlers.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use vellum_core::{
    FileError, FileRecord, FileStatus, OrchestratorError, StorageError,
    UploadedArtifact,
};

use crate::state::AppState;

/// Multipart field carrying uploaded files.
const FILES_FIELD: &str = "files";

/// Message recorded when a file is marked failed without one.
const DEFAULT_FAILURE_MESSAGE: &str = "marked as failed";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing files
#[derive(Debug, Deserialize)]
pub struct ListFilesParams {
    /// Filter by status
    pub status: Option<String>,
}

/// Request body for changing a file's status
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusBody {
    pub status: String,
    pub error_message: Option<String>,
}

/// Response for an upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub files: Vec<FileRecord>,
}

/// Response for listing files
#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub files: Vec<FileRecord>,
    pub total: usize,
}

/// Response for deleting a file
#[derive(Debug, Serialize)]
pub struct DeleteFileResponse {
    pub id: String,
    pub deleted: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn not_found(id: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, format!("File not found: {}", id))
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// Upload one or more files
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, impl IntoResponse> {
    let mut artifacts = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(api_error(e.status(), e.body_text())),
        };
        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let mime_type = field.content_type().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(content) => artifacts.push(UploadedArtifact::new(filename, mime_type, content)),
            Err(e) => {
                return Err(api_error(
                    e.status(),
                    format!("Failed to read file: {}", e.body_text()),
                ))
            }
        }
    }

    if artifacts.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("No files provided in '{}' field", FILES_FIELD),
        ));
    }

    match state.gate().accept_batch(artifacts).await {
        Ok(accepted) => Ok(Json(UploadResponse {
            files: accepted.into_iter().map(|i| i.record).collect(),
        })),
        Err(e) if e.is_validation() => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => Err(internal(e)),
    }
}

/// List files, newest first
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListFilesParams>,
) -> Result<Json<ListFilesResponse>, impl IntoResponse> {
    let filter = match params.status.as_deref() {
        Some(raw) => match FileStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    format!("Unknown status: {}", raw),
                ))
            }
        },
        None => None,
    };

    let files: Vec<FileRecord> = match state.store().list() {
        Ok(files) => files
            .into_iter()
            .filter(|f| filter.map_or(true, |s| f.status == s))
            .collect(),
        Err(e) => return Err(internal(e)),
    };

    Ok(Json(ListFilesResponse {
        total: files.len(),
        files,
    }))
}

/// Get a file by ID
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FileRecord>, impl IntoResponse> {
    match state.store().get(&id) {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(not_found(&id)),
        Err(e) => Err(internal(e)),
    }
}

/// Change a file's status.
///
/// `processing` retries a failed file; `error` marks a file failed.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<(StatusCode, Json<FileRecord>), impl IntoResponse> {
    match FileStatus::parse(&body.status) {
        Some(FileStatus::Processing) => retry_file(&state, &id),
        Some(FileStatus::Error) => {
            let message = body
                .error_message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
            mark_failed(&state, &id, message)
        }
        _ => Err(api_error(
            StatusCode::BAD_REQUEST,
            format!(
                "Unsupported status '{}': expected 'processing' or 'error'",
                body.status
            ),
        )),
    }
}

fn retry_file(state: &AppState, id: &str) -> Result<(StatusCode, Json<FileRecord>), ApiError> {
    match state.orchestrator().retry(id) {
        Ok(_) => {}
        Err(OrchestratorError::FileNotFound(_)) => return Err(not_found(id)),
        Err(e @ OrchestratorError::InvalidState { .. })
        | Err(e @ OrchestratorError::AlreadyRunning(_)) => {
            return Err(api_error(StatusCode::CONFLICT, e.to_string()))
        }
        Err(e) => return Err(internal(e)),
    }

    match state.store().get(id) {
        Ok(Some(record)) => Ok((StatusCode::ACCEPTED, Json(record))),
        // Deleted right after the retry was scheduled.
        Ok(None) => Err(not_found(id)),
        Err(e) => Err(internal(e)),
    }
}

fn mark_failed(
    state: &AppState,
    id: &str,
    message: String,
) -> Result<(StatusCode, Json<FileRecord>), ApiError> {
    if state.orchestrator().is_running(id) {
        return Err(api_error(
            StatusCode::CONFLICT,
            format!("File {} is still being processed", id),
        ));
    }

    let result = state.store().update(id, &mut |r: &mut FileRecord| {
        let partial = r.metadata.clone();
        r.fail(message.clone(), partial)
    });

    match result {
        Ok(record) => {
            info!("File {} marked as failed: {}", id, message);
            Ok((StatusCode::OK, Json(record)))
        }
        Err(FileError::NotFound(_)) => Err(not_found(id)),
        Err(e @ FileError::InvalidTransition { .. }) => {
            Err(api_error(StatusCode::CONFLICT, e.to_string()))
        }
        Err(e) => Err(internal(e)),
    }
}

/// Delete a file and its stored content
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteFileResponse>, impl IntoResponse> {
    match state.store().delete(&id) {
        Ok(true) => {}
        Ok(false) => return Err(not_found(&id)),
        Err(e) => return Err(internal(e)),
    }

    if let Err(e) = state.storage().remove(&id).await {
        warn!("Failed to remove stored content for {}: {}", id, e);
    }
    info!("Deleted file {}", id);

    Ok(Json(DeleteFileResponse { id, deleted: true }))
}

/// Download a file's original bytes
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, impl IntoResponse> {
    let record = match state.store().get(&id) {
        Ok(Some(record)) => record,
        Ok(None) => return Err(not_found(&id)),
        Err(e) => return Err(internal(e)),
    };

    let content = match state.storage().load(&id).await {
        Ok(content) => content,
        Err(StorageError::NotFound(_)) => {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                format!("Content not found for file: {}", id),
            ))
        }
        Err(e) => return Err(internal(e)),
    };

    let content_type = HeaderValue::from_str(&record.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&record.original_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(internal)
}

/// `attachment` disposition with the filename reduced to printable ASCII.
fn content_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}
