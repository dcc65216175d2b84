use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{files, handlers, middleware::metrics_middleware};
use crate::state::AppState;

/// Files accepted in a single multipart upload at the size ceiling.
const MAX_FILES_PER_UPLOAD: u64 = 10;

/// Room for multipart boundaries and headers.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Oversize files must reach the ingestion gate to be rejected with a 400,
    // so the body limit sits well above the per-file ceiling.
    let body_limit = state
        .config()
        .upload
        .max_file_size_bytes
        .saturating_mul(MAX_FILES_PER_UPLOAD)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Files
        .route(
            "/files/upload",
            post(files::upload_files).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/files", get(files::list_files))
        .route("/files/{id}", get(files::get_file).delete(files::delete_file))
        .route("/files/{id}/status", patch(files::update_status))
        .route("/files/{id}/download", get(files::download_file));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
