//! REST endpoints for the archive job.

use std::path::PathBuf;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info, warn};

use super::coordinator::Archiver;
use super::state::ArchiveStatus;

/// Shared state for archive routes.
#[derive(Clone)]
pub struct ArchiveRouteState {
    pub archiver: Archiver,
    /// Directory the artifact is served from.
    pub data_dir: PathBuf,
}

/// Build the archive routes.
pub fn archive_routes(state: ArchiveRouteState) -> Router {
    Router::new()
        .route(
            "/contacts/archive",
            get(get_archive).post(start_archive).delete(reset_archive),
        )
        .route("/contacts/archive/file", get(download_archive))
        .with_state(state)
}

/// GET /contacts/archive
///
/// Polled by clients while a run is in flight.
async fn get_archive(State(state): State<ArchiveRouteState>) -> impl IntoResponse {
    Json(state.archiver.snapshot())
}

/// POST /contacts/archive
async fn start_archive(State(state): State<ArchiveRouteState>) -> impl IntoResponse {
    let started = state.archiver.start();
    info!(started, "Archive start requested");
    Json(state.archiver.snapshot())
}

/// DELETE /contacts/archive
async fn reset_archive(State(state): State<ArchiveRouteState>) -> impl IntoResponse {
    state.archiver.reset();
    Json(state.archiver.snapshot())
}

/// GET /contacts/archive/file
///
/// Serves the artifact as an attachment once the run is complete.
async fn download_archive(State(state): State<ArchiveRouteState>) -> Response {
    let status = state.archiver.status();
    if status != ArchiveStatus::Complete {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "Archive is not complete",
                "status": status,
            })),
        )
            .into_response();
    }

    let name = state.archiver.artifact_name();
    let path = state.data_dir.join(name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            info!(path = %path.display(), bytes = bytes.len(), "Serving archive file");
            (
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{name}\""),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Archive file missing");
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "Archive file not found"})),
            )
                .into_response()
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read archive file");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to read archive file"})),
            )
                .into_response()
        }
    }
}
