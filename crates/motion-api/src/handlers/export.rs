//! Sequence exports.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use motion_media::ARCHIVE_MIME;

use crate::error::ApiResult;
use crate::state::AppState;

fn attachment(file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, mime_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Encode the sequence as WebM (or MP4) and return it as a download.
pub async fn export_video(State(state): State<AppState>) -> ApiResult<Response> {
    let artifact = state.studio.export_video().await?;
    let mime_type = artifact.mime_type();
    Ok(attachment(&artifact.file_name, mime_type, artifact.bytes))
}

/// Package the sequence as a zip of PNG frames and return it as a download.
pub async fn export_archive(State(state): State<AppState>) -> ApiResult<Response> {
    let artifact = state.studio.export_archive().await?;
    Ok(attachment(&artifact.file_name, ARCHIVE_MIME, artifact.bytes))
}
