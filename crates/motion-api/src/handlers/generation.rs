//! Generation, upscaling and sequence access.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use motion_models::{
    Direction, GenerationStatus, OperationKind, ResolutionTier, Sequence, SequenceId,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Generation request body.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub direction: Direction,
}

/// Upscale request body.
#[derive(Debug, Default, Deserialize)]
pub struct UpscaleRequest {
    #[serde(default)]
    pub resolution: Option<ResolutionTier>,
}

/// Summary of a sequence, without image payloads.
#[derive(Debug, Serialize)]
pub struct SequenceSummary {
    pub id: SequenceId,
    pub frame_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Sequence> for SequenceSummary {
    fn from(sequence: &Sequence) -> Self {
        Self {
            id: sequence.id(),
            frame_count: sequence.len(),
            created_at: sequence.created_at(),
        }
    }
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: GenerationStatus,
    pub percentage: u8,
    pub current_operation: Option<OperationKind>,
    pub upscale_available: bool,
}

/// Generate a new sequence from the seed image.
///
/// A client that disconnects early does not stop the batch; its outcome
/// shows up in the status and sequence endpoints.
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Json<SequenceSummary>> {
    let sequence = state
        .studio
        .generate(request.description.trim(), request.direction)
        .await?;
    Ok(Json(SequenceSummary::from(sequence.as_ref())))
}

/// Upscale every frame of the current sequence.
pub async fn upscale(
    State(state): State<AppState>,
    request: Option<Json<UpscaleRequest>>,
) -> ApiResult<Json<SequenceSummary>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let resolution = request.resolution.unwrap_or_default();

    let sequence = state.studio.upscale(resolution).await?;
    Ok(Json(SequenceSummary::from(sequence.as_ref())))
}

/// Current operation progress.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.studio.status();
    Json(StatusResponse {
        percentage: status.percentage(),
        status,
        current_operation: state.studio.current_operation(),
        upscale_available: state.studio.supports_upscale(),
    })
}

/// The full current sequence, frames inline.
pub async fn get_sequence(State(state): State<AppState>) -> ApiResult<Json<Sequence>> {
    let sequence = state
        .studio
        .sequence()
        .await
        .ok_or_else(|| ApiError::not_found("No sequence has been generated"))?;
    Ok(Json(Sequence::clone(&sequence)))
}

/// A single frame as an image response.
pub async fn get_frame(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Response> {
    let frame = state.studio.frame(index).await?;
    let bytes = frame
        .image
        .decode()
        .map_err(|e| ApiError::internal(format!("frame {} is not valid base64: {}", index, e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, frame.image.mime_type.clone()),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        bytes,
    )
        .into_response())
}
