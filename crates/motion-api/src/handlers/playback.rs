//! Playback control.

use axum::extract::{Path, State};
use axum::Json;
use motion_studio::{PlaybackState, StudioError};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

/// Rate change request body.
#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub fps: u32,
}

pub async fn get_playback(State(state): State<AppState>) -> Json<PlaybackState> {
    Json(state.studio.playback().state())
}

pub async fn play(State(state): State<AppState>) -> Json<PlaybackState> {
    Json(state.studio.playback().play())
}

pub async fn pause(State(state): State<AppState>) -> Json<PlaybackState> {
    Json(state.studio.playback().pause())
}

pub async fn toggle(State(state): State<AppState>) -> Json<PlaybackState> {
    Json(state.studio.playback().toggle())
}

/// Step forward one frame; pauses playback.
pub async fn next(State(state): State<AppState>) -> Json<PlaybackState> {
    Json(state.studio.playback().next())
}

/// Step back one frame; pauses playback.
pub async fn previous(State(state): State<AppState>) -> Json<PlaybackState> {
    Json(state.studio.playback().previous())
}

/// Jump to a frame; pauses playback.
pub async fn select(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Json<PlaybackState>> {
    let playback = state
        .studio
        .playback()
        .select(index)
        .map_err(StudioError::from)?;
    Ok(Json(playback))
}

pub async fn set_rate(
    State(state): State<AppState>,
    Json(request): Json<RateRequest>,
) -> ApiResult<Json<PlaybackState>> {
    let playback = state
        .studio
        .playback()
        .set_rate(request.fps)
        .map_err(StudioError::from)?;
    Ok(Json(playback))
}
