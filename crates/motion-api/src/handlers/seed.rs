//! Seed image upload.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use motion_studio::SeedInfo;

use crate::error::ApiResult;
use crate::state::AppState;

/// Replace the seed image with the raw request body.
///
/// The body must carry an `image/*` content type. Any running batch is
/// discarded once it finishes.
pub async fn upload_seed(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<SeedInfo>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let info = state.studio.set_seed(content_type, &body).await?;
    Ok(Json(info))
}

/// Describe the current seed image.
pub async fn get_seed(State(state): State<AppState>) -> Json<Option<SeedInfo>> {
    Json(state.studio.seed().await)
}
