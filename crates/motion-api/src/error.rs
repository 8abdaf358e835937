//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use motion_studio::StudioError;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Studio(#[from] StudioError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Studio(e) => studio_status(e),
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Studio(StudioError::Busy(_)) => Some("busy"),
            ApiError::Studio(StudioError::Superseded(_)) => Some("superseded"),
            ApiError::Studio(StudioError::NoSeed) => Some("no_seed"),
            ApiError::Studio(StudioError::NoSequence) => Some("no_sequence"),
            ApiError::Studio(StudioError::CredentialRequired) => Some("credential_required"),
            ApiError::Studio(StudioError::BatchFailed { .. }) => Some("batch_failed"),
            _ => None,
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
            && !matches!(self, ApiError::Studio(StudioError::BatchFailed { .. }))
    }
}

fn studio_status(error: &StudioError) -> StatusCode {
    if error.is_conflict() {
        StatusCode::CONFLICT
    } else if error.is_precondition() {
        StatusCode::PRECONDITION_FAILED
    } else if matches!(error, StudioError::Playback(_)) {
        StatusCode::UNPROCESSABLE_ENTITY
    } else if error.is_input_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if self.is_internal()
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code().map(str::to_string),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_models::OperationKind;
    use motion_studio::PlaybackError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Studio(StudioError::Busy(OperationKind::Generate)), StatusCode::CONFLICT),
            (ApiError::Studio(StudioError::NoSeed), StatusCode::PRECONDITION_FAILED),
            (ApiError::Studio(StudioError::CredentialRequired), StatusCode::PRECONDITION_FAILED),
            (
                ApiError::Studio(StudioError::Playback(PlaybackError::InvalidRate(0))),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::Studio(StudioError::Media(motion_media::MediaError::EmptyUpload)),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::bad_request("x"), StatusCode::BAD_REQUEST),
            (ApiError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{error}");
        }
    }
}
