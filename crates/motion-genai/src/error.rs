//! Model client error types.

use thiserror::Error;

pub type GenAiResult<T> = Result<T, GenAiError>;

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Gemini API returned {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("No image in model response{}", finish_reason_suffix(.0))]
    NoImage(Option<String>),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GenAiError {
    fn from(err: reqwest::Error) -> Self {
        GenAiError::Network(err.without_url())
    }
}

impl GenAiError {
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// HTTP status returned by the API, if the request got that far.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GenAiError::RequestFailed { status, .. } => Some(*status),
            GenAiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenAiError::Config(_) => "config",
            GenAiError::MissingCredential(_) => "credential",
            GenAiError::RequestFailed { .. } => "http_status",
            GenAiError::Blocked(_) => "blocked",
            GenAiError::NoImage(_) => "no_image",
            GenAiError::InvalidResponse(_) => "invalid_response",
            GenAiError::Network(e) if e.is_timeout() => "timeout",
            GenAiError::Network(_) => "network",
            GenAiError::Json(_) => "json",
        }
    }
}

fn finish_reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" (finish reason: {})", r))
        .unwrap_or_default()
}
