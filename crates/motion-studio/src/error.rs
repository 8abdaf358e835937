//! Studio error types.

use motion_models::{OperationKind, SequenceError};
use thiserror::Error;

use crate::playback::PlaybackError;

pub type StudioResult<T> = Result<T, StudioError>;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Another operation is in progress: {0}")]
    Busy(OperationKind),

    #[error("No seed image has been provided")]
    NoSeed,

    #[error("No sequence has been generated")]
    NoSequence,

    #[error("Upscaling requires an elevated API credential")]
    CredentialRequired,

    #[error("Result discarded: a new seed image was provided while {0} was running")]
    Superseded(OperationKind),

    #[error("{kind} failed: {failed} of {total} requests failed: {message}")]
    BatchFailed {
        kind: OperationKind,
        failed: usize,
        total: usize,
        message: String,
    },

    #[error("Media error: {0}")]
    Media(#[from] motion_media::MediaError),

    #[error("Model error: {0}")]
    GenAi(#[from] motion_genai::GenAiError),

    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudioError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if the error was caused by invalid caller input.
    pub fn is_input_error(&self) -> bool {
        match self {
            StudioError::Media(e) => e.is_input_error(),
            StudioError::Playback(_) => true,
            _ => false,
        }
    }

    /// Check if the error reflects the current session state rather than a failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            StudioError::NoSeed | StudioError::NoSequence | StudioError::CredentialRequired
        )
    }

    /// Check if the error is a conflict with another operation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StudioError::Busy(_) | StudioError::Superseded(_))
    }
}
