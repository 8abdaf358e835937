//! Generation status for progress tracking and polling.
//!
//! The status is owned by whichever operation is currently in flight and
//! is reset whenever a new operation starts or a new seed image arrives.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of studio operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Generate,
    Upscale,
    ExportVideo,
    ExportArchive,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Generate => "generate",
            OperationKind::Upscale => "upscale",
            OperationKind::ExportVideo => "export_video",
            OperationKind::ExportArchive => "export_archive",
        }
    }

    /// Whether the operation issues a batch of model requests.
    pub fn is_batch(&self) -> bool {
        matches!(self, OperationKind::Generate | OperationKind::Upscale)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress of the current (or last) operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationStatus {
    /// Operation this status describes, if any ran since the last reset
    pub operation: Option<OperationKind>,
    /// Whether the operation is still running
    pub in_progress: bool,
    /// Number of expected outputs that have arrived
    pub completed: usize,
    /// Number of expected outputs
    pub total: usize,
    /// Error message of the last failed operation
    pub error: Option<String>,
    /// When the status was last updated
    pub updated_at: DateTime<Utc>,
}

impl Default for GenerationStatus {
    fn default() -> Self {
        Self {
            operation: None,
            in_progress: false,
            completed: 0,
            total: 0,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

impl GenerationStatus {
    /// Reset to the idle state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Begin a new operation expecting `total` outputs.
    pub fn start(&mut self, operation: OperationKind, total: usize) {
        self.operation = Some(operation);
        self.in_progress = true;
        self.completed = 0;
        self.total = total;
        self.error = None;
        self.updated_at = Utc::now();
    }

    /// Record one successful output.
    pub fn record_completion(&mut self) {
        self.completed = (self.completed + 1).min(self.total);
        self.updated_at = Utc::now();
    }

    /// Mark the operation as finished successfully.
    pub fn finish(&mut self) {
        self.in_progress = false;
        self.updated_at = Utc::now();
    }

    /// Mark the operation as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.in_progress = false;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Progress percentage (0-100).
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total).min(100) as u8
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lifecycle() {
        let mut status = GenerationStatus::default();
        assert!(!status.in_progress);
        assert_eq!(status.percentage(), 0);

        status.start(OperationKind::Generate, 4);
        assert!(status.in_progress);
        assert_eq!(status.total, 4);

        status.record_completion();
        status.record_completion();
        assert_eq!(status.completed, 2);
        assert_eq!(status.percentage(), 50);

        status.finish();
        assert!(!status.in_progress);
        assert!(!status.is_failed());
    }

    #[test]
    fn test_status_failure_keeps_progress() {
        let mut status = GenerationStatus::default();
        status.start(OperationKind::Upscale, 3);
        status.record_completion();
        status.fail("model returned 500");

        assert!(!status.in_progress);
        assert_eq!(status.completed, 1);
        assert_eq!(status.error.as_deref(), Some("model returned 500"));
    }

    #[test]
    fn test_start_clears_previous_error() {
        let mut status = GenerationStatus::default();
        status.start(OperationKind::Generate, 2);
        status.fail("boom");
        status.start(OperationKind::Generate, 2);
        assert!(status.error.is_none());
        assert_eq!(status.completed, 0);
    }

    #[test]
    fn test_completion_is_capped() {
        let mut status = GenerationStatus::default();
        status.start(OperationKind::Generate, 1);
        status.record_completion();
        status.record_completion();
        assert_eq!(status.completed, 1);
    }

    #[test]
    fn test_reset() {
        let mut status = GenerationStatus::default();
        status.start(OperationKind::Generate, 10);
        status.record_completion();
        status.reset();
        assert_eq!(status.completed, 0);
        assert_eq!(status.operation, None);
    }
}
