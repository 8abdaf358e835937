//! Structured operation logging utilities.
//!
//! Provides consistent, structured logging for studio operations with
//! tracing spans and contextual information.

use motion_models::OperationKind;
use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Operation logger for structured logging with consistent formatting.
///
/// Every studio operation gets a fresh operation id so concurrent log
/// lines (seed uploads racing a batch, for example) can be told apart.
#[derive(Debug, Clone)]
pub struct OperationLogger {
    operation_id: String,
    kind: OperationKind,
}

impl OperationLogger {
    /// Create a logger with a fresh operation id.
    pub fn new(kind: OperationKind) -> Self {
        Self {
            operation_id: Uuid::new_v4().to_string(),
            kind,
        }
    }

    /// Log the start of an operation.
    pub fn log_start(&self, message: &str) {
        info!(
            operation_id = %self.operation_id,
            operation = %self.kind,
            "Operation started: {}", message
        );
    }

    /// Log a progress update.
    pub fn log_progress(&self, message: &str) {
        info!(
            operation_id = %self.operation_id,
            operation = %self.kind,
            "Operation progress: {}", message
        );
    }

    /// Log a warning.
    pub fn log_warning(&self, message: &str) {
        warn!(
            operation_id = %self.operation_id,
            operation = %self.kind,
            "Operation warning: {}", message
        );
    }

    /// Log an error.
    pub fn log_error(&self, message: &str) {
        error!(
            operation_id = %self.operation_id,
            operation = %self.kind,
            "Operation error: {}", message
        );
    }

    /// Log the completion of an operation.
    pub fn log_completion(&self, message: &str) {
        info!(
            operation_id = %self.operation_id,
            operation = %self.kind,
            "Operation completed: {}", message
        );
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Create a tracing span for this operation.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "operation",
            operation_id = %self.operation_id,
            operation = %self.kind
        )
    }
}
