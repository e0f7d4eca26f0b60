//! Core error types.

use thiserror::Error;

/// Broad classification of engine errors, used by callers that branch on
/// the failure class rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The submitted definition failed validation.
    Validation,
    /// The operation collides with already-admitted data.
    Conflict,
    /// A referenced definition or instance does not exist.
    NotFound,
    /// A transition was refused by one of the execution guards.
    InvalidTransition,
    /// Invariant violation inside the engine.
    Internal,
}

/// Errors from the workflow engine.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid workflow definition: {reason}")]
    InvalidDefinition { reason: String },

    #[error("definition already exists: {id}")]
    DefinitionExists { id: String },

    #[error("definition not found: {id}")]
    DefinitionNotFound { id: String },

    #[error("instance not found: {id}")]
    InstanceNotFound { id: String },

    #[error("definition '{definition}' has no enabled initial state")]
    NoEnabledInitialState { definition: String },

    #[error("instance '{instance}' is in state '{state}' which does not exist in its definition")]
    CurrentStateMissing { instance: String, state: String },

    #[error("instance '{instance}' is in final state '{state}' and accepts no further actions")]
    FinalStateLocked { instance: String, state: String },

    #[error("action '{action}' not found in definition '{definition}'")]
    ActionNotFound { definition: String, action: String },

    #[error("action '{action}' is disabled")]
    ActionDisabled { action: String },

    #[error("action '{action}' cannot fire from state '{state}'")]
    InvalidSourceState { action: String, state: String },

    #[error("action '{action}' targets state '{state}' which is missing or disabled")]
    TargetStateUnavailable { action: String, state: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns an error code suitable for protocol responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidDefinition { .. } => "INVALID_DEFINITION",
            CoreError::DefinitionExists { .. } => "DEFINITION_EXISTS",
            CoreError::DefinitionNotFound { .. } => "DEFINITION_NOT_FOUND",
            CoreError::InstanceNotFound { .. } => "INSTANCE_NOT_FOUND",
            CoreError::NoEnabledInitialState { .. } => "NO_ENABLED_INITIAL_STATE",
            CoreError::CurrentStateMissing { .. } => "CURRENT_STATE_MISSING",
            CoreError::FinalStateLocked { .. } => "FINAL_STATE_LOCKED",
            CoreError::ActionNotFound { .. } => "ACTION_NOT_FOUND",
            CoreError::ActionDisabled { .. } => "ACTION_DISABLED",
            CoreError::InvalidSourceState { .. } => "INVALID_SOURCE_STATE",
            CoreError::TargetStateUnavailable { .. } => "TARGET_STATE_UNAVAILABLE",
            CoreError::Json(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the broad classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidDefinition { .. } => ErrorKind::Validation,
            CoreError::DefinitionExists { .. } => ErrorKind::Conflict,
            CoreError::DefinitionNotFound { .. } | CoreError::InstanceNotFound { .. } => {
                ErrorKind::NotFound
            }
            CoreError::NoEnabledInitialState { .. }
            | CoreError::CurrentStateMissing { .. }
            | CoreError::FinalStateLocked { .. }
            | CoreError::ActionNotFound { .. }
            | CoreError::ActionDisabled { .. }
            | CoreError::InvalidSourceState { .. }
            | CoreError::TargetStateUnavailable { .. } => ErrorKind::InvalidTransition,
            CoreError::Json(_) => ErrorKind::Internal,
        }
    }
}
