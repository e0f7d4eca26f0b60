//! Server error types.

use flowd_protocol::ErrorCode;
use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] flowd_protocol::ProtocolError),

    #[error("engine error: {0}")]
    Core(#[from] flowd_core::CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("session not authenticated")]
    NotAuthenticated,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unsupported protocol version: {0}")]
    UnsupportedProtocol(u16),

    #[error("server shutting down")]
    ShuttingDown,
}

impl ServerError {
    /// Converts to protocol error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ServerError::Io(_) => ErrorCode::InternalError,
            ServerError::Protocol(_) => ErrorCode::BadRequest,
            ServerError::Core(e) => match e.error_code() {
                "INVALID_DEFINITION" => ErrorCode::InvalidDefinition,
                "DEFINITION_EXISTS" => ErrorCode::DefinitionExists,
                "DEFINITION_NOT_FOUND" => ErrorCode::DefinitionNotFound,
                "INSTANCE_NOT_FOUND" => ErrorCode::InstanceNotFound,
                "NO_ENABLED_INITIAL_STATE" => ErrorCode::NoEnabledInitialState,
                "CURRENT_STATE_MISSING" => ErrorCode::CurrentStateMissing,
                "FINAL_STATE_LOCKED" => ErrorCode::FinalStateLocked,
                "ACTION_NOT_FOUND" => ErrorCode::ActionNotFound,
                "ACTION_DISABLED" => ErrorCode::ActionDisabled,
                "INVALID_SOURCE_STATE" => ErrorCode::InvalidSourceState,
                "TARGET_STATE_UNAVAILABLE" => ErrorCode::TargetStateUnavailable,
                _ => ErrorCode::InternalError,
            },
            ServerError::Json(_) => ErrorCode::BadRequest,
            ServerError::NotAuthenticated => ErrorCode::Unauthorized,
            ServerError::AuthFailed(_) => ErrorCode::AuthFailed,
            ServerError::InvalidRequest(_) => ErrorCode::BadRequest,
            ServerError::UnsupportedProtocol(_) => ErrorCode::UnsupportedProtocol,
            ServerError::ShuttingDown => ErrorCode::ShuttingDown,
        }
    }

    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.error_code(),
            ErrorCode::ShuttingDown | ErrorCode::InternalError
        )
    }
}
