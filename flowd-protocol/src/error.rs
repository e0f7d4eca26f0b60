//! Protocol error types and error codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Protocol-level errors that can occur during framing or message handling.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid magic bytes: expected 'WCPX', got {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u16),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u32, max: u32 },

    #[error("CRC mismatch: expected {expected:#x}, got {actual:#x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("invalid frame flags: {0:#x}")]
    InvalidFlags(u16),

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable error codes returned in error responses.
///
/// These codes are part of the protocol contract and must remain stable
/// across versions. Clients branch on the code, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Protocol errors
    UnsupportedProtocol,
    BadRequest,

    // Authentication errors
    Unauthorized,
    AuthFailed,

    // Definition registry errors
    InvalidDefinition,
    DefinitionExists,
    DefinitionNotFound,

    // Instance lifecycle errors
    InstanceNotFound,
    NoEnabledInitialState,

    // Transition guard errors
    CurrentStateMissing,
    FinalStateLocked,
    ActionNotFound,
    ActionDisabled,
    InvalidSourceState,
    TargetStateUnavailable,

    // System errors
    ShuttingDown,
    InternalError,
}

impl ErrorCode {
    /// Returns whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::ShuttingDown | ErrorCode::InternalError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::UnsupportedProtocol => write!(f, "UNSUPPORTED_PROTOCOL"),
            ErrorCode::BadRequest => write!(f, "BAD_REQUEST"),
            ErrorCode::Unauthorized => write!(f, "UNAUTHORIZED"),
            ErrorCode::AuthFailed => write!(f, "AUTH_FAILED"),
            ErrorCode::InvalidDefinition => write!(f, "INVALID_DEFINITION"),
            ErrorCode::DefinitionExists => write!(f, "DEFINITION_EXISTS"),
            ErrorCode::DefinitionNotFound => write!(f, "DEFINITION_NOT_FOUND"),
            ErrorCode::InstanceNotFound => write!(f, "INSTANCE_NOT_FOUND"),
            ErrorCode::NoEnabledInitialState => write!(f, "NO_ENABLED_INITIAL_STATE"),
            ErrorCode::CurrentStateMissing => write!(f, "CURRENT_STATE_MISSING"),
            ErrorCode::FinalStateLocked => write!(f, "FINAL_STATE_LOCKED"),
            ErrorCode::ActionNotFound => write!(f, "ACTION_NOT_FOUND"),
            ErrorCode::ActionDisabled => write!(f, "ACTION_DISABLED"),
            ErrorCode::InvalidSourceState => write!(f, "INVALID_SOURCE_STATE"),
            ErrorCode::TargetStateUnavailable => write!(f, "TARGET_STATE_UNAVAILABLE"),
            ErrorCode::ShuttingDown => write!(f, "SHUTTING_DOWN"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_retryable() {
        assert!(ErrorCode::ShuttingDown.is_retryable());
        assert!(ErrorCode::InternalError.is_retryable());

        assert!(!ErrorCode::BadRequest.is_retryable());
        assert!(!ErrorCode::InvalidDefinition.is_retryable());
        assert!(!ErrorCode::DefinitionExists.is_retryable());
        assert!(!ErrorCode::DefinitionNotFound.is_retryable());
        assert!(!ErrorCode::InstanceNotFound.is_retryable());
        assert!(!ErrorCode::FinalStateLocked.is_retryable());
        assert!(!ErrorCode::InvalidSourceState.is_retryable());
        assert!(!ErrorCode::Unauthorized.is_retryable());
        assert!(!ErrorCode::AuthFailed.is_retryable());
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(
            format!("{}", ErrorCode::UnsupportedProtocol),
            "UNSUPPORTED_PROTOCOL"
        );
        assert_eq!(format!("{}", ErrorCode::BadRequest), "BAD_REQUEST");
        assert_eq!(format!("{}", ErrorCode::Unauthorized), "UNAUTHORIZED");
        assert_eq!(format!("{}", ErrorCode::AuthFailed), "AUTH_FAILED");
        assert_eq!(
            format!("{}", ErrorCode::InvalidDefinition),
            "INVALID_DEFINITION"
        );
        assert_eq!(
            format!("{}", ErrorCode::DefinitionExists),
            "DEFINITION_EXISTS"
        );
        assert_eq!(
            format!("{}", ErrorCode::DefinitionNotFound),
            "DEFINITION_NOT_FOUND"
        );
        assert_eq!(
            format!("{}", ErrorCode::InstanceNotFound),
            "INSTANCE_NOT_FOUND"
        );
        assert_eq!(
            format!("{}", ErrorCode::NoEnabledInitialState),
            "NO_ENABLED_INITIAL_STATE"
        );
        assert_eq!(
            format!("{}", ErrorCode::CurrentStateMissing),
            "CURRENT_STATE_MISSING"
        );
        assert_eq!(
            format!("{}", ErrorCode::FinalStateLocked),
            "FINAL_STATE_LOCKED"
        );
        assert_eq!(format!("{}", ErrorCode::ActionNotFound), "ACTION_NOT_FOUND");
        assert_eq!(format!("{}", ErrorCode::ActionDisabled), "ACTION_DISABLED");
        assert_eq!(
            format!("{}", ErrorCode::InvalidSourceState),
            "INVALID_SOURCE_STATE"
        );
        assert_eq!(
            format!("{}", ErrorCode::TargetStateUnavailable),
            "TARGET_STATE_UNAVAILABLE"
        );
        assert_eq!(format!("{}", ErrorCode::ShuttingDown), "SHUTTING_DOWN");
        assert_eq!(format!("{}", ErrorCode::InternalError), "INTERNAL_ERROR");
    }

    #[test]
    fn test_error_code_serialization() {
        let code = ErrorCode::DefinitionNotFound;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"DEFINITION_NOT_FOUND\"");

        let parsed: ErrorCode = serde_json::from_str("\"FINAL_STATE_LOCKED\"").unwrap();
        assert_eq!(parsed, ErrorCode::FinalStateLocked);
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidMagic(*b"XXXX");
        assert!(err.to_string().contains("magic"));

        let err = ProtocolError::UnsupportedVersion(99);
        assert!(err.to_string().contains("99"));

        let err = ProtocolError::FrameTooLarge { size: 100, max: 50 };
        assert!(err.to_string().contains("100"));

        // CRC uses hex format
        let err = ProtocolError::CrcMismatch {
            expected: 0xABC,
            actual: 0xDEF,
        };
        let msg = err.to_string();
        assert!(msg.contains("abc") || msg.contains("ABC"));

        let err = ProtocolError::InvalidFlags(0xFF);
        let msg = err.to_string();
        assert!(msg.contains("ff") || msg.contains("FF"));
    }
}
