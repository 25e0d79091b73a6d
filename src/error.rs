//! # Reporting Error Types
//!
//! Structured error handling for launch reporting using thiserror.
//!
//! Only two remote classifications matter to the reporting core:
//! [`ErrorType::FinishItemNotAllowed`] is retried by the item-finish retry policy and
//! [`ErrorType::IncorrectFinishStatus`] may be compensated with a stop call when the
//! launch finishes. Everything else is logged and absorbed at item/log level.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Classification of an error reported by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// The remote side has not yet observed all children of the item being finished
    FinishItemNotAllowed,
    /// The launch cannot be finished with the requested status
    IncorrectFinishStatus,
    /// Any other remote error code
    Other(String),
}

impl ErrorType {
    /// Map a remote error code onto its classification
    pub fn from_code(code: &str) -> Self {
        match code {
            "FINISH_ITEM_NOT_ALLOWED" => ErrorType::FinishItemNotAllowed,
            "INCORRECT_FINISH_STATUS" => ErrorType::IncorrectFinishStatus,
            other => ErrorType::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ErrorType::FinishItemNotAllowed => "FINISH_ITEM_NOT_ALLOWED",
            ErrorType::IncorrectFinishStatus => "INCORRECT_FINISH_STATUS",
            ErrorType::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors raised while reporting a launch
#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("Remote service rejected the call: {error_type}: {message}")]
    Remote {
        error_type: ErrorType,
        message: String,
    },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Timeout: operation {operation} timed out after {timeout_seconds}s")]
    Timeout {
        operation: String,
        timeout_seconds: u64,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Identifier for {entity} never resolved: {reason}")]
    Unresolved { entity: String, reason: String },

    #[error("Image conversion failed: {message}")]
    ImageConversion { message: String },

    #[error("Launch has already been finished")]
    LaunchAlreadyFinished,

    #[error("Internal reporting error: {message}")]
    Internal { message: String },
}

impl ReportingError {
    /// Create a remote rejection from its raw error code
    pub fn remote(code: &str, message: impl Into<String>) -> Self {
        Self::Remote {
            error_type: ErrorType::from_code(code),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_seconds,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn unresolved(entity: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Unresolved {
            entity: entity.into(),
            reason: reason.to_string(),
        }
    }

    pub fn image_conversion(message: impl Into<String>) -> Self {
        Self::ImageConversion {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Remote classification, if this error came from the remote service
    pub fn error_type(&self) -> Option<&ErrorType> {
        match self {
            ReportingError::Remote { error_type, .. } => Some(error_type),
            _ => None,
        }
    }

    /// Whether the item-finish retry policy should try again
    pub fn is_retryable(&self) -> bool {
        matches!(self.error_type(), Some(ErrorType::FinishItemNotAllowed))
    }

    /// Whether a launch finish may be compensated with a stop call
    pub fn is_incorrect_finish_status(&self) -> bool {
        matches!(self.error_type(), Some(ErrorType::IncorrectFinishStatus))
    }
}

/// Conversion from a task join failure (panic or runtime shutdown)
impl From<tokio::task::JoinError> for ReportingError {
    fn from(err: tokio::task::JoinError) -> Self {
        ReportingError::internal(format!("reporting task did not complete: {err}"))
    }
}

impl From<config::ConfigError> for ReportingError {
    fn from(err: config::ConfigError) -> Self {
        ReportingError::configuration(err.to_string())
    }
}

/// Result type alias for reporting operations
pub type ReportingResult<T> = Result<T, ReportingError>;

/// Result of a shared, eventually-resolved value. The error is shared because many
/// parties may await the same handle.
pub type SharedResult<T> = Result<T, Arc<ReportingError>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_from_code() {
        assert_eq!(
            ErrorType::from_code("FINISH_ITEM_NOT_ALLOWED"),
            ErrorType::FinishItemNotAllowed
        );
        assert_eq!(
            ErrorType::from_code("INCORRECT_FINISH_STATUS"),
            ErrorType::IncorrectFinishStatus
        );
        assert_eq!(
            ErrorType::from_code("ACCESS_DENIED"),
            ErrorType::Other("ACCESS_DENIED".to_string())
        );
    }

    #[test]
    fn test_only_finish_not_allowed_is_retryable() {
        assert!(ReportingError::remote("FINISH_ITEM_NOT_ALLOWED", "children pending").is_retryable());
        assert!(!ReportingError::remote("INCORRECT_FINISH_STATUS", "bad").is_retryable());
        assert!(!ReportingError::transport("connection reset").is_retryable());
        assert!(!ReportingError::timeout("finish launch", 5).is_retryable());
    }

    #[test]
    fn test_incorrect_finish_status_classification() {
        let err = ReportingError::remote("INCORRECT_FINISH_STATUS", "launch has running items");
        assert!(err.is_incorrect_finish_status());
        assert!(!ReportingError::internal("oops").is_incorrect_finish_status());
    }

    #[test]
    fn test_error_display() {
        let err = ReportingError::remote("FINISH_ITEM_NOT_ALLOWED", "item has descendants");
        let display_str = format!("{err}");
        assert!(display_str.contains("FINISH_ITEM_NOT_ALLOWED"));
        assert!(display_str.contains("item has descendants"));

        let timeout = ReportingError::timeout("finish launch", 300);
        assert!(format!("{timeout}").contains("300s"));
    }
}
