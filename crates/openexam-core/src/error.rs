//! Error types module
//!
//! All failures surfaced by the client crates are unified under [`ClientError`].
//! Each variant self-describes how it should be presented to the user through
//! [`ErrorMetadata`], so front ends can turn any failure into a transient
//! notification without matching on variants themselves.

use std::io;
use std::time::Duration;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like transport hiccups
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for user-facing error presentation.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "NETWORK_FAILURE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from the internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Server rejected request ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{operation} timed out after {}s", .after.as_secs())]
    TimedOut {
        operation: &'static str,
        after: Duration,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn server_rejected(status: u16, message: impl Into<String>) -> Self {
        ClientError::ServerRejected {
            status,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::ValidationFailure(message.into())
    }

    pub fn timed_out(operation: &'static str, after: Duration) -> Self {
        ClientError::TimedOut { operation, after }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::NetworkFailure(format!("Malformed response body: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn client_error_static_metadata(
    err: &ClientError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        ClientError::NetworkFailure(_) => (
            "NETWORK_FAILURE",
            true,
            Some("Check your connection and retry"),
            LogLevel::Warn,
        ),
        ClientError::ServerRejected { status, .. } if *status >= 500 => (
            "SERVER_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        ClientError::ServerRejected { .. } => (
            "SERVER_REJECTED",
            false,
            Some("Check request parameters and try again"),
            LogLevel::Warn,
        ),
        ClientError::ValidationFailure(_) => (
            "VALIDATION_FAILURE",
            false,
            Some("Correct the input and try again"),
            LogLevel::Debug,
        ),
        ClientError::NotFound(_) => (
            "NOT_FOUND",
            false,
            Some("Verify the file or user ID exists"),
            LogLevel::Debug,
        ),
        ClientError::TimedOut { .. } => (
            "TIMED_OUT",
            true,
            Some("Retry after a short delay"),
            LogLevel::Warn,
        ),
        ClientError::Io(_) => (
            "IO_ERROR",
            false,
            Some("Check the local file path and permissions"),
            LogLevel::Warn,
        ),
    }
}

impl ErrorMetadata for ClientError {
    fn error_code(&self) -> &'static str {
        client_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        client_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        client_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        client_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            ClientError::NetworkFailure(_) => "Could not reach the server".to_string(),
            ClientError::ServerRejected { status, .. } if *status >= 500 => {
                "The server failed to process the request".to_string()
            }
            ClientError::ServerRejected { ref message, .. } => message.clone(),
            ClientError::ValidationFailure(ref msg) => msg.clone(),
            ClientError::NotFound(ref msg) => msg.clone(),
            ClientError::TimedOut { operation, .. } => {
                format!("The server took too long to {}", operation)
            }
            ClientError::Io(_) => "Failed to read local file".to_string(),
        }
    }
}
