//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the write server.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed tool arguments (map to INVALID_ARGUMENT).
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown tool or resource (map to NOT_FOUND).
    #[error("not found: {0}")]
    NotFound(String),

    /// Two tool modules declared the same tool name.
    #[error("tool `{0}` is already registered")]
    DuplicateTool(String),

    /// Missing or invalid process configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Master write switch is off.
    #[error(
        "Write operation '{operation}' is disabled. \
         Set BRAZE_WRITE_ENABLED=true to enable write operations."
    )]
    WriteDisabled { operation: String },

    /// Target workspace does not match any allowed pattern.
    #[error(
        "Write operation '{operation}' blocked for workspace: {workspace}. \
         Only workspaces matching these patterns are allowed: {allowed:?}. \
         This is a safety measure to prevent accidental writes to production. \
         Set BRAZE_ALLOW_PRODUCTION=true to override (NOT RECOMMENDED)."
    )]
    WorkspaceBlocked {
        operation: String,
        workspace: String,
        allowed: Vec<String>,
    },

    /// Sliding-window limit reached for an operation.
    #[error(
        "Rate limit exceeded for {operation}. {current}/{limit} requests in window. \
         Try again in {retry_after_secs} seconds."
    )]
    RateLimited {
        operation: String,
        current: usize,
        limit: u32,
        retry_after_secs: u64,
    },

    /// The REST API answered with a non-success status.
    #[error("api error {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport failures, including request timeouts.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal errors (map to INTERNAL).
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable error code used in protocol error payloads and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "INVALID_ARGUMENT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::DuplicateTool(_) => "ALREADY_EXISTS",
            Error::Configuration(_) => "FAILED_PRECONDITION",
            Error::WriteDisabled { .. } | Error::WorkspaceBlocked { .. } => "PERMISSION_DENIED",
            Error::RateLimited { .. } => "RESOURCE_EXHAUSTED",
            Error::Api { .. } | Error::Http(_) => "UNAVAILABLE",
            Error::Internal(_) | Error::Serialization(_) | Error::Io(_) => "INTERNAL",
        }
    }

    /// Whether the caller may retry the same call later without changing
    /// configuration. Write-disabled and workspace blocks are not retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimited { .. } | Error::Http(_) => true,
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn write_disabled(operation: impl Into<String>) -> Self {
        Self::WriteDisabled {
            operation: operation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_message_reports_counts() {
        let err = Error::RateLimited {
            operation: "send_campaign".to_string(),
            current: 3,
            limit: 3,
            retry_after_secs: 42,
        };
        let msg = err.to_string();
        assert!(msg.contains("3/3"));
        assert!(msg.contains("42 seconds"));
        assert_eq!(err.error_code(), "RESOURCE_EXHAUSTED");
        assert!(err.is_retryable());
    }

    #[test]
    fn gate_blocks_are_not_retryable() {
        assert!(!Error::write_disabled("delete_user").is_retryable());
        let blocked = Error::WorkspaceBlocked {
            operation: "delete_user".to_string(),
            workspace: "https://rest.prod-east.example.com".to_string(),
            allowed: vec!["demo-".to_string()],
        };
        assert!(!blocked.is_retryable());
        assert_eq!(blocked.error_code(), "PERMISSION_DENIED");
    }

    #[test]
    fn api_status_retry_classification() {
        let throttled = Error::Api {
            status: 429,
            body: String::new(),
        };
        let bad_request = Error::Api {
            status: 400,
            body: String::new(),
        };
        assert!(throttled.is_retryable());
        assert!(!bad_request.is_retryable());
    }
}
