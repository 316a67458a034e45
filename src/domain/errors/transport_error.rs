//! Network transport error types.

use thiserror::Error;

/// Failure to obtain any HTTP response at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum TransportError {
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("failed to connect: {message}")]
    Connect { message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("network error: {message}")]
    Other { message: String },
}

impl TransportError {
    #[must_use]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Returns whether the same request may succeed when retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidRequest { .. })
    }
}
