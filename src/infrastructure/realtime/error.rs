use thiserror::Error;

pub type RealtimeResult<T> = Result<T, RealtimeError>;

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("connection closed with code {code}: {reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("websocket error: {message}")]
    WebSocket { message: String },

    #[error("invalid realtime url: {message}")]
    InvalidUrl { message: String },

    #[error("no access token available")]
    MissingToken,

    #[error("timeout waiting for {operation}")]
    Timeout { operation: String },
}

impl RealtimeError {
    #[must_use]
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    #[must_use]
    pub fn closed(code: u16, reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            code,
            reason: reason.into(),
        }
    }

    /// Whether the connection was ever established before this error.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::ConnectionClosed { .. } | Self::WebSocket { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RealtimeError::closed(1006, "abnormal");
        assert_eq!(err.to_string(), "connection closed with code 1006: abnormal");
        assert!(err.is_disconnect());

        assert!(!RealtimeError::MissingToken.is_disconnect());
        assert!(!RealtimeError::timeout("handshake").is_disconnect());
    }
}
