//! Request gateway error types.

use serde_json::Value;
use thiserror::Error;

use super::{AuthError, TransportError, ValidationError};

/// Non-2xx response converted into a displayable error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("HTTP {status_code}: {message}")]
pub struct NormalizedError {
    /// Response status.
    pub status_code: u16,
    /// Server detail when parseable, else the status text.
    pub message: String,
    /// Parsed response body, when it was JSON.
    pub details: Option<Value>,
}

impl NormalizedError {
    /// Builds an error from a raw response.
    ///
    /// The body is parsed best-effort; a string `detail` or `message` field
    /// becomes the message, otherwise the status text is used.
    #[must_use]
    pub fn from_response(status_code: u16, status_text: &str, body: &[u8]) -> Self {
        let details = if body.is_empty() {
            None
        } else {
            serde_json::from_slice::<Value>(body).ok()
        };

        let message = details
            .as_ref()
            .and_then(|value| {
                value
                    .get("detail")
                    .and_then(Value::as_str)
                    .or_else(|| value.get("message").and_then(Value::as_str))
            })
            .map(ToString::to_string)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| fallback_status_text(status_code, status_text));

        Self {
            status_code,
            message,
            details,
        }
    }

    /// Returns whether the status is a client error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status_code >= 400 && self.status_code < 500
    }

    /// Returns whether the status is a server error.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status_code >= 500
    }

    /// Renders a message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.status_code {
            400 => self
                .details
                .as_ref()
                .and_then(|d| d.get("detail"))
                .and_then(Value::as_str)
                .unwrap_or("Invalid request data")
                .to_string(),
            401 => "Authentication required".to_string(),
            403 => "You do not have permission to perform this action".to_string(),
            404 => "Resource not found".to_string(),
            422 => format!("Validation error: {}", self.validation_summary()),
            500..=599 => "Server error. Please try again later.".to_string(),
            _ if self.message.is_empty() => "An unexpected error occurred".to_string(),
            _ => self.message.clone(),
        }
    }

    fn validation_summary(&self) -> String {
        let Some(items) = self
            .details
            .as_ref()
            .and_then(|d| d.get("detail"))
            .and_then(Value::as_array)
        else {
            return "Invalid data provided".to_string();
        };

        items
            .iter()
            .map(|item| {
                let location = item
                    .get("loc")
                    .and_then(Value::as_array)
                    .map(|loc| {
                        loc.iter()
                            .map(|part| match part {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect::<Vec<_>>()
                            .join(".")
                    })
                    .unwrap_or_default();
                let message = item.get("msg").and_then(Value::as_str).unwrap_or("invalid");
                format!("{location}: {message}")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn fallback_status_text(status_code: u16, status_text: &str) -> String {
    if status_text.trim().is_empty() {
        format!("HTTP {status_code}")
    } else {
        status_text.to_string()
    }
}

/// Error returned by every gateway call.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum ApiError {
    #[error(transparent)]
    Authentication(#[from] AuthError),

    #[error(transparent)]
    Normalized(#[from] NormalizedError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl ApiError {
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns the HTTP status behind the error, if any.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Normalized(e) => Some(e.status_code),
            Self::Authentication(AuthError::InvalidCredentials { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Returns whether the user has to log in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Authentication(e) if e.requires_login())
    }

    /// Returns whether an automatic retry of a read may succeed.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::Normalized(e) => e.is_server_error(),
            Self::Authentication(_) | Self::Validation(_) | Self::Serialization { .. } => false,
        }
    }

    /// Renders a message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Normalized(e) => e.user_message(),
            Self::Authentication(e) if e.requires_login() => {
                "Your session has ended. Please log in again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::RefreshError;
    use test_case::test_case;

    #[test]
    fn test_message_from_detail_field() {
        let error = NormalizedError::from_response(
            400,
            "Bad Request",
            br#"{"detail": "User is not eligible for this equipment type"}"#,
        );

        assert_eq!(error.message, "User is not eligible for this equipment type");
        assert!(error.details.is_some());
        assert_eq!(error.user_message(), "User is not eligible for this equipment type");
    }

    #[test]
    fn test_unparseable_body_falls_back_to_status_text() {
        let error = NormalizedError::from_response(502, "Bad Gateway", b"<html>upstream</html>");

        assert_eq!(error.message, "Bad Gateway");
        assert!(error.details.is_none());
    }

    #[test]
    fn test_empty_status_text_fallback() {
        let error = NormalizedError::from_response(599, "", b"");
        assert_eq!(error.message, "HTTP 599");
    }

    #[test]
    fn test_validation_summary() {
        let body = br#"{"detail": [
            {"loc": ["body", "reason"], "msg": "field required"},
            {"loc": ["body", "item_id", 0], "msg": "must be positive"}
        ]}"#;
        let error = NormalizedError::from_response(422, "Unprocessable Entity", body);

        assert_eq!(
            error.user_message(),
            "Validation error: body.reason: field required, body.item_id.0: must be positive"
        );
        assert_eq!(error.message, "Unprocessable Entity");
    }

    #[test_case(401, "Authentication required" ; "unauthorized")]
    #[test_case(403, "You do not have permission to perform this action" ; "forbidden")]
    #[test_case(404, "Resource not found" ; "not found")]
    #[test_case(500, "Server error. Please try again later." ; "server error")]
    #[test_case(422, "Validation error: Invalid data provided" ; "unprocessable without detail")]
    #[test_case(409, "Conflict" ; "other status uses message")]
    fn test_user_message_by_status(status: u16, expected: &str) {
        let status_text = if status == 409 { "Conflict" } else { "" };
        let error = NormalizedError::from_response(status, status_text, b"");
        assert_eq!(error.user_message(), expected);
    }

    #[test]
    fn test_retry_classification() {
        let server = ApiError::from(NormalizedError::from_response(503, "Service Unavailable", b""));
        let client = ApiError::from(NormalizedError::from_response(404, "Not Found", b""));
        let network = ApiError::from(TransportError::connect("refused"));
        let expired = ApiError::from(AuthError::from(RefreshError::MissingRefreshToken));

        assert!(server.should_retry());
        assert!(!client.should_retry());
        assert!(network.should_retry());
        assert!(!expired.should_retry());
        assert!(expired.requires_login());
    }

    #[test]
    fn test_status_code_accessor() {
        let error = ApiError::from(NormalizedError::from_response(404, "Not Found", b""));
        assert_eq!(error.status_code(), Some(404));
        assert_eq!(ApiError::serialization("bad").status_code(), None);
    }
}
