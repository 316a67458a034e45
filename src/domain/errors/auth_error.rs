//! Authentication error types.

use thiserror::Error;

use super::TransportError;

/// Authentication error variants surfaced to callers.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum AuthError {
    #[error("login rejected ({status}): {message}")]
    InvalidCredentials { status: u16, message: String },

    #[error("session expired, please log in again")]
    SessionExpired {
        #[source]
        cause: RefreshError,
    },

    #[error("network error during authentication: {0}")]
    Network(#[from] TransportError),

    #[error("unexpected authentication response: {message}")]
    MalformedResponse { message: String },
}

impl AuthError {
    /// Creates login rejected error.
    #[must_use]
    pub fn invalid_credentials(status: u16, message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            status,
            message: message.into(),
        }
    }

    /// Creates malformed response error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Returns whether the user must authenticate again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired { .. } | Self::InvalidCredentials { .. }
        )
    }

    /// Returns whether error is network related.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<RefreshError> for AuthError {
    fn from(cause: RefreshError) -> Self {
        match cause {
            RefreshError::Network(e) => Self::Network(e),
            cause => Self::SessionExpired { cause },
        }
    }
}

/// Failure to exchange a refresh token.
///
/// Every variant except [`RefreshError::Network`] ends the session.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum RefreshError {
    #[error("no refresh token available")]
    MissingRefreshToken,

    #[error("refresh token rejected with status {status}")]
    Rejected { status: u16 },

    #[error("network error during token refresh: {0}")]
    Network(#[from] TransportError),

    #[error("unexpected refresh response: {message}")]
    MalformedResponse { message: String },
}

impl RefreshError {
    /// Returns whether the stored tokens are no longer usable. A transport
    /// failure says nothing about the refresh token, so it is kept.
    #[must_use]
    pub const fn ends_session(&self) -> bool {
        !matches!(self, Self::Network(_))
    }

    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_error_escalates_to_session_expired() {
        let error: AuthError = RefreshError::Rejected { status: 403 }.into();

        assert!(matches!(
            error,
            AuthError::SessionExpired {
                cause: RefreshError::Rejected { status: 403 }
            }
        ));
        assert!(error.requires_login());
    }

    #[test]
    fn test_network_error_does_not_require_login() {
        let error = AuthError::from(TransportError::connect("refused"));
        assert!(error.is_network_error());
        assert!(!error.requires_login());
    }

    #[test]
    fn test_refresh_network_failure_stays_a_network_error() {
        let cause = RefreshError::from(TransportError::connect("connection reset"));
        assert!(!cause.ends_session());

        let error = AuthError::from(cause);
        assert!(error.is_network_error());
        assert!(!error.requires_login());
        assert!(RefreshError::MissingRefreshToken.ends_session());
    }

    #[test]
    fn test_source_chain_exposes_refresh_cause() {
        use std::error::Error as _;

        let error = AuthError::from(RefreshError::MissingRefreshToken);
        let source = error.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("no refresh token available"));
    }
}
