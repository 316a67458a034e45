//! Request validation errors.

use thiserror::Error;

/// Field-level validation failure raised before a request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be a positive number")]
    NotPositive { field: &'static str },

    #[error("{field} must be at most {max} characters, got {actual}")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{field}: {message}")]
    InvalidChoice {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    #[must_use]
    pub const fn not_positive(field: &'static str) -> Self {
        Self::NotPositive { field }
    }

    #[must_use]
    pub fn invalid_choice(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidChoice {
            field,
            message: message.into(),
        }
    }

    /// Returns the offending field name.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Required { field }
            | Self::NotPositive { field }
            | Self::TooLong { field, .. }
            | Self::InvalidChoice { field, .. } => field,
        }
    }
}
