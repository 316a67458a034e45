//! Domain error types.

mod api_error;
mod auth_error;
mod transport_error;
mod validation_error;

pub use api_error::{ApiError, NormalizedError};
pub use auth_error::{AuthError, RefreshError};
pub use transport_error::TransportError;
pub use validation_error::ValidationError;
