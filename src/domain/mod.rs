//! Domain layer with core entities, errors and port definitions.

/// Realtime connection state.
pub mod connection;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use connection::ConnectionState;
pub use entities::{BearerToken, InvalidationEvent, Topic, User};
pub use errors::{ApiError, AuthError, NormalizedError, RefreshError, TransportError};
pub use ports::{AccessTokenProvider, HttpTransport, RealtimeEvent, TokenSlot, TokenStore};
