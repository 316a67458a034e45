//! Realtime push channel over WebSocket.

mod client;
mod connection;
mod constants;
mod error;

pub use client::{BackoffMode, RealtimeChannel, RealtimeChannelConfig, ReconnectPolicy};
pub use connection::{ConnectTarget, RealtimeConnector, RealtimeStream, WebSocketConnector};
pub use error::{RealtimeError, RealtimeResult};
