//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// HTTP transport.
pub mod http;
/// Realtime push channel.
pub mod realtime;
/// Token storage adapters.
pub mod storage;

pub use config::{AppConfig, CliArgs, Command, ConfigStore, LogLevel};
pub use http::ReqwestTransport;
pub use realtime::{RealtimeChannel, RealtimeChannelConfig, WebSocketConnector};
pub use storage::{KeyringTokenStore, ProfileStore, TokenStoreKind};
