//! Stockdesk - session, request and realtime client for the stock API.
//!
//! The crate keeps one authenticated session per process, sends API calls
//! through a gateway that refreshes expired tokens transparently, caches reads
//! by topic, and follows a realtime push channel that marks cached reads stale.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing services and DTOs.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer containing the command-line front end.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "stockdesk";
