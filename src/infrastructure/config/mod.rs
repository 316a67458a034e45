//! Client configuration.

pub mod app_config;
pub mod args;
pub mod storage;

pub use app_config::{AppConfig, CacheConfig, LogLevel};
pub use args::{CliArgs, Command};
pub use storage::{ConfigError, ConfigStore};

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORGANIZATION: &str = "stockdesk";
pub const APP_NAME: &str = "stockdesk";
