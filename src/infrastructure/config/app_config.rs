//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER};
use crate::infrastructure::realtime::{BackoffMode, RealtimeChannelConfig, ReconnectPolicy};
use crate::infrastructure::storage::TokenStoreKind;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_REALTIME_BASE_URL: &str = "ws://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const MIN_REQUEST_TIMEOUT_MS: u64 = 1_000;
const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5_000;

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Client configuration, read from `config.toml` and overridden by CLI/env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// REST API base URI.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Realtime push base URI.
    #[serde(default = "default_realtime_base_url")]
    pub realtime_base_url: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Reconnects attempted after the realtime connection drops.
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    /// Delay between reconnects (base delay for exponential backoff).
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Reconnect delay strategy.
    #[serde(default)]
    pub reconnect_backoff: BackoffMode,

    /// Token persistence backend.
    #[serde(default)]
    pub token_store: TokenStoreKind,

    /// Query cache tuning.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Query cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds a cached read stays fresh.
    #[serde(default = "default_stale_time_secs")]
    pub stale_time_secs: u64,

    /// Maximum number of cached reads.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Automatic retries of a failed read.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl CacheConfig {
    #[must_use]
    pub const fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: default_stale_time_secs(),
            capacity: default_cache_capacity(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_realtime_base_url() -> String {
    DEFAULT_REALTIME_BASE_URL.to_string()
}

const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

const fn default_reconnect_attempts() -> u32 {
    DEFAULT_RECONNECT_ATTEMPTS
}

const fn default_reconnect_interval_ms() -> u64 {
    DEFAULT_RECONNECT_INTERVAL_MS
}

const fn default_stale_time_secs() -> u64 {
    300
}

const fn default_cache_capacity() -> usize {
    256
}

const fn default_max_retries() -> u32 {
    3
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments (and their env bindings) into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(api_url) = &args.api_url {
            self.api_base_url.clone_from(api_url);
        }
        if let Some(ws_url) = &args.ws_url {
            self.realtime_base_url.clone_from(ws_url);
        }
        if let Some(timeout) = args.request_timeout_ms {
            self.request_timeout_ms = timeout;
        }
        if let Some(attempts) = args.reconnect_attempts {
            self.reconnect_attempts = attempts;
        }
        if let Some(interval) = args.reconnect_interval_ms {
            self.reconnect_interval_ms = interval;
        }
        if let Some(token_store) = args.token_store {
            self.token_store = token_store;
        }
    }

    /// Returns the per-request timeout, never shorter than one second.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        let ms = if self.request_timeout_ms < MIN_REQUEST_TIMEOUT_MS {
            MIN_REQUEST_TIMEOUT_MS
        } else {
            self.request_timeout_ms
        };
        Duration::from_millis(ms)
    }

    /// Builds the realtime channel configuration.
    #[must_use]
    pub fn realtime_config(&self) -> RealtimeChannelConfig {
        let interval = Duration::from_millis(self.reconnect_interval_ms);
        RealtimeChannelConfig::new(self.realtime_base_url.clone())
            .with_max_attempts(self.reconnect_attempts)
            .with_policy(ReconnectPolicy::from_mode(self.reconnect_backoff, interval))
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("stockdesk.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            api_base_url: default_api_base_url(),
            realtime_base_url: default_realtime_base_url(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            reconnect_backoff: BackoffMode::default(),
            token_store: TokenStoreKind::default(),
            cache: CacheConfig::default(),
        }
    }
}
