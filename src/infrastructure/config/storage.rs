//! On-disk client configuration.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::app_config::AppConfig;
use super::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Failure to locate, read or seed the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration directory for this platform")]
    ConfigDirNotFound,
    #[error("config file i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot encode default config: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Reads `config.toml`, seeding it with defaults on first run.
pub struct ConfigStore {
    config_dir: PathBuf,
}

impl ConfigStore {
    /// Uses the platform config directory, e.g. `~/.config/stockdesk`.
    ///
    /// # Errors
    /// Returns `ConfigError::ConfigDirNotFound` when no home directory exists.
    pub fn new() -> Result<Self, ConfigError> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| Self::with_dir(dirs.config_dir().to_path_buf()))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    #[must_use]
    pub const fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Loads the client configuration from `path_override` or the default
    /// location.
    ///
    /// A missing file is created with defaults. A malformed file is left
    /// untouched and defaults are used.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or the default cannot be written.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let path = path_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config_dir.join(CONFIG_FILE_NAME));

        if !path.exists() {
            info!(path = %path.display(), "Writing default config");
            let config = AppConfig::default();
            write_atomic(&path, &config)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(&path)?;
        let config = toml::from_str::<AppConfig>(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Config is malformed, using defaults");
            AppConfig::default()
        });
        debug!(path = %path.display(), "Config loaded");

        Ok(config)
    }
}

/// Replaces `path` through a temp file in the same directory.
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let encoded = toml::to_string_pretty(value)?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(encoded.as_bytes())?;
    staged.persist(path).map_err(|e| e.error)?;

    Ok(())
}
