//! File-backed token storage.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::ports::{TokenSlot, TokenStore};
use crate::infrastructure::config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER};

const TOKENS_FILE_NAME: &str = "tokens.toml";

/// Token store persisting slots into a TOML file in the user data directory.
///
/// Writes go through a temporary file in the same directory and are renamed
/// into place, so a crash never leaves a half-written file.
pub struct FileTokenStore {
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    /// Creates a store in the platform data directory.
    ///
    /// If the directory cannot be determined, the store keeps nothing.
    #[must_use]
    pub fn new() -> Self {
        let path = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join(TOKENS_FILE_NAME));

        if path.is_none() {
            warn!("Failed to determine data directory. Token persistence disabled.");
        }

        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store at an explicit path.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            write_lock: Mutex::new(()),
        }
    }

    fn read_slots(path: &Path) -> BTreeMap<String, String> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to read token file");
                return BTreeMap::new();
            }
        };

        toml::from_str(&content).unwrap_or_else(|e| {
            warn!(error = %e, "Token file is malformed, ignoring it");
            BTreeMap::new()
        })
    }

    fn write_slots(path: &Path, slots: &BTreeMap<String, String>) -> std::io::Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| std::io::Error::other("Invalid path"))?;
        std::fs::create_dir_all(parent)?;

        let content = toml::to_string(slots).map_err(std::io::Error::other)?;

        // NamedTempFile is created with owner-only permissions.
        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.persist(path).map_err(|e| e.error)?;

        Ok(())
    }

    fn update(&self, slot: TokenSlot, value: Option<&str>) {
        let Some(path) = &self.path else {
            return;
        };

        let _guard = self.write_lock.lock();
        let mut slots = Self::read_slots(path);

        let changed = match value {
            Some(value) => {
                let previous = slots.insert(slot.as_str().to_string(), value.to_string());
                previous.as_deref() != Some(value)
            }
            None => slots.remove(slot.as_str()).is_some(),
        };

        if !changed {
            return;
        }

        if let Err(e) = Self::write_slots(path, &slots) {
            warn!(error = %e, slot = %slot, "Failed to write token file");
        } else {
            debug!(slot = %slot, "Token file updated");
        }
    }
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, slot: TokenSlot) -> Option<String> {
        let path = self.path.as_ref()?;
        Self::read_slots(path).remove(slot.as_str())
    }

    async fn set(&self, slot: TokenSlot, value: &str) {
        self.update(slot, Some(value));
    }

    async fn clear(&self, slot: TokenSlot) {
        self.update(slot, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_set_get_clear() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::with_path(dir.path().join(TOKENS_FILE_NAME));

        store.set(TokenSlot::AccessToken, "A1").await;
        store.set(TokenSlot::RefreshToken, "R1").await;

        assert_eq!(store.get(TokenSlot::AccessToken).await.as_deref(), Some("A1"));
        assert_eq!(store.get(TokenSlot::RefreshToken).await.as_deref(), Some("R1"));

        store.clear(TokenSlot::AccessToken).await;
        assert!(store.get(TokenSlot::AccessToken).await.is_none());
        assert_eq!(store.get(TokenSlot::RefreshToken).await.as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_survives_new_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(TOKENS_FILE_NAME);

        FileTokenStore::with_path(&path)
            .set(TokenSlot::RefreshToken, "R1")
            .await;

        let reopened = FileTokenStore::with_path(&path);
        assert_eq!(reopened.get(TokenSlot::RefreshToken).await.as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_malformed_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(TOKENS_FILE_NAME);
        std::fs::write(&path, "access_token = [").unwrap();

        let store = FileTokenStore::with_path(&path);
        assert!(store.get(TokenSlot::AccessToken).await.is_none());

        store.set(TokenSlot::AccessToken, "A2").await;
        assert_eq!(store.get(TokenSlot::AccessToken).await.as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_clear_missing_file_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(TOKENS_FILE_NAME);
        let store = FileTokenStore::with_path(&path);

        store.clear(TokenSlot::RefreshToken).await;
        assert!(!path.exists());
    }
}
