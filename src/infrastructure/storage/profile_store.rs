//! Last signed-in user profile, kept next to the token file.

use std::io::Write;
use std::path::PathBuf;

use directories::ProjectDirs;
use tracing::{debug, warn};

use crate::domain::entities::User;
use crate::infrastructure::config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER};

const PROFILE_FILE_NAME: &str = "user_data.json";

/// Stores the profile returned by login so later runs can name the user and
/// open the realtime channel without another login.
///
/// Like the token stores, failures are logged and never surface.
pub struct ProfileStore {
    path: Option<PathBuf>,
}

impl ProfileStore {
    #[must_use]
    pub fn new() -> Self {
        let path = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join(PROFILE_FILE_NAME));

        if path.is_none() {
            warn!("Failed to determine data directory. Profile will not be kept.");
        }

        Self { path }
    }

    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    #[must_use]
    pub fn load(&self) -> Option<User> {
        let path = self.path.as_ref()?;
        let content = std::fs::read(path).ok()?;

        serde_json::from_slice(&content)
            .inspect_err(|e| warn!(error = %e, "Profile file is malformed, ignoring it"))
            .ok()
    }

    pub fn save(&self, user: &User) {
        let Some(path) = &self.path else {
            return;
        };

        let result = (|| -> std::io::Result<()> {
            let parent = path
                .parent()
                .ok_or_else(|| std::io::Error::other("Invalid path"))?;
            std::fs::create_dir_all(parent)?;

            let content = serde_json::to_vec_pretty(user).map_err(std::io::Error::other)?;
            let mut staged = tempfile::NamedTempFile::new_in(parent)?;
            staged.write_all(&content)?;
            staged.persist(path).map_err(|e| e.error)?;
            Ok(())
        })();

        match result {
            Ok(()) => debug!(user_id = user.id, "Profile saved"),
            Err(e) => warn!(error = %e, "Failed to write profile file"),
        }
    }

    pub fn clear(&self) {
        let Some(path) = &self.path else {
            return;
        };

        match std::fs::remove_file(path) {
            Ok(()) => debug!("Profile removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "Failed to remove profile file"),
        }
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}
