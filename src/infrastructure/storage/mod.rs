//! Token storage adapters.

mod file_storage;
mod keyring_storage;
mod memory_storage;
mod profile_store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::ports::TokenStore;

pub use file_storage::FileTokenStore;
pub use keyring_storage::KeyringTokenStore;
pub use memory_storage::{MemoryTokenStore, NullTokenStore};
pub use profile_store::ProfileStore;

/// Selects the token persistence backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    /// System keyring.
    #[default]
    Keyring,
    /// TOML file in the user data directory.
    File,
    /// Process memory only.
    Memory,
    /// Nothing is kept.
    None,
}

impl TokenStoreKind {
    /// Builds the selected backend.
    #[must_use]
    pub fn build(self) -> Arc<dyn TokenStore> {
        match self {
            Self::Keyring => Arc::new(KeyringTokenStore::new()),
            Self::File => Arc::new(FileTokenStore::new()),
            Self::Memory => Arc::new(MemoryTokenStore::new()),
            Self::None => Arc::new(NullTokenStore),
        }
    }
}

impl std::fmt::Display for TokenStoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyring => write!(f, "keyring"),
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
            Self::None => write!(f, "none"),
        }
    }
}
