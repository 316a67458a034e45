//! Keyring-based token storage.

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::domain::ports::{TokenSlot, TokenStore};

const KEYRING_SERVICE: &str = "stockdesk";

/// System keyring token store; one credential entry per slot.
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    /// Creates new store with the default service name.
    #[must_use]
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    /// Creates store under a custom service name.
    #[must_use]
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, slot: TokenSlot) -> Option<Entry> {
        Entry::new(&self.service, slot.as_str())
            .map_err(|e| warn!(error = %e, slot = %slot, "Failed to access keyring"))
            .ok()
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for KeyringTokenStore {
    async fn get(&self, slot: TokenSlot) -> Option<String> {
        let entry = self.entry(slot)?;

        match entry.get_password() {
            Ok(value) => {
                debug!(slot = %slot, "Token found in keyring");
                Some(value)
            }
            Err(keyring::Error::NoEntry) => {
                debug!(slot = %slot, "No token stored in keyring");
                None
            }
            Err(e) => {
                warn!(error = %e, slot = %slot, "Failed to read token from keyring");
                None
            }
        }
    }

    async fn set(&self, slot: TokenSlot, value: &str) {
        let Some(entry) = self.entry(slot) else {
            return;
        };

        if let Err(e) = entry.set_password(value) {
            warn!(error = %e, slot = %slot, "Failed to store token in keyring");
        } else {
            debug!(slot = %slot, "Token stored in keyring");
        }
    }

    async fn clear(&self, slot: TokenSlot) {
        let Some(entry) = self.entry(slot) else {
            return;
        };

        match entry.delete_credential() {
            Ok(()) => debug!(slot = %slot, "Token deleted from keyring"),
            Err(keyring::Error::NoEntry) => debug!(slot = %slot, "No token to delete"),
            Err(e) => warn!(error = %e, slot = %slot, "Failed to delete token from keyring"),
        }
    }
}
