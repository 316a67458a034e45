//! In-process token stores.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::ports::{TokenSlot, TokenStore};

/// Token store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    slots: RwLock<HashMap<TokenSlot, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with tokens.
    #[must_use]
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let store = Self::new();
        {
            let mut slots = store.slots.write();
            if let Some(access) = access {
                slots.insert(TokenSlot::AccessToken, access.to_string());
            }
            if let Some(refresh) = refresh {
                slots.insert(TokenSlot::RefreshToken, refresh.to_string());
            }
        }
        store
    }

    /// Returns whether every slot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, slot: TokenSlot) -> Option<String> {
        self.slots.read().get(&slot).cloned()
    }

    async fn set(&self, slot: TokenSlot, value: &str) {
        self.slots.write().insert(slot, value.to_string());
    }

    async fn clear(&self, slot: TokenSlot) {
        self.slots.write().remove(&slot);
    }
}

/// Store for contexts with no persistent medium at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTokenStore;

#[async_trait]
impl TokenStore for NullTokenStore {
    async fn get(&self, _slot: TokenSlot) -> Option<String> {
        None
    }

    async fn set(&self, _slot: TokenSlot, _value: &str) {}

    async fn clear(&self, _slot: TokenSlot) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        store.set(TokenSlot::AccessToken, "A1").await;

        assert_eq!(store.get(TokenSlot::AccessToken).await.as_deref(), Some("A1"));
        assert!(store.get(TokenSlot::RefreshToken).await.is_none());

        store.clear(TokenSlot::AccessToken).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_null_store_keeps_nothing() {
        let store = NullTokenStore;
        store.set(TokenSlot::RefreshToken, "R1").await;
        assert!(store.get(TokenSlot::RefreshToken).await.is_none());
        store.clear(TokenSlot::RefreshToken).await;
    }
}
