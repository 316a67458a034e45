//! Token persistence port definition.

use std::fmt;

use async_trait::async_trait;

/// Named slot a credential is persisted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSlot {
    /// Short-lived API credential.
    AccessToken,
    /// Long-lived credential used to obtain new access tokens.
    RefreshToken,
}

impl TokenSlot {
    /// All slots, in persistence order.
    pub const ALL: [Self; 2] = [Self::AccessToken, Self::RefreshToken];

    /// Returns the storage key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for TokenSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port for durable token persistence.
///
/// Implementations never fail: when no medium is available or a backend
/// errors, reads yield `None` and writes become no-ops (after logging).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Reads the value stored in a slot.
    async fn get(&self, slot: TokenSlot) -> Option<String>;

    /// Writes a slot.
    async fn set(&self, slot: TokenSlot, value: &str);

    /// Removes a slot.
    async fn clear(&self, slot: TokenSlot);
}
