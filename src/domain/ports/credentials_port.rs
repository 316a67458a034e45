use async_trait::async_trait;

use crate::domain::entities::BearerToken;

/// Port supplying the current access credential to connection owners.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Returns the current access token, if the session has one.
    async fn current_access_token(&self) -> Option<BearerToken>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use parking_lot::RwLock;

    /// Provider returning a fixed, replaceable token.
    pub struct StaticTokenProvider {
        token: RwLock<Option<BearerToken>>,
    }

    impl StaticTokenProvider {
        pub fn new(token: Option<&str>) -> Self {
            Self {
                token: RwLock::new(token.and_then(BearerToken::new)),
            }
        }

        pub fn set(&self, token: Option<&str>) {
            *self.token.write() = token.and_then(BearerToken::new);
        }
    }

    #[async_trait]
    impl AccessTokenProvider for StaticTokenProvider {
        async fn current_access_token(&self) -> Option<BearerToken> {
            self.token.read().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::StaticTokenProvider;
    use super::*;

    #[test]
    fn test_provider_reflects_replaced_token() {
        let provider = StaticTokenProvider::new(Some("A1"));
        let first = tokio_test::block_on(provider.current_access_token());
        assert_eq!(first.as_ref().map(BearerToken::as_str), Some("A1"));

        provider.set(None);
        assert!(tokio_test::block_on(provider.current_access_token()).is_none());
    }
}
