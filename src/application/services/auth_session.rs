//! Shared authentication session.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::application::dto::{LoginRequest, LoginResponse, RefreshResponse};
use crate::domain::entities::{BearerToken, User, UserId};
use crate::domain::errors::{AuthError, NormalizedError, RefreshError};
use crate::domain::ports::{
    AccessTokenProvider, HttpMethod, HttpRequest, HttpTransport, TokenSlot, TokenStore,
};

const LOGIN_PATH: &str = "/auth/login";
const REFRESH_PATH: &str = "/auth/refresh";
const SESSION_EVENT_CAPACITY: usize = 16;

/// Session lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user_id: UserId },
    TokenRefreshed,
    LoggedOut,
    /// The session ended involuntarily; the user has to log in again.
    LoginRequired,
}

#[derive(Default)]
struct SessionState {
    access: Option<BearerToken>,
    refresh: Option<BearerToken>,
    user: Option<User>,
}

/// Owner of the access and refresh tokens for one running client.
///
/// Construct once and share through `Arc`. Only this type mutates the tokens;
/// the [`TokenStore`] mirrors them so a later process can resume the session.
pub struct AuthSession {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn TokenStore>,
    state: RwLock<SessionState>,
    refresh_lock: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthSession {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        Self {
            base_url: base_url.into(),
            transport,
            store,
            state: RwLock::new(SessionState::default()),
            refresh_lock: Mutex::new(()),
            events,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Exchanges credentials for a token pair.
    ///
    /// Tokens are left untouched unless the server accepts the credentials.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidCredentials` on a non-2xx answer and
    /// `AuthError::Network` if the server cannot be reached.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        debug!(username, "Attempting login");

        let body = serde_json::to_value(LoginRequest::new(username, password))
            .map_err(|e| AuthError::malformed(e.to_string()))?;
        let mut request = HttpRequest::new(HttpMethod::Post, self.url(LOGIN_PATH));
        request.body = Some(body);

        let response = self.transport.send(request).await.map_err(|e| {
            warn!(error = %e, "Login request failed");
            AuthError::from(e)
        })?;

        if !response.is_success() {
            let error =
                NormalizedError::from_response(response.status, &response.status_text, &response.body);
            warn!(status = response.status, "Login rejected");
            return Err(AuthError::invalid_credentials(error.status_code, error.message));
        }

        let payload: LoginResponse = serde_json::from_slice(&response.body).map_err(|e| {
            warn!(error = %e, "Failed to parse login response");
            AuthError::malformed(e.to_string())
        })?;

        let access = BearerToken::new(payload.access_token)
            .ok_or_else(|| AuthError::malformed("empty access token"))?;
        let refresh = BearerToken::new(payload.refresh_token)
            .ok_or_else(|| AuthError::malformed("empty refresh token"))?;
        let user = payload.user;

        self.store.set(TokenSlot::AccessToken, access.as_str()).await;
        self.store.set(TokenSlot::RefreshToken, refresh.as_str()).await;

        {
            let mut state = self.state.write();
            state.access = Some(access);
            state.refresh = Some(refresh);
            state.user = Some(user.clone());
        }

        info!(user_id = user.id, username = %user.username, "Successfully authenticated");
        let _ = self.events.send(SessionEvent::LoggedIn { user_id: user.id });

        Ok(user)
    }

    /// Returns the access token, restoring it from the store when memory is empty.
    pub async fn access_token(&self) -> Option<BearerToken> {
        if let Some(token) = self.state.read().access.clone() {
            return Some(token);
        }

        let restored = self
            .store
            .get(TokenSlot::AccessToken)
            .await
            .and_then(BearerToken::new)?;

        debug!(token = %restored, "Access token restored from store");
        let mut state = self.state.write();
        Some(state.access.get_or_insert(restored).clone())
    }

    async fn refresh_token(&self) -> Option<BearerToken> {
        if let Some(token) = self.state.read().refresh.clone() {
            return Some(token);
        }

        let restored = self
            .store
            .get(TokenSlot::RefreshToken)
            .await
            .and_then(BearerToken::new)?;

        let mut state = self.state.write();
        Some(state.refresh.get_or_insert(restored).clone())
    }

    /// User from the last successful login in this process.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.access_token().await.is_some()
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// Concurrent callers share one exchange: whoever waited on another
    /// caller's refresh gets its token. A rejected, missing or unreadable
    /// refresh token ends the session. A transport failure keeps both tokens.
    ///
    /// # Errors
    /// Returns `RefreshError` if no refresh token is known, the server rejects
    /// it, or the exchange cannot complete.
    pub async fn refresh_access_token(&self) -> Result<BearerToken, RefreshError> {
        let seen = self.access_token().await;
        self.refresh_unless_replaced(seen.as_ref()).await
    }

    /// Refreshes on behalf of a request that was rejected with `rejected`.
    ///
    /// Callers queue behind a single exchange. If another caller already
    /// replaced the rejected token, its result is reused.
    pub(crate) async fn refresh_after_rejection(
        &self,
        rejected: &BearerToken,
    ) -> Result<BearerToken, RefreshError> {
        self.refresh_unless_replaced(Some(rejected)).await
    }

    async fn refresh_unless_replaced(
        &self,
        seen: Option<&BearerToken>,
    ) -> Result<BearerToken, RefreshError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.state.read().access.clone();
        if let Some(current) = current
            && seen != Some(&current)
        {
            debug!("Access token already refreshed by another caller");
            return Ok(current);
        }

        self.exchange_refresh_token().await
    }

    async fn exchange_refresh_token(&self) -> Result<BearerToken, RefreshError> {
        match self.try_exchange().await {
            Ok(token) => {
                info!(token = %token, "Access token refreshed");
                let _ = self.events.send(SessionEvent::TokenRefreshed);
                Ok(token)
            }
            Err(e) if e.ends_session() => {
                warn!(error = %e, "Token refresh failed, clearing session");
                self.clear().await;
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh could not reach the server, keeping session");
                Err(e)
            }
        }
    }

    async fn try_exchange(&self) -> Result<BearerToken, RefreshError> {
        let refresh = self
            .refresh_token()
            .await
            .ok_or(RefreshError::MissingRefreshToken)?;

        let mut request = HttpRequest::new(HttpMethod::Post, self.url(REFRESH_PATH));
        request
            .headers
            .push(("Authorization".to_string(), refresh.authorization_header()));

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status,
            });
        }

        let payload: RefreshResponse = serde_json::from_slice(&response.body)
            .map_err(|e| RefreshError::malformed(e.to_string()))?;
        let token = BearerToken::new(payload.access_token)
            .ok_or_else(|| RefreshError::malformed("empty access token"))?;

        self.store.set(TokenSlot::AccessToken, token.as_str()).await;
        self.state.write().access = Some(token.clone());

        Ok(token)
    }

    /// Ends the session and forgets both tokens.
    pub async fn logout(&self) {
        self.clear().await;
        info!("Logged out");
        let _ = self.events.send(SessionEvent::LoggedOut);
    }

    /// Tells listeners the user must log in again.
    pub(crate) fn notify_login_required(&self) {
        let _ = self.events.send(SessionEvent::LoginRequired);
    }

    async fn clear(&self) {
        {
            let mut state = self.state.write();
            state.access = None;
            state.refresh = None;
            state.user = None;
        }

        for slot in TokenSlot::ALL {
            self.store.clear(slot).await;
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AccessTokenProvider for AuthSession {
    async fn current_access_token(&self) -> Option<BearerToken> {
        self.access_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::TransportError;
    use crate::domain::ports::mocks::RoutedTransport;
    use crate::domain::ports::{HttpResponse, MockTokenStore};
    use crate::infrastructure::storage::MemoryTokenStore;
    use mockall::predicate::eq;
    use serde_json::json;

    const BASE: &str = "http://localhost:8000";

    fn login_ok() -> RoutedTransport {
        RoutedTransport::new().route(HttpMethod::Post, LOGIN_PATH, |request| {
            assert_eq!(request.body.as_ref().unwrap()["username"], "alice");
            Ok(HttpResponse::json(
                200,
                &json!({
                    "access_token": "A1",
                    "refresh_token": "R1",
                    "user": {"id": 3, "username": "alice", "email": "a@example.com", "roles": ["staff"]}
                }),
            ))
        })
    }

    #[tokio::test]
    async fn test_login_stores_tokens() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = AuthSession::new(BASE, Arc::new(login_ok()), store.clone());
        let mut events = session.subscribe();

        let user = session.login("alice", "secret").await.unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(store.get(TokenSlot::AccessToken).await.as_deref(), Some("A1"));
        assert_eq!(store.get(TokenSlot::RefreshToken).await.as_deref(), Some("R1"));
        assert_eq!(session.current_user().map(|u| u.id), Some(3));
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedIn { user_id: 3 });
    }

    #[tokio::test]
    async fn test_login_rejected_keeps_tokens() {
        let transport = RoutedTransport::new().route(HttpMethod::Post, LOGIN_PATH, |_| {
            Ok(HttpResponse::json(401, &json!({"detail": "Incorrect username or password"})))
        });
        let store = Arc::new(MemoryTokenStore::with_tokens(Some("A0"), Some("R0")));
        let session = AuthSession::new(BASE, Arc::new(transport), store.clone());

        let err = session.login("alice", "wrong").await.unwrap_err();

        match err {
            AuthError::InvalidCredentials { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect username or password");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.get(TokenSlot::AccessToken).await.as_deref(), Some("A0"));
    }

    #[tokio::test]
    async fn test_login_network_failure() {
        let transport = RoutedTransport::new().route(HttpMethod::Post, LOGIN_PATH, |_| {
            Err(TransportError::connect("connection refused"))
        });
        let store = Arc::new(MemoryTokenStore::new());
        let session = AuthSession::new(BASE, Arc::new(transport), store.clone());

        let err = session.login("alice", "secret").await.unwrap_err();

        assert!(err.is_network_error());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_access_token_restored_lazily() {
        let store = Arc::new(MemoryTokenStore::with_tokens(Some("A1"), Some("R1")));
        let session = AuthSession::new(BASE, Arc::new(RoutedTransport::new()), store);

        let token = session.access_token().await.unwrap();
        assert_eq!(token.as_str(), "A1");
        assert!(session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_refresh_replaces_access_token_only() {
        let transport = RoutedTransport::new().route(HttpMethod::Post, REFRESH_PATH, |request| {
            assert_eq!(request.bearer(), Some("R1"));
            Ok(HttpResponse::json(200, &json!({"access_token": "A2"})))
        });
        let store = Arc::new(MemoryTokenStore::with_tokens(Some("A1"), Some("R1")));
        let session = AuthSession::new(BASE, Arc::new(transport), store.clone());
        let mut events = session.subscribe();

        let token = session.refresh_access_token().await.unwrap();

        assert_eq!(token.as_str(), "A2");
        assert_eq!(store.get(TokenSlot::AccessToken).await.as_deref(), Some("A2"));
        assert_eq!(store.get(TokenSlot::RefreshToken).await.as_deref(), Some("R1"));
        assert_eq!(events.recv().await.unwrap(), SessionEvent::TokenRefreshed);
    }

    #[tokio::test]
    async fn test_refresh_rejected_clears_session() {
        let transport = RoutedTransport::new().route(HttpMethod::Post, REFRESH_PATH, |_| {
            Ok(HttpResponse::json(403, &json!({"detail": "Token revoked"})))
        });
        let store = Arc::new(MemoryTokenStore::with_tokens(Some("A1"), Some("R1")));
        let session = AuthSession::new(BASE, Arc::new(transport), store.clone());

        let err = session.refresh_access_token().await.unwrap_err();

        assert!(matches!(err, RefreshError::Rejected { status: 403 }));
        assert!(store.is_empty());
        assert!(session.access_token().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_network_failure_keeps_tokens() {
        let transport = RoutedTransport::new().route(HttpMethod::Post, REFRESH_PATH, |_| {
            Err(TransportError::connect("connection reset"))
        });
        let store = Arc::new(MemoryTokenStore::with_tokens(Some("A1"), Some("R1")));
        let session = AuthSession::new(BASE, Arc::new(transport), store.clone());

        let err = session.refresh_access_token().await.unwrap_err();

        assert!(matches!(err, RefreshError::Network(_)));
        assert_eq!(store.get(TokenSlot::AccessToken).await.as_deref(), Some("A1"));
        assert_eq!(store.get(TokenSlot::RefreshToken).await.as_deref(), Some("R1"));
        assert_eq!(session.access_token().await.unwrap().as_str(), "A1");
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_exchange() {
        let transport = Arc::new(RoutedTransport::new().route(
            HttpMethod::Post,
            REFRESH_PATH,
            |_| Ok(HttpResponse::json(200, &json!({"access_token": "A2"}))),
        ));
        let store = Arc::new(MemoryTokenStore::with_tokens(Some("A1"), Some("R1")));
        let session = AuthSession::new(BASE, transport.clone(), store);

        let (first, second) = tokio::join!(
            session.refresh_access_token(),
            session.refresh_access_token()
        );

        assert_eq!(first.unwrap().as_str(), "A2");
        assert_eq!(second.unwrap().as_str(), "A2");
        assert_eq!(transport.call_count(REFRESH_PATH), 1);
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_clears_store() {
        let mut store = MockTokenStore::new();
        store.expect_get().returning(|_| None);
        store
            .expect_clear()
            .with(eq(TokenSlot::AccessToken))
            .times(1)
            .return_const(());
        store
            .expect_clear()
            .with(eq(TokenSlot::RefreshToken))
            .times(1)
            .return_const(());

        let transport = Arc::new(RoutedTransport::new());
        let session = AuthSession::new(BASE, transport.clone(), Arc::new(store));

        let err = session.refresh_access_token().await.unwrap_err();

        assert!(matches!(err, RefreshError::MissingRefreshToken));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_after_rejection_reuses_newer_token() {
        let transport = Arc::new(RoutedTransport::new());
        let store = Arc::new(MemoryTokenStore::with_tokens(Some("A2"), Some("R1")));
        let session = AuthSession::new(BASE, transport.clone(), store);
        assert_eq!(session.access_token().await.unwrap().as_str(), "A2");

        let rejected = BearerToken::new("A1").unwrap();
        let token = session.refresh_after_rejection(&rejected).await.unwrap();

        assert_eq!(token.as_str(), "A2");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = AuthSession::new(BASE, Arc::new(login_ok()), store.clone());
        session.login("alice", "secret").await.unwrap();
        let mut events = session.subscribe();

        session.logout().await;

        assert!(store.is_empty());
        assert!(session.current_user().is_none());
        assert!(!session.is_authenticated().await);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
    }
}
