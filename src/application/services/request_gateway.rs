//! Authenticated request pipeline.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::auth_session::AuthSession;
use crate::application::dto::RequestDescriptor;
use crate::domain::entities::{BearerToken, InvalidationEvent};
use crate::domain::errors::{ApiError, AuthError, NormalizedError, RefreshError, TransportError};
use crate::domain::ports::{HttpRequest, HttpResponse, HttpTransport};

const MUTATION_EVENT_CAPACITY: usize = 64;

/// Sends API calls with the session's bearer token.
///
/// A `401` on a call that carried a token triggers one refresh through the
/// [`AuthSession`] and one replay. A refused refresh ends the session and
/// surfaces as [`AuthError::SessionExpired`]; one that never reached the
/// server surfaces as [`ApiError::Transport`] and keeps the session.
pub struct RequestGateway {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    session: Arc<AuthSession>,
    timeout: Duration,
    mutations: broadcast::Sender<InvalidationEvent>,
}

impl RequestGateway {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        session: Arc<AuthSession>,
        timeout: Duration,
    ) -> Self {
        let (mutations, _) = broadcast::channel(MUTATION_EVENT_CAPACITY);

        Self {
            base_url: base_url.into(),
            transport,
            session,
            timeout,
            mutations,
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// Topics changed by successful calls.
    #[must_use]
    pub fn subscribe_mutations(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.mutations.subscribe()
    }

    /// Performs a call and decodes the JSON answer.
    ///
    /// An empty 2xx body decodes as JSON `null`.
    ///
    /// # Errors
    /// Returns `ApiError::Authentication` when the session has expired,
    /// `ApiError::Normalized` for any other non-2xx status,
    /// `ApiError::Transport` when no response arrives in time, and
    /// `ApiError::Serialization` when the body does not match `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<T, ApiError> {
        let token = self.session.access_token().await;
        let response = self.send(descriptor, token.as_ref()).await?;

        let response = if response.is_unauthorized()
            && let Some(rejected) = token
        {
            debug!(path = %descriptor.path, "Access token rejected, refreshing");

            match self.session.refresh_after_rejection(&rejected).await {
                Ok(fresh) => self.send(descriptor, Some(&fresh)).await?,
                Err(RefreshError::Network(e)) => {
                    warn!(error = %e, path = %descriptor.path, "Token refresh failed in transit");
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(error = %e, path = %descriptor.path, "Session expired");
                    self.session.notify_login_required();
                    return Err(AuthError::from(e).into());
                }
            }
        } else {
            response
        };

        if !response.is_success() {
            let error =
                NormalizedError::from_response(response.status, &response.status_text, &response.body);
            debug!(status = error.status_code, path = %descriptor.path, "Request failed");
            return Err(error.into());
        }

        let value = decode(&response)?;
        self.publish_invalidations(descriptor);

        Ok(value)
    }

    async fn send(
        &self,
        descriptor: &RequestDescriptor,
        token: Option<&BearerToken>,
    ) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(descriptor, token);

        match timeout(self.timeout, self.transport.send(request)).await {
            Ok(result) => result.map_err(|e| {
                warn!(error = %e, path = %descriptor.path, "Request failed");
                ApiError::from(e)
            }),
            Err(_) => {
                warn!(timeout = ?self.timeout, path = %descriptor.path, "Request timed out");
                Err(TransportError::timeout(self.timeout).into())
            }
        }
    }

    fn build_request(
        &self,
        descriptor: &RequestDescriptor,
        token: Option<&BearerToken>,
    ) -> HttpRequest {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), descriptor.path);

        let mut request = HttpRequest::new(descriptor.method, url);
        request.query.clone_from(&descriptor.query);
        request.headers.clone_from(&descriptor.headers);
        request.body.clone_from(&descriptor.body);

        if let Some(token) = token {
            request
                .headers
                .push(("Authorization".to_string(), token.authorization_header()));
        }

        request
    }

    fn publish_invalidations(&self, descriptor: &RequestDescriptor) {
        for topic in &descriptor.invalidates {
            debug!(topic = %topic, "Publishing mutation invalidation");
            let _ = self
                .mutations
                .send(InvalidationEvent::new(topic.clone()));
        }
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    let result = if response.body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_slice(&response.body)
    };

    result.map_err(|e| {
        warn!(error = %e, status = response.status, "Failed to decode response");
        ApiError::serialization(e.to_string())
    })
}
