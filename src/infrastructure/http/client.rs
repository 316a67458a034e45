//! `reqwest`-backed HTTP transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::{debug, warn};

use crate::domain::errors::TransportError;
use crate::domain::ports::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

const USER_AGENT: &str = concat!("stockdesk/", env!("CARGO_PKG_VERSION"));

/// Transport sending requests through a shared `reqwest` client.
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport whose calls give up after `timeout`.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::other(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    const fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    fn map_error(&self, error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::timeout(self.timeout)
        } else if error.is_connect() {
            TransportError::connect(error.to_string())
        } else if error.is_builder() {
            TransportError::invalid_request(error.to_string())
        } else {
            TransportError::other(error.to_string())
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = %request.method, path = request.path(), "Sending request");

        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, path = request.path(), "Request failed");
            self.map_error(&e)
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            warn!(error = %e, "Failed to read response body");
            self.map_error(&e)
        })?;

        debug!(status = status.as_u16(), path = request.path(), "Response received");

        Ok(HttpResponse::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            body,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        let transport = ReqwestTransport::new(Duration::from_secs(30));
        assert!(transport.is_ok());
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(ReqwestTransport::method(HttpMethod::Delete), Method::DELETE);
        assert_eq!(ReqwestTransport::method(HttpMethod::Post), Method::POST);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let transport = ReqwestTransport::new(Duration::from_secs(2)).unwrap();
        let request = HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:9/stock");

        let err = transport.send(request).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
