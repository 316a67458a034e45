//! HTTP transport port definition.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::domain::errors::TransportError;

/// HTTP method subset used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Looks up a header, ignoring name case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the bearer credential attached to the request.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
    }

    /// Returns the URL path without scheme and authority.
    #[must_use]
    pub fn path(&self) -> &str {
        let without_scheme = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, rest)| rest);

        without_scheme
            .find('/')
            .map_or("/", |index| &without_scheme[index..])
    }
}

/// Raw response received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Bytes,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// Builds a JSON response.
    #[must_use]
    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, "", value.to_string())
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Port for sending HTTP requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and returns whatever response the server produced.
    ///
    /// Non-2xx statuses are responses, not errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;

    type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

    /// Transport answering from per-route handlers and recording every call.
    pub struct RoutedTransport {
        routes: Vec<(HttpMethod, String, Handler)>,
        calls: Mutex<Vec<HttpRequest>>,
    }

    impl RoutedTransport {
        pub fn new() -> Self {
            Self {
                routes: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Registers a handler for a method and path.
        pub fn route<F>(mut self, method: HttpMethod, path: &str, handler: F) -> Self
        where
            F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
        {
            self.routes
                .push((method, path.to_string(), Box::new(handler)));
            self
        }

        /// Returns all recorded requests.
        pub fn calls(&self) -> Vec<HttpRequest> {
            self.calls.lock().clone()
        }

        /// Counts recorded requests for a path.
        pub fn call_count(&self, path: &str) -> usize {
            self.calls
                .lock()
                .iter()
                .filter(|request| request.path() == path)
                .count()
        }
    }

    #[async_trait]
    impl HttpTransport for RoutedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.lock().push(request.clone());

            // Let concurrent callers interleave like a real network hop.
            tokio::task::yield_now().await;

            self.routes
                .iter()
                .find(|(method, path, _)| *method == request.method && path == request.path())
                .map_or_else(
                    || Ok(HttpResponse::new(404, "Not Found", "")),
                    |(_, _, handler)| handler(&request),
                )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_path() {
        let request = HttpRequest::new(HttpMethod::Get, "http://localhost:8000/audit/logs");
        assert_eq!(request.path(), "/audit/logs");

        let bare = HttpRequest::new(HttpMethod::Get, "http://localhost:8000");
        assert_eq!(bare.path(), "/");
    }

    #[test]
    fn test_bearer_lookup_is_case_insensitive() {
        let mut request = HttpRequest::new(HttpMethod::Get, "http://localhost/stock");
        request
            .headers
            .push(("Authorization".to_string(), "Bearer A1".to_string()));

        assert_eq!(request.bearer(), Some("A1"));
    }

    #[test]
    fn test_response_classification() {
        assert!(HttpResponse::new(204, "No Content", "").is_success());
        assert!(HttpResponse::new(401, "Unauthorized", "").is_unauthorized());
        assert!(!HttpResponse::new(302, "Found", "").is_success());
    }
}
