//! Request descriptors consumed by the gateway.

use serde::Serialize;
use serde_json::Value;

use crate::domain::entities::Topic;
use crate::domain::errors::ApiError;
use crate::domain::ports::HttpMethod;

/// Immutable description of one API call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Path relative to the API base, starting with `/`.
    pub path: String,
    pub method: HttpMethod,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    /// Cache topics a successful call changes.
    pub invalidates: Vec<Topic>,
}

impl RequestDescriptor {
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            invalidates: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    #[must_use]
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query.extend(query);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attaches a JSON body.
    ///
    /// # Errors
    /// Returns `ApiError::Serialization` if `body` cannot be represented as JSON.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::serialization(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    #[must_use]
    pub fn invalidating(mut self, topics: impl IntoIterator<Item = Topic>) -> Self {
        self.invalidates.extend(topics);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let descriptor = RequestDescriptor::post("/stock/assign")
            .with_json(&json!({"stock_item_id": 1, "user_id": 2}))
            .unwrap()
            .with_header("X-Request-Source", "cli")
            .invalidating(Topic::stock_movement());

        assert_eq!(descriptor.method, HttpMethod::Post);
        assert_eq!(descriptor.body, Some(json!({"stock_item_id": 1, "user_id": 2})));
        assert_eq!(descriptor.headers.len(), 1);
        assert_eq!(
            descriptor.invalidates,
            vec![Topic::STOCK, Topic::EQUIPMENT, Topic::AUDIT_LOGS]
        );
    }

    #[test]
    fn test_reads_invalidate_nothing() {
        let descriptor = RequestDescriptor::get("/stock")
            .with_query(vec![("department_id".to_string(), "3".to_string())]);

        assert!(descriptor.invalidates.is_empty());
        assert!(descriptor.body.is_none());
        assert_eq!(descriptor.query[0].1, "3");
    }
}
