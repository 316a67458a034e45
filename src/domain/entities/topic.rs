//! Cache topics and invalidation signals.

use std::borrow::Cow;
use std::fmt;

/// Opaque label grouping cached query results invalidated together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(Cow<'static, str>);

impl Topic {
    pub const STOCK: Self = Self(Cow::Borrowed("stock"));
    pub const EQUIPMENT: Self = Self(Cow::Borrowed("equipment"));
    pub const AUDIT_LOGS: Self = Self(Cow::Borrowed("audit-logs"));
    pub const USERS: Self = Self(Cow::Borrowed("users"));
    pub const DEPARTMENTS: Self = Self(Cow::Borrowed("departments"));

    /// Creates a topic from any label.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Returns the label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Topics touched by any stock movement.
    #[must_use]
    pub fn stock_movement() -> Vec<Self> {
        vec![Self::STOCK, Self::EQUIPMENT, Self::AUDIT_LOGS]
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Request to mark every cached read under a topic as stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvalidationEvent {
    pub topic: Topic,
}

impl InvalidationEvent {
    #[must_use]
    pub const fn new(topic: Topic) -> Self {
        Self { topic }
    }
}
