//! Audit log entries and query filters.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default page size used by the audit endpoint.
pub const DEFAULT_AUDIT_PAGE_SIZE: u32 = 50;

/// Kind of change recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Assign,
    Return,
    Delete,
    MarkFaulty,
    Transfer,
    AddStock,
    UpdateParLevel,
}

impl AuditAction {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Return => "return",
            Self::Delete => "delete",
            Self::MarkFaulty => "mark_faulty",
            Self::Transfer => "transfer",
            Self::AddStock => "add_stock",
            Self::UpdateParLevel => "update_par_level",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "assign" => Self::Assign,
            "return" => Self::Return,
            "delete" => Self::Delete,
            "mark_faulty" => Self::MarkFaulty,
            "transfer" => Self::Transfer,
            "add_stock" => Self::AddStock,
            "update_par_level" => Self::UpdateParLevel,
            other => return Err(format!("unknown audit action: {other}")),
        };
        Ok(action)
    }
}

/// Single audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    #[serde(default)]
    pub reason: Option<String>,
    pub stock_item_id: u64,
    #[serde(default)]
    pub stock_item_name: Option<String>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub department_id: Option<u64>,
    #[serde(default)]
    pub department_name: Option<String>,
    pub performed_by_id: u64,
    pub performed_by_name: String,
    #[serde(default)]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

/// Paginated audit log page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogsResponse {
    pub logs: Vec<AuditLog>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

/// Server-side filters for the audit log endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AuditLogsFilters {
    pub item_id: Option<u64>,
    pub user_id: Option<u64>,
    pub department_id: Option<u64>,
    pub action: Option<AuditAction>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl AuditLogsFilters {
    /// Returns the filters as query pairs, skipping unset fields.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                query.push((key.to_string(), value));
            }
        };

        push("item_id", self.item_id.map(|v| v.to_string()));
        push("user_id", self.user_id.map(|v| v.to_string()));
        push("department_id", self.department_id.map(|v| v.to_string()));
        push("action", self.action.map(|a| a.as_str().to_string()));
        push("page", self.page.map(|v| v.to_string()));
        push("per_page", self.per_page.map(|v| v.to_string()));

        query
    }

    /// Stable cache key fragment for these filters.
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.to_query()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filters_produce_no_query() {
        assert!(AuditLogsFilters::default().to_query().is_empty());
        assert_eq!(AuditLogsFilters::default().cache_key(), "");
    }

    #[test]
    fn test_filters_to_query() {
        let filters = AuditLogsFilters {
            item_id: Some(3),
            action: Some(AuditAction::MarkFaulty),
            per_page: Some(DEFAULT_AUDIT_PAGE_SIZE),
            ..Default::default()
        };

        assert_eq!(
            filters.to_query(),
            vec![
                ("item_id".to_string(), "3".to_string()),
                ("action".to_string(), "mark_faulty".to_string()),
                ("per_page".to_string(), "50".to_string()),
            ]
        );
        assert_eq!(filters.cache_key(), "item_id=3&action=mark_faulty&per_page=50");
    }

    #[test]
    fn test_action_round_trip_names() {
        assert_eq!("update_par_level".parse::<AuditAction>(), Ok(AuditAction::UpdateParLevel));
        assert!("explode".parse::<AuditAction>().is_err());
    }

    #[test]
    fn test_audit_log_deserialize() {
        let json = r#"{
            "id": 2,
            "timestamp": "2024-01-25T13:15:00Z",
            "action": "mark_faulty",
            "reason": "Screen flickering issue",
            "stock_item_id": 3,
            "performed_by_id": 4,
            "performed_by_name": "Sarah Johnson"
        }"#;

        let log: AuditLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.action, AuditAction::MarkFaulty);
        assert!(log.details.is_none());
    }
}
