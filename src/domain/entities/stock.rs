//! Stock, equipment and directory entities plus mutation requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::ValidationError;

/// Maximum length of a free-text reason.
pub const MAX_REASON_LENGTH: usize = 500;

/// Lifecycle status of a stock item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Available,
    Assigned,
    Faulty,
    Deleted,
}

/// Stock line held by a department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: u64,
    pub name: String,
    pub quantity: u32,
    pub par_level: u32,
    pub age_in_days: u32,
    pub below_par: bool,
    pub department_id: u64,
    #[serde(default)]
    pub assigned_to: Option<String>,
    pub status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Department inside a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: u64,
    pub name: String,
    pub tenant_id: u64,
}

/// Equipment currently assigned to the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyEquipmentItem {
    pub id: u64,
    pub name: String,
    pub department: String,
    pub assigned_at: DateTime<Utc>,
    pub is_faulty: bool,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// User entry offered as an assignment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOption {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub department_name: Option<String>,
}

/// Condition reported when an item is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCondition {
    Good,
    Damaged,
    Lost,
}

impl std::str::FromStr for ItemCondition {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "good" => Ok(Self::Good),
            "damaged" => Ok(Self::Damaged),
            "lost" => Ok(Self::Lost),
            other => Err(ValidationError::invalid_choice(
                "condition",
                format!("expected good, damaged or lost, got {other:?}"),
            )),
        }
    }
}

/// Assigns a stock item to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignStockRequest {
    pub stock_item_id: u64,
    pub assignee_user_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AssignStockRequest {
    /// # Errors
    /// Returns the first field that fails validation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive("stock_item_id", self.stock_item_id)?;
        require_positive("assignee_user_id", self.assignee_user_id)?;
        if let Some(reason) = &self.reason {
            require_max_length("reason", reason)?;
        }
        Ok(())
    }
}

/// Returns an assigned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItemRequest {
    pub item_id: u64,
    pub reason: String,
    pub condition: ItemCondition,
}

impl ReturnItemRequest {
    /// # Errors
    /// Returns the first field that fails validation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive("item_id", self.item_id)?;
        require_reason("reason", &self.reason)
    }
}

/// Flags an item as faulty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkFaultyRequest {
    pub item_id: u64,
    pub reason: String,
}

impl MarkFaultyRequest {
    /// # Errors
    /// Returns the first field that fails validation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive("item_id", self.item_id)?;
        require_reason("reason", &self.reason)
    }
}

/// Acknowledgement returned by mutation endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MutationResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn require_positive(field: &'static str, value: u64) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::not_positive(field));
    }
    Ok(())
}

fn require_max_length(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let length = value.chars().count();
    if length > MAX_REASON_LENGTH {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_REASON_LENGTH,
            actual: length,
        });
    }
    Ok(())
}

fn require_reason(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    require_max_length(field, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_request_valid_without_reason() {
        let request = AssignStockRequest {
            stock_item_id: 1,
            assignee_user_id: 2,
            reason: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_assign_request_rejects_zero_ids() {
        let request = AssignStockRequest {
            stock_item_id: 0,
            assignee_user_id: 2,
            reason: None,
        };
        assert!(matches!(
            request.validate(),
            Err(ValidationError::NotPositive {
                field: "stock_item_id"
            })
        ));
    }

    #[test]
    fn test_reason_length_limit() {
        let request = MarkFaultyRequest {
            item_id: 3,
            reason: "x".repeat(MAX_REASON_LENGTH + 1),
        };
        assert!(matches!(
            request.validate(),
            Err(ValidationError::TooLong { actual: 501, .. })
        ));
    }

    #[test]
    fn test_return_requires_reason() {
        let request = ReturnItemRequest {
            item_id: 3,
            reason: "  ".to_string(),
            condition: ItemCondition::Good,
        };
        assert!(matches!(
            request.validate(),
            Err(ValidationError::Required { field: "reason" })
        ));
    }

    #[test]
    fn test_condition_parsing() {
        assert_eq!("Damaged".parse::<ItemCondition>().unwrap(), ItemCondition::Damaged);
        assert!("broken".parse::<ItemCondition>().is_err());
    }

    #[test]
    fn test_stock_item_deserialize() {
        let json = r#"{
            "id": 1,
            "name": "Dell Laptop XPS 13",
            "quantity": 5,
            "par_level": 10,
            "age_in_days": 45,
            "below_par": true,
            "department_id": 1,
            "status": "available",
            "created_at": "2024-01-15T10:00:00Z",
            "updated_at": "2024-01-15T10:00:00Z"
        }"#;

        let item: StockItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.status, StockStatus::Available);
        assert!(item.below_par);
        assert!(item.assigned_to.is_none());
    }

    #[test]
    fn test_assign_request_omits_missing_reason() {
        let request = AssignStockRequest {
            stock_item_id: 1,
            assignee_user_id: 2,
            reason: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("reason").is_none());
    }
}
