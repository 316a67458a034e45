//! Authenticated user entity.

use serde::{Deserialize, Serialize};

/// Role names in the order used to pick a primary role.
const ROLE_PRIORITY: [&str; 4] = ["admin", "stock_manager", "staff", "viewer"];

/// Numeric user identifier assigned by the API.
pub type UserId = u64;

/// User returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Granted roles. A user may hold several.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Home department.
    #[serde(default)]
    pub department_id: Option<u64>,
    /// Display name.
    #[serde(default)]
    pub full_name: Option<String>,
}

impl User {
    /// Returns display name, falling back to the username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }

    /// Checks whether the user holds a role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Checks whether the user holds any of the roles.
    #[must_use]
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Returns the highest-priority role held, else the first one.
    #[must_use]
    pub fn primary_role(&self) -> Option<&str> {
        ROLE_PRIORITY
            .iter()
            .copied()
            .find(|role| self.has_role(role))
            .or_else(|| self.roles.first().map(String::as_str))
    }
}
