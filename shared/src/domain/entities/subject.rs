//! Authenticated subjects and their extended attribute profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An authenticated principal, as produced by the authentication
/// provider. Not persisted by this core; carried through every
/// authorization and authoring call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Subject id.
    pub id: Uuid,
    /// Email address.
    pub email: String,
    /// Login name.
    pub username: String,
    /// Primary role.
    pub role: String,
    /// Role set from the role relationship.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Whether the account is active.
    pub is_active: bool,
    /// Whether the account is a superuser.
    #[serde(default)]
    pub is_superuser: bool,
}

impl Subject {
    /// The effective role set: the role relationship when non-empty,
    /// otherwise the single primary role.
    pub fn effective_roles(&self) -> Vec<String> {
        if self.roles.is_empty() {
            vec![self.role.clone()]
        } else {
            self.roles.clone()
        }
    }

    /// Check membership of a role in the effective role set.
    pub fn has_role(&self, role: &str) -> bool {
        if self.roles.is_empty() {
            self.role == role
        } else {
            self.roles.iter().any(|r| r == role)
        }
    }

    /// Check intersection between the effective role set and `roles`.
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|r| self.has_role(r.as_ref()))
    }

    /// Administrators bypass visibility checks.
    pub fn is_admin(&self) -> bool {
        self.is_superuser || self.has_role("admin")
    }
}

/// Extended ABAC attributes for a subject.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubjectProfile {
    /// Owning subject id.
    pub subject_id: Uuid,
    /// Department id.
    pub department_id: Option<i64>,
    /// Division id.
    pub division_id: Option<i64>,
    /// Team id.
    pub team_id: Option<i64>,
    /// Job title.
    pub job_title: Option<String>,
    /// Numeric job level (1 = junior, 10 = executive).
    pub job_level: Option<i32>,
    /// Cost center code.
    pub cost_center: Option<String>,
    /// Monetary approval limit.
    pub approval_limit_amount: Option<i64>,
    /// May approve requests from the own department.
    pub can_approve_own_department: bool,
    /// May approve requests from any department.
    pub can_approve_all_departments: bool,
    /// Office location.
    pub office_location: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: Option<String>,
    /// IANA timezone name.
    pub timezone: Option<String>,
    /// Free-form custom attribute map (string key to typed value).
    pub custom_attributes: Option<serde_json::Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a subject profile. `None` fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubjectProfile {
    /// Department id.
    pub department_id: Option<i64>,
    /// Division id.
    pub division_id: Option<i64>,
    /// Team id.
    pub team_id: Option<i64>,
    /// Job title.
    pub job_title: Option<String>,
    /// Numeric job level.
    pub job_level: Option<i32>,
    /// Cost center code.
    pub cost_center: Option<String>,
    /// Monetary approval limit.
    pub approval_limit_amount: Option<i64>,
    /// May approve requests from the own department.
    pub can_approve_own_department: Option<bool>,
    /// May approve requests from any department.
    pub can_approve_all_departments: Option<bool>,
    /// Office location.
    pub office_location: Option<String>,
    /// Country code.
    pub country_code: Option<String>,
    /// Timezone name.
    pub timezone: Option<String>,
    /// Custom attribute map; replaces the stored map entirely.
    pub custom_attributes: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use crate::testing::SubjectFactory;

    #[test]
    fn effective_roles_prefers_role_set() {
        let s = SubjectFactory::build_with(|s| {
            s.role = "clerk".to_string();
            s.roles = vec!["manager".to_string(), "auditor".to_string()];
        });
        assert_eq!(s.effective_roles(), vec!["manager", "auditor"]);
        assert!(s.has_role("manager"));
        assert!(!s.has_role("clerk"));
    }

    #[test]
    fn effective_roles_falls_back_to_primary_role() {
        let s = SubjectFactory::build_with(|s| s.role = "clerk".to_string());
        assert_eq!(s.effective_roles(), vec!["clerk"]);
        assert!(s.has_role("clerk"));
        assert!(s.has_any_role(&["auditor", "clerk"]));
    }

    #[test]
    fn superuser_is_admin() {
        let mut s = SubjectFactory::build();
        assert!(!s.is_admin());
        s.is_superuser = true;
        assert!(s.is_admin());
    }
}
