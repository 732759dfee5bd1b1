//! ABAC policies and policy templates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The outcome a matching policy produces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PolicyEffect {
    /// Grant access.
    Allow,
    /// Refuse access; a matching deny always wins.
    Deny,
}

impl std::fmt::Display for PolicyEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyEffect::Allow => write!(f, "allow"),
            PolicyEffect::Deny => write!(f, "deny"),
        }
    }
}

/// An attribute-based access-control policy.
///
/// `conditions` holds the `all`/`any`/`none` condition-group document of
/// the policy format; `None` means the policy matches unconditionally.
/// Wildcard `*` is honored in `action` and `resource_type` only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Policy {
    /// Policy id.
    pub id: Uuid,
    /// Unique policy name.
    pub name: String,
    /// Human description.
    pub description: Option<String>,
    /// Allow or deny.
    pub effect: PolicyEffect,
    /// Higher priority policies are evaluated first.
    pub priority: i32,
    /// Action string; `*` matches every action.
    pub action: String,
    /// Resource type string; `*` matches every type.
    pub resource_type: String,
    /// Condition-group document, or `None` for unconditional match.
    pub conditions: Option<serde_json::Value>,
    /// Department scope; subjects outside these departments never match.
    #[sqlx(json(nullable))]
    pub department_ids: Option<Vec<i64>>,
    /// Division scope.
    #[sqlx(json(nullable))]
    pub division_ids: Option<Vec<i64>>,
    /// Required roles; the subject's effective role set must intersect.
    #[sqlx(json(nullable))]
    pub role_requirements: Option<Vec<String>>,
    /// Inactive policies are never candidates.
    pub is_active: bool,
    /// Creating administrator.
    pub created_by: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request to create a new policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePolicy {
    /// Unique policy name.
    pub name: String,
    /// Human description.
    #[serde(default)]
    pub description: Option<String>,
    /// Allow or deny.
    pub effect: PolicyEffect,
    /// Evaluation priority.
    #[serde(default)]
    pub priority: i32,
    /// Action string (wildcard `*` permitted).
    pub action: String,
    /// Resource type string (wildcard `*` permitted).
    pub resource_type: String,
    /// Condition-group document.
    #[serde(default)]
    pub conditions: Option<serde_json::Value>,
    /// Department scope.
    #[serde(default)]
    pub department_ids: Option<Vec<i64>>,
    /// Division scope.
    #[serde(default)]
    pub division_ids: Option<Vec<i64>>,
    /// Required roles.
    #[serde(default)]
    pub role_requirements: Option<Vec<String>>,
}

/// Partial update of a policy. `None` fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePolicy {
    /// New name (must stay unique).
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New effect.
    pub effect: Option<PolicyEffect>,
    /// New priority.
    pub priority: Option<i32>,
    /// New condition-group document.
    pub conditions: Option<serde_json::Value>,
    /// New department scope.
    pub department_ids: Option<Vec<i64>>,
    /// New division scope.
    pub division_ids: Option<Vec<i64>>,
    /// New required roles.
    pub role_requirements: Option<Vec<String>>,
    /// Activate or deactivate the policy.
    pub is_active: Option<bool>,
}

/// Listing filter for policies.
#[derive(Debug, Clone, Default)]
pub struct PolicyFilter {
    /// Restrict to a resource type.
    pub resource_type: Option<String>,
    /// Restrict to an action.
    pub action: Option<String>,
    /// Restrict by active flag.
    pub is_active: Option<bool>,
}

/// A pre-defined policy template with `{{param}}` placeholders in its
/// configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PolicyTemplate {
    /// Template id.
    pub id: Uuid,
    /// Unique template name.
    pub name: String,
    /// Human description.
    pub description: Option<String>,
    /// Grouping category ("finance", "hr", "workflow").
    pub category: Option<String>,
    /// Policy document with placeholders.
    pub template_config: serde_json::Value,
    /// Parameters the caller must supply.
    #[sqlx(json(nullable))]
    pub required_parameters: Option<Vec<String>>,
    /// Inactive templates are hidden from listings.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn policy_effect_round_trips_as_lowercase() {
        assert_eq!(serde_json::to_value(PolicyEffect::Allow).unwrap(), json!("allow"));
        assert_eq!(
            serde_json::from_value::<PolicyEffect>(json!("deny")).unwrap(),
            PolicyEffect::Deny
        );
        assert_eq!(PolicyEffect::Deny.to_string(), "deny");
    }

    #[test]
    fn create_policy_parses_wire_document() {
        let doc = json!({
            "name": "Finance Manager - Approve Own Department Invoices",
            "effect": "allow",
            "priority": 100,
            "action": "approve",
            "resource_type": "Invoice",
            "role_requirements": ["finance_manager"],
            "conditions": {
                "all": [
                    {"attribute": "user.department_id", "operator": "eq",
                     "value": "{{resource.department_id}}"},
                    {"attribute": "resource.amount", "operator": "lte", "value": 10000}
                ]
            }
        });

        let create: CreatePolicy = serde_json::from_value(doc).unwrap();
        assert_eq!(create.effect, PolicyEffect::Allow);
        assert_eq!(create.priority, 100);
        assert!(create.conditions.as_ref().unwrap().get("all").is_some());
        assert!(create.department_ids.is_none());
    }
}
