//! Append-only audit trail of access decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One persisted access decision, with the full inputs as captured at
/// evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccessLog {
    /// Record id.
    pub id: Uuid,
    /// Requesting subject.
    pub user_id: Uuid,
    /// Requested action.
    pub action: String,
    /// Requested resource type.
    pub resource_type: String,
    /// Requested resource id, when one was supplied.
    pub resource_id: Option<i64>,
    /// Final decision: `"allow"` or `"deny"`.
    pub decision: String,
    /// The policy that determined the decision, if any matched.
    pub policy_id: Option<Uuid>,
    /// Subject attribute bag as captured.
    pub user_attributes: Option<serde_json::Value>,
    /// Resource attribute bag as captured.
    pub resource_attributes: Option<serde_json::Value>,
    /// Environment attribute bag as captured.
    pub environment_attributes: Option<serde_json::Value>,
    /// Ids of every policy evaluated, in evaluation order.
    #[sqlx(json(nullable))]
    pub evaluated_policies: Option<Vec<Uuid>>,
    /// Wall-clock evaluation time in milliseconds.
    pub evaluation_time_ms: Option<i64>,
    /// Human-readable decision reason.
    pub reason: Option<String>,
    /// Requesting IP address.
    pub ip_address: Option<String>,
    /// Requesting user agent.
    pub user_agent: Option<String>,
    /// Requested endpoint.
    pub endpoint: Option<String>,
    /// Creation timestamp; audit ordering key.
    pub created_at: DateTime<Utc>,
}

/// A not-yet-persisted audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccessLog {
    /// Requesting subject.
    pub user_id: Uuid,
    /// Requested action.
    pub action: String,
    /// Requested resource type.
    pub resource_type: String,
    /// Requested resource id.
    pub resource_id: Option<i64>,
    /// Final decision string.
    pub decision: String,
    /// Matched policy, if any.
    pub policy_id: Option<Uuid>,
    /// Subject bag.
    pub user_attributes: Option<serde_json::Value>,
    /// Resource bag.
    pub resource_attributes: Option<serde_json::Value>,
    /// Environment bag.
    pub environment_attributes: Option<serde_json::Value>,
    /// Evaluated policy ids in order.
    pub evaluated_policies: Vec<Uuid>,
    /// Evaluation time in milliseconds.
    pub evaluation_time_ms: i64,
    /// Decision reason.
    pub reason: String,
    /// Requesting IP address.
    pub ip_address: Option<String>,
    /// Requesting user agent.
    pub user_agent: Option<String>,
    /// Requested endpoint.
    pub endpoint: Option<String>,
}

/// Filter for audit listings; newest records first.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    /// Restrict to a subject.
    pub user_id: Option<Uuid>,
    /// Restrict to a resource type.
    pub resource_type: Option<String>,
    /// Restrict to an action.
    pub action: Option<String>,
    /// Restrict to a decision string.
    pub decision: Option<String>,
    /// Page size; clamped to 1000 by the repository.
    pub limit: u32,
}
