//! Visual workflow definitions and their compiled projections.
//!
//! A definition owns an opaque node-and-edge graph document; stages and
//! conditional routes are derived state rebuilt from the graph on every
//! save. Versions snapshot the pre-save graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle status of a workflow definition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Editable, not yet published.
    Draft,
    /// Published and usable.
    Active,
    /// Retired.
    Archived,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::Draft => write!(f, "draft"),
            WorkflowStatus::Active => write!(f, "active"),
            WorkflowStatus::Archived => write!(f, "archived"),
        }
    }
}

/// Types of compiled stages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StageNodeType {
    /// Entry point; exactly one per compiled workflow.
    Start,
    /// Human approval step.
    Approval,
    /// Conditional branch point.
    Condition,
    /// Parallel split/join.
    Parallel,
    /// Terminal stage.
    End,
    /// Notification dispatch.
    Notification,
    /// Custom action hook.
    Action,
}

impl StageNodeType {
    /// Map an author-supplied node type string to the enum. Unknown
    /// values compile as approval stages.
    pub fn from_node_type(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "start" => StageNodeType::Start,
            "condition" => StageNodeType::Condition,
            "parallel" => StageNodeType::Parallel,
            "end" => StageNodeType::End,
            "notification" => StageNodeType::Notification,
            "action" => StageNodeType::Action,
            _ => StageNodeType::Approval,
        }
    }
}

/// How approvals on a stage are collected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalType {
    /// One approver after another.
    Sequential,
    /// Every listed approver must approve.
    ParallelAll,
    /// Any single approver suffices.
    ParallelAny,
    /// More than half of the approvers must approve.
    ParallelMajority,
}

/// A visual workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowDefinition {
    /// Definition id.
    pub id: Uuid,
    /// Unique workflow name.
    pub name: String,
    /// Business model the workflow routes (e.g. "Invoice").
    pub model_name: String,
    /// Opaque graph document: nodes, edges, viewport.
    pub workflow_graph: serde_json::Value,
    /// Monotone version, starting at 1.
    pub version: i32,
    /// Lifecycle status.
    pub status: WorkflowStatus,
    /// Creating subject.
    pub created_by: Option<Uuid>,
    /// Owning department.
    pub department_id: Option<i64>,
    /// Owning division.
    pub division_id: Option<i64>,
    /// Roles allowed to view; empty list means visible to everyone.
    #[sqlx(json)]
    pub view_roles: Vec<String>,
    /// Roles allowed to edit.
    #[sqlx(json)]
    pub edit_roles: Vec<String>,
    /// Roles allowed to start instances.
    #[sqlx(json)]
    pub use_roles: Vec<String>,
    /// Set on first publish; null until the definition first went active.
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A compiled stage row, derived from one graph node.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowStage {
    /// Stage id; not stable across saves.
    pub id: Uuid,
    /// Owning workflow.
    pub workflow_id: Uuid,
    /// Author-supplied node id from the graph document.
    pub node_id: String,
    /// Stage type.
    pub node_type: StageNodeType,
    /// Position of the node in the saved node list.
    pub order_index: i32,
    /// Single required approver role.
    pub required_role: Option<String>,
    /// Required approver roles.
    #[sqlx(json(nullable))]
    pub required_roles: Option<Vec<String>>,
    /// Specific approver users.
    #[sqlx(json(nullable))]
    pub specific_users: Option<Vec<String>>,
    /// Approval collection mode.
    pub approval_type: Option<ApprovalType>,
    /// Number of approvals required.
    pub required_count: Option<i32>,
    /// Condition configuration for condition stages.
    pub condition_config: Option<serde_json::Value>,
    /// Service-level agreement in hours.
    pub sla_hours: Option<i32>,
    /// Escalation configuration.
    pub escalation_config: Option<serde_json::Value>,
    /// Notification template name.
    pub notification_template: Option<String>,
    /// Custom action hook identifier.
    pub action_hook: Option<String>,
    /// Editor x coordinate.
    pub position_x: f64,
    /// Editor y coordinate.
    pub position_y: f64,
    /// Default successor stage.
    pub next_stage_id: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A conditional transition between two stages of the same workflow.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConditionalRoute {
    /// Route id.
    pub id: Uuid,
    /// Source stage.
    pub from_stage_id: Uuid,
    /// Target stage.
    pub to_stage_id: Uuid,
    /// Display label for the branch.
    pub label: Option<String>,
    /// Field inspected by the route condition.
    pub condition_field: Option<String>,
    /// Comparison operator.
    pub operator: Option<String>,
    /// Comparison value.
    pub condition_value: Option<serde_json::Value>,
    /// Higher priority routes are evaluated first.
    pub priority: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Immutable snapshot of a definition's graph taken before an edit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowVersion {
    /// Snapshot id.
    pub id: Uuid,
    /// Owning workflow.
    pub workflow_id: Uuid,
    /// The definition's version at the moment the snapshot was taken.
    pub version_number: i32,
    /// The pre-edit graph document.
    pub workflow_graph: serde_json::Value,
    /// Author-supplied change description.
    pub change_description: Option<String>,
    /// Editing subject.
    pub created_by: Option<Uuid>,
    /// Snapshot timestamp.
    pub created_at: DateTime<Utc>,
}

/// Request to create a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkflow {
    /// Unique workflow name.
    pub name: String,
    /// Business model name.
    pub model_name: String,
    /// Graph document.
    pub workflow_graph: serde_json::Value,
    /// Creating subject.
    pub created_by: Option<Uuid>,
    /// Owning department.
    #[serde(default)]
    pub department_id: Option<i64>,
    /// Owning division.
    #[serde(default)]
    pub division_id: Option<i64>,
    /// View role list.
    #[serde(default)]
    pub view_roles: Vec<String>,
    /// Edit role list.
    #[serde(default)]
    pub edit_roles: Vec<String>,
    /// Use role list.
    #[serde(default)]
    pub use_roles: Vec<String>,
}

/// Listing filter for workflow definitions.
#[derive(Debug, Clone, Default)]
pub struct WorkflowFilter {
    /// Restrict to a status.
    pub status: Option<WorkflowStatus>,
    /// Restrict to an owning department.
    pub department_id: Option<i64>,
}

/// A stage produced by the compiler, not yet persisted. Route endpoints
/// and the successor back-link reference stages by node id; the
/// repository resolves them to fresh stage ids inside the replace
/// transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStage {
    /// Author-supplied node id.
    pub node_id: String,
    /// Stage type.
    pub node_type: StageNodeType,
    /// Position in the node list.
    pub order_index: i32,
    /// Single required approver role.
    pub required_role: Option<String>,
    /// Required approver roles.
    pub required_roles: Option<Vec<String>>,
    /// Specific approver users.
    pub specific_users: Option<Vec<String>>,
    /// Approval collection mode.
    pub approval_type: Option<ApprovalType>,
    /// Number of approvals required.
    pub required_count: Option<i32>,
    /// Condition configuration.
    pub condition_config: Option<serde_json::Value>,
    /// SLA in hours.
    pub sla_hours: Option<i32>,
    /// Escalation configuration.
    pub escalation_config: Option<serde_json::Value>,
    /// Notification template name.
    pub notification_template: Option<String>,
    /// Custom action hook identifier.
    pub action_hook: Option<String>,
    /// Editor x coordinate.
    pub position_x: f64,
    /// Editor y coordinate.
    pub position_y: f64,
    /// Default successor, by node id.
    pub next_node_id: Option<String>,
}

/// A conditional route produced by the compiler, endpoints by node id.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRoute {
    /// Source node id.
    pub from_node_id: String,
    /// Target node id.
    pub to_node_id: String,
    /// Branch label.
    pub label: Option<String>,
    /// Field inspected by the condition.
    pub condition_field: Option<String>,
    /// Comparison operator.
    pub operator: Option<String>,
    /// Comparison value.
    pub condition_value: Option<serde_json::Value>,
    /// Route priority.
    pub priority: i32,
}

/// The full compiled projection of one graph document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledWorkflow {
    /// Stages, in node-list order.
    pub stages: Vec<CompiledStage>,
    /// Conditional routes.
    pub routes: Vec<CompiledRoute>,
}

impl CompiledWorkflow {
    /// Find a compiled stage by its node id.
    pub fn stage(&self, node_id: &str) -> Option<&CompiledStage> {
        self.stages.iter().find(|s| s.node_id == node_id)
    }
}
