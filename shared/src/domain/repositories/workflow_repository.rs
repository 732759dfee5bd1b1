//! Workflow definition persistence contract.
//!
//! Stages and conditional routes are derived state: callers never mutate
//! them directly. `create` and `save_graph` take the compiled projection
//! and replace the derived tables atomically.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{
    CompiledWorkflow, ConditionalRoute, NewWorkflow, WorkflowDefinition, WorkflowFilter,
    WorkflowStage, WorkflowVersion,
};
use crate::shared::AppResult;

/// Repository for workflow definitions, compiled stages and versions.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Persist a new DRAFT definition at version 1 together with its
    /// compiled stages and routes, in one transaction. Fails with
    /// `Conflict` on a duplicate name.
    async fn create(
        &self,
        workflow: NewWorkflow,
        compiled: CompiledWorkflow,
    ) -> AppResult<WorkflowDefinition>;

    /// Find a definition by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<WorkflowDefinition>>;

    /// Find a definition by its unique name.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<WorkflowDefinition>>;

    /// List definitions matching the filter, most recently updated first.
    async fn list(&self, filter: WorkflowFilter) -> AppResult<Vec<WorkflowDefinition>>;

    /// Save an edited graph atomically: snapshot the current graph under
    /// the current version number, delete and rebuild the derived stages
    /// and routes from `compiled`, store `graph`, and increment the
    /// definition version by one. Nothing persists if any step fails.
    async fn save_graph(
        &self,
        id: Uuid,
        graph: serde_json::Value,
        compiled: CompiledWorkflow,
        change_description: Option<String>,
        edited_by: Option<Uuid>,
    ) -> AppResult<WorkflowDefinition>;

    /// Transition a definition to ACTIVE, stamping `published_at` on the
    /// first publish only.
    async fn mark_published(&self, id: Uuid) -> AppResult<WorkflowDefinition>;

    /// Delete a definition; stages, routes and versions go with it.
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// List the version snapshots of a definition, newest first.
    async fn list_versions(&self, workflow_id: Uuid) -> AppResult<Vec<WorkflowVersion>>;

    /// Fetch the compiled stages of a definition in order.
    async fn stages_for(&self, workflow_id: Uuid) -> AppResult<Vec<WorkflowStage>>;

    /// Fetch the conditional routes of a definition.
    async fn routes_for(&self, workflow_id: Uuid) -> AppResult<Vec<ConditionalRoute>>;
}
