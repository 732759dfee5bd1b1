//! PostgreSQL implementation of the workflow repository.
//!
//! Stage and route rows are a projection of the saved graph. Every save
//! replaces them inside one transaction together with the version
//! snapshot and the definition update, so either the whole new revision
//! is visible or none of it is.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{
    CompiledWorkflow, ConditionalRoute, NewWorkflow, WorkflowDefinition, WorkflowFilter,
    WorkflowStage, WorkflowVersion,
};
use crate::domain::repositories::WorkflowRepository;
use crate::infrastructure::database::{DatabaseService, RepositoryErrorExt};
use crate::shared::{AppError, AppResult};

const WORKFLOW_COLUMNS: &str = "id, name, model_name, workflow_graph, version, status, created_by, \
     department_id, division_id, view_roles, edit_roles, use_roles, \
     published_at, created_at, updated_at";

const STAGE_COLUMNS: &str = "id, workflow_id, node_id, node_type, order_index, required_role, \
     required_roles, specific_users, approval_type, required_count, \
     condition_config, sla_hours, escalation_config, notification_template, \
     action_hook, position_x, position_y, next_stage_id, created_at";

const ROUTE_COLUMNS: &str = "id, from_stage_id, to_stage_id, label, condition_field, operator, \
     condition_value, priority, created_at";

/// PostgreSQL implementation of [`WorkflowRepository`].
pub struct WorkflowRepositoryImpl {
    database_service: Arc<DatabaseService>,
}

impl WorkflowRepositoryImpl {
    /// Create a repository over the shared database service.
    pub fn new(database_service: Arc<DatabaseService>) -> Self {
        Self { database_service }
    }

    /// Delete and rebuild the derived stage and route rows of a workflow
    /// from the compiled projection. Runs inside the caller's
    /// transaction.
    async fn replace_derived(
        tx: &mut Transaction<'_, Postgres>,
        workflow_id: Uuid,
        compiled: &CompiledWorkflow,
    ) -> AppResult<()> {
        sqlx::query(
            "DELETE FROM conditional_routes \
             WHERE from_stage_id IN (SELECT id FROM workflow_stages WHERE workflow_id = $1)",
        )
        .bind(workflow_id)
        .execute(&mut **tx)
        .await
        .map_db_error("delete", "conditional_route")?;

        sqlx::query("DELETE FROM workflow_stages WHERE workflow_id = $1")
            .bind(workflow_id)
            .execute(&mut **tx)
            .await
            .map_db_error("delete", "workflow_stage")?;

        let now = Utc::now();
        let mut stage_ids: HashMap<&str, Uuid> = HashMap::new();

        for stage in &compiled.stages {
            let id = Uuid::new_v4();
            stage_ids.insert(stage.node_id.as_str(), id);

            sqlx::query(
                "INSERT INTO workflow_stages ( \
                     id, workflow_id, node_id, node_type, order_index, required_role, \
                     required_roles, specific_users, approval_type, required_count, \
                     condition_config, sla_hours, escalation_config, \
                     notification_template, action_hook, position_x, position_y, \
                     created_at \
                 ) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, \
                         $14, $15, $16, $17, $18)",
            )
            .bind(id)
            .bind(workflow_id)
            .bind(&stage.node_id)
            .bind(stage.node_type)
            .bind(stage.order_index)
            .bind(&stage.required_role)
            .bind(stage.required_roles.clone().map(Json))
            .bind(stage.specific_users.clone().map(Json))
            .bind(stage.approval_type)
            .bind(stage.required_count)
            .bind(&stage.condition_config)
            .bind(stage.sla_hours)
            .bind(&stage.escalation_config)
            .bind(&stage.notification_template)
            .bind(&stage.action_hook)
            .bind(stage.position_x)
            .bind(stage.position_y)
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_db_error("create", "workflow_stage")?;
        }

        // Back-links resolve against the freshly created stage ids, so
        // they go in a second pass.
        for stage in &compiled.stages {
            let Some(next_node) = stage.next_node_id.as_deref() else {
                continue;
            };
            let (Some(from), Some(to)) = (
                stage_ids.get(stage.node_id.as_str()),
                stage_ids.get(next_node),
            ) else {
                continue;
            };

            sqlx::query("UPDATE workflow_stages SET next_stage_id = $2 WHERE id = $1")
                .bind(from)
                .bind(to)
                .execute(&mut **tx)
                .await
                .map_db_error("update", "workflow_stage")?;
        }

        for route in &compiled.routes {
            let (Some(from), Some(to)) = (
                stage_ids.get(route.from_node_id.as_str()),
                stage_ids.get(route.to_node_id.as_str()),
            ) else {
                continue;
            };

            sqlx::query(
                "INSERT INTO conditional_routes ( \
                     id, from_stage_id, to_stage_id, label, condition_field, \
                     operator, condition_value, priority, created_at \
                 ) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(Uuid::new_v4())
            .bind(from)
            .bind(to)
            .bind(&route.label)
            .bind(&route.condition_field)
            .bind(&route.operator)
            .bind(&route.condition_value)
            .bind(route.priority)
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_db_error("create", "conditional_route")?;
        }

        Ok(())
    }
}

#[async_trait]
impl WorkflowRepository for WorkflowRepositoryImpl {
    async fn create(
        &self,
        workflow: NewWorkflow,
        compiled: CompiledWorkflow,
    ) -> AppResult<WorkflowDefinition> {
        assert!(!workflow.name.is_empty(), "Workflow name must not be empty");
        assert!(workflow.name.len() <= 200, "Workflow name exceeds 200 chars");

        let mut tx = self
            .database_service
            .pool()
            .begin()
            .await
            .map_db_error("begin", "workflow")?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let query = format!(
            "INSERT INTO workflow_definitions ( \
                 id, name, model_name, workflow_graph, version, status, created_by, \
                 department_id, division_id, view_roles, edit_roles, use_roles, \
                 created_at, updated_at \
             ) \
             VALUES ($1, $2, $3, $4, 1, 'draft', $5, $6, $7, $8, $9, $10, $11, $11) \
             RETURNING {WORKFLOW_COLUMNS}"
        );

        let row = sqlx::query_as::<_, WorkflowDefinition>(&query)
            .bind(id)
            .bind(workflow.name)
            .bind(workflow.model_name)
            .bind(workflow.workflow_graph)
            .bind(workflow.created_by)
            .bind(workflow.department_id)
            .bind(workflow.division_id)
            .bind(Json(workflow.view_roles))
            .bind(Json(workflow.edit_roles))
            .bind(Json(workflow.use_roles))
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_db_error("create", "workflow")?;

        Self::replace_derived(&mut tx, id, &compiled).await?;

        tx.commit().await.map_db_error("commit", "workflow")?;

        assert_eq!(row.id, id, "Created workflow ID mismatch");
        assert_eq!(row.version, 1, "New workflow must start at version 1");
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<WorkflowDefinition>> {
        assert!(!id.is_nil(), "Workflow ID must not be nil");

        let query = format!("SELECT {WORKFLOW_COLUMNS} FROM workflow_definitions WHERE id = $1");
        let row = sqlx::query_as::<_, WorkflowDefinition>(&query)
            .bind(id)
            .fetch_optional(self.database_service.pool())
            .await
            .map_db_error("fetch", "workflow")?;

        Ok(row)
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<WorkflowDefinition>> {
        assert!(!name.is_empty(), "Workflow name must not be empty");

        let query =
            format!("SELECT {WORKFLOW_COLUMNS} FROM workflow_definitions WHERE name = $1");
        let row = sqlx::query_as::<_, WorkflowDefinition>(&query)
            .bind(name)
            .fetch_optional(self.database_service.pool())
            .await
            .map_db_error("fetch", "workflow")?;

        Ok(row)
    }

    async fn list(&self, filter: WorkflowFilter) -> AppResult<Vec<WorkflowDefinition>> {
        let query = format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflow_definitions \
             WHERE ($1::varchar IS NULL OR status = $1) \
               AND ($2::bigint IS NULL OR department_id = $2) \
             ORDER BY updated_at DESC \
             LIMIT 1000"
        );

        let rows = sqlx::query_as::<_, WorkflowDefinition>(&query)
            .bind(filter.status)
            .bind(filter.department_id)
            .fetch_all(self.database_service.pool())
            .await
            .map_db_error("list", "workflow")?;

        Ok(rows)
    }

    async fn save_graph(
        &self,
        id: Uuid,
        graph: serde_json::Value,
        compiled: CompiledWorkflow,
        change_description: Option<String>,
        edited_by: Option<Uuid>,
    ) -> AppResult<WorkflowDefinition> {
        assert!(!id.is_nil(), "Workflow ID must not be nil");

        let mut tx = self
            .database_service
            .pool()
            .begin()
            .await
            .map_db_error("begin", "workflow")?;

        let current_query = format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflow_definitions WHERE id = $1 FOR UPDATE"
        );
        let current = sqlx::query_as::<_, WorkflowDefinition>(&current_query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_db_error("fetch", "workflow")?
            .ok_or_else(|| AppError::NotFound(format!("Workflow {} not found", id)))?;

        let now = Utc::now();

        // Snapshot the pre-edit graph under the pre-edit version number.
        sqlx::query(
            "INSERT INTO workflow_versions ( \
                 id, workflow_id, version_number, workflow_graph, \
                 change_description, created_by, created_at \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(current.version)
        .bind(&current.workflow_graph)
        .bind(change_description)
        .bind(edited_by)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_db_error("create", "workflow_version")?;

        Self::replace_derived(&mut tx, id, &compiled).await?;

        let update_query = format!(
            "UPDATE workflow_definitions \
             SET workflow_graph = $2, version = version + 1, updated_at = $3 \
             WHERE id = $1 \
             RETURNING {WORKFLOW_COLUMNS}"
        );
        let row = sqlx::query_as::<_, WorkflowDefinition>(&update_query)
            .bind(id)
            .bind(graph)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_db_error("update", "workflow")?;

        tx.commit().await.map_db_error("commit", "workflow")?;

        assert_eq!(
            row.version,
            current.version + 1,
            "Version must increment by exactly one"
        );
        Ok(row)
    }

    async fn mark_published(&self, id: Uuid) -> AppResult<WorkflowDefinition> {
        assert!(!id.is_nil(), "Workflow ID must not be nil");

        let now = Utc::now();
        let query = format!(
            "UPDATE workflow_definitions \
             SET status = 'active', \
                 published_at = COALESCE(published_at, $2), \
                 updated_at = $2 \
             WHERE id = $1 \
             RETURNING {WORKFLOW_COLUMNS}"
        );

        let row = sqlx::query_as::<_, WorkflowDefinition>(&query)
            .bind(id)
            .bind(now)
            .fetch_optional(self.database_service.pool())
            .await
            .map_db_error("publish", "workflow")?
            .ok_or_else(|| AppError::NotFound(format!("Workflow {} not found", id)))?;

        assert!(row.published_at.is_some(), "Published workflow must carry published_at");
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        assert!(!id.is_nil(), "Workflow ID must not be nil");

        let result = sqlx::query("DELETE FROM workflow_definitions WHERE id = $1")
            .bind(id)
            .execute(self.database_service.pool())
            .await
            .map_db_error("delete", "workflow")?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Workflow {} not found", id)));
        }
        Ok(())
    }

    async fn list_versions(&self, workflow_id: Uuid) -> AppResult<Vec<WorkflowVersion>> {
        assert!(!workflow_id.is_nil(), "Workflow ID must not be nil");

        let query = "SELECT id, workflow_id, version_number, workflow_graph, \
                    change_description, created_by, created_at \
             FROM workflow_versions \
             WHERE workflow_id = $1 \
             ORDER BY version_number DESC \
             LIMIT 1000";

        let rows = sqlx::query_as::<_, WorkflowVersion>(query)
            .bind(workflow_id)
            .fetch_all(self.database_service.pool())
            .await
            .map_db_error("list", "workflow_version")?;

        Ok(rows)
    }

    async fn stages_for(&self, workflow_id: Uuid) -> AppResult<Vec<WorkflowStage>> {
        assert!(!workflow_id.is_nil(), "Workflow ID must not be nil");

        let query = format!(
            "SELECT {STAGE_COLUMNS} FROM workflow_stages \
             WHERE workflow_id = $1 \
             ORDER BY order_index"
        );

        let rows = sqlx::query_as::<_, WorkflowStage>(&query)
            .bind(workflow_id)
            .fetch_all(self.database_service.pool())
            .await
            .map_db_error("list", "workflow_stage")?;

        Ok(rows)
    }

    async fn routes_for(&self, workflow_id: Uuid) -> AppResult<Vec<ConditionalRoute>> {
        assert!(!workflow_id.is_nil(), "Workflow ID must not be nil");

        let query = format!(
            "SELECT {ROUTE_COLUMNS} FROM conditional_routes \
             WHERE from_stage_id IN (SELECT id FROM workflow_stages WHERE workflow_id = $1) \
             ORDER BY priority DESC, created_at"
        );

        let rows = sqlx::query_as::<_, ConditionalRoute>(&query)
            .bind(workflow_id)
            .fetch_all(self.database_service.pool())
            .await
            .map_db_error("list", "conditional_route")?;

        Ok(rows)
    }
}
