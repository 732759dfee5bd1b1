//! PostgreSQL implementation of the policy repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{CreatePolicy, Policy, PolicyFilter, UpdatePolicy};
use crate::domain::repositories::PolicyRepository;
use crate::infrastructure::database::{DatabaseService, RepositoryErrorExt};
use crate::shared::{AppError, AppResult};

const POLICY_COLUMNS: &str = "id, name, description, effect, priority, action, resource_type, \
     conditions, department_ids, division_ids, role_requirements, \
     is_active, created_by, created_at, updated_at";

/// Maximum page size for policy listings.
const PAGINATION_LIMIT_MAX: i64 = 1000;

/// PostgreSQL implementation of [`PolicyRepository`].
pub struct PolicyRepositoryImpl {
    database_service: Arc<DatabaseService>,
}

impl PolicyRepositoryImpl {
    /// Create a repository over the shared database service.
    pub fn new(database_service: Arc<DatabaseService>) -> Self {
        Self { database_service }
    }
}

#[async_trait]
impl PolicyRepository for PolicyRepositoryImpl {
    async fn list(&self, filter: PolicyFilter) -> AppResult<Vec<Policy>> {
        let query = format!(
            "SELECT {POLICY_COLUMNS} FROM abac_policies \
             WHERE ($1::text IS NULL OR resource_type = $1) \
               AND ($2::text IS NULL OR action = $2) \
               AND ($3::boolean IS NULL OR is_active = $3) \
             ORDER BY priority DESC, id ASC \
             LIMIT {PAGINATION_LIMIT_MAX}"
        );

        let rows = sqlx::query_as::<_, Policy>(&query)
            .bind(filter.resource_type)
            .bind(filter.action)
            .bind(filter.is_active)
            .fetch_all(self.database_service.pool())
            .await
            .map_db_error("list", "policy")?;

        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Policy>> {
        assert!(!id.is_nil(), "Policy ID must not be nil");

        let query = format!("SELECT {POLICY_COLUMNS} FROM abac_policies WHERE id = $1");
        let row = sqlx::query_as::<_, Policy>(&query)
            .bind(id)
            .fetch_optional(self.database_service.pool())
            .await
            .map_db_error("fetch", "policy")?;

        Ok(row)
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Policy>> {
        assert!(!name.is_empty(), "Policy name must not be empty");

        let query = format!("SELECT {POLICY_COLUMNS} FROM abac_policies WHERE name = $1");
        let row = sqlx::query_as::<_, Policy>(&query)
            .bind(name)
            .fetch_optional(self.database_service.pool())
            .await
            .map_db_error("fetch", "policy")?;

        Ok(row)
    }

    async fn find_candidates(
        &self,
        action: &str,
        resource_type: &str,
    ) -> AppResult<Vec<Policy>> {
        assert!(!action.is_empty(), "Action must not be empty");
        assert!(!resource_type.is_empty(), "Resource type must not be empty");

        // Wildcard matching is an explicit OR against the literal '*',
        // not pattern matching.
        let query = format!(
            "SELECT {POLICY_COLUMNS} FROM abac_policies \
             WHERE is_active = TRUE \
               AND (action = $1 OR action = '*') \
               AND (resource_type = $2 OR resource_type = '*') \
             ORDER BY priority DESC, id ASC"
        );

        let rows = sqlx::query_as::<_, Policy>(&query)
            .bind(action)
            .bind(resource_type)
            .fetch_all(self.database_service.pool())
            .await
            .map_db_error("fetch_candidates", "policy")?;

        Ok(rows)
    }

    async fn create(&self, policy: CreatePolicy, created_by: Uuid) -> AppResult<Policy> {
        assert!(!policy.name.is_empty(), "Policy name must not be empty");
        assert!(!policy.action.is_empty(), "Policy action must not be empty");
        assert!(
            !policy.resource_type.is_empty(),
            "Policy resource type must not be empty"
        );

        let id = Uuid::new_v4();
        let query = format!(
            "INSERT INTO abac_policies ( \
                 id, name, description, effect, priority, action, resource_type, \
                 conditions, department_ids, division_ids, role_requirements, \
                 is_active, created_by, created_at \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE, $12, $13) \
             RETURNING {POLICY_COLUMNS}"
        );

        let row = sqlx::query_as::<_, Policy>(&query)
            .bind(id)
            .bind(policy.name)
            .bind(policy.description)
            .bind(policy.effect)
            .bind(policy.priority)
            .bind(policy.action)
            .bind(policy.resource_type)
            .bind(policy.conditions)
            .bind(policy.department_ids.map(Json))
            .bind(policy.division_ids.map(Json))
            .bind(policy.role_requirements.map(Json))
            .bind(created_by)
            .bind(Utc::now())
            .fetch_one(self.database_service.pool())
            .await
            .map_db_error("create", "policy")?;

        assert_eq!(row.id, id, "Created policy ID mismatch");
        Ok(row)
    }

    async fn update(&self, id: Uuid, update: UpdatePolicy) -> AppResult<Policy> {
        assert!(!id.is_nil(), "Policy ID must not be nil");

        let query = format!(
            "UPDATE abac_policies SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 effect = COALESCE($4, effect), \
                 priority = COALESCE($5, priority), \
                 conditions = COALESCE($6, conditions), \
                 department_ids = COALESCE($7, department_ids), \
                 division_ids = COALESCE($8, division_ids), \
                 role_requirements = COALESCE($9, role_requirements), \
                 is_active = COALESCE($10, is_active), \
                 updated_at = $11 \
             WHERE id = $1 \
             RETURNING {POLICY_COLUMNS}"
        );

        let row = sqlx::query_as::<_, Policy>(&query)
            .bind(id)
            .bind(update.name)
            .bind(update.description)
            .bind(update.effect)
            .bind(update.priority)
            .bind(update.conditions)
            .bind(update.department_ids.map(Json))
            .bind(update.division_ids.map(Json))
            .bind(update.role_requirements.map(Json))
            .bind(update.is_active)
            .bind(Utc::now())
            .fetch_optional(self.database_service.pool())
            .await
            .map_db_error("update", "policy")?
            .ok_or_else(|| AppError::NotFound(format!("Policy {} not found", id)))?;

        assert_eq!(row.id, id, "Updated policy ID mismatch");
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        assert!(!id.is_nil(), "Policy ID must not be nil");

        let result = sqlx::query("DELETE FROM abac_policies WHERE id = $1")
            .bind(id)
            .execute(self.database_service.pool())
            .await
            .map_db_error("delete", "policy")?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Policy {} not found", id)));
        }
        Ok(())
    }
}
