//! PostgreSQL implementation of the access log repository.

use async_trait::async_trait;
use sqlx::types::Json;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{AccessLog, AuditLogFilter, NewAccessLog};
use crate::domain::repositories::AccessLogRepository;
use crate::infrastructure::database::{DatabaseService, RepositoryErrorExt};
use crate::shared::AppResult;

const ACCESS_LOG_COLUMNS: &str = "id, user_id, action, resource_type, resource_id, decision, policy_id, \
     user_attributes, resource_attributes, environment_attributes, \
     evaluated_policies, evaluation_time_ms, reason, \
     ip_address, user_agent, endpoint, created_at";

/// Maximum page size for audit listings.
const PAGINATION_LIMIT_MAX: i64 = 1000;

/// Clamp a pagination limit to the maximum allowed value.
fn clamp_limit(limit: u32) -> i64 {
    let requested = if limit == 0 { PAGINATION_LIMIT_MAX } else { limit as i64 };
    requested.min(PAGINATION_LIMIT_MAX)
}

/// PostgreSQL implementation of [`AccessLogRepository`].
pub struct AccessLogRepositoryImpl {
    database_service: Arc<DatabaseService>,
}

impl AccessLogRepositoryImpl {
    /// Create a repository over the shared database service.
    pub fn new(database_service: Arc<DatabaseService>) -> Self {
        Self { database_service }
    }
}

#[async_trait]
impl AccessLogRepository for AccessLogRepositoryImpl {
    async fn append(&self, log: NewAccessLog) -> AppResult<AccessLog> {
        assert!(!log.action.is_empty(), "Action must not be empty");
        assert!(
            log.decision == "allow" || log.decision == "deny",
            "Decision must be allow or deny"
        );

        let id = Uuid::new_v4();
        let query = format!(
            "INSERT INTO abac_access_logs ( \
                 id, user_id, action, resource_type, resource_id, decision, policy_id, \
                 user_attributes, resource_attributes, environment_attributes, \
                 evaluated_policies, evaluation_time_ms, reason, \
                 ip_address, user_agent, endpoint \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {ACCESS_LOG_COLUMNS}"
        );

        let row = sqlx::query_as::<_, AccessLog>(&query)
            .bind(id)
            .bind(log.user_id)
            .bind(log.action)
            .bind(log.resource_type)
            .bind(log.resource_id)
            .bind(log.decision)
            .bind(log.policy_id)
            .bind(log.user_attributes)
            .bind(log.resource_attributes)
            .bind(log.environment_attributes)
            .bind(Json(log.evaluated_policies))
            .bind(log.evaluation_time_ms)
            .bind(log.reason)
            .bind(log.ip_address)
            .bind(log.user_agent)
            .bind(log.endpoint)
            .fetch_one(self.database_service.pool())
            .await
            .map_db_error("append", "access_log")?;

        assert_eq!(row.id, id, "Appended access log ID mismatch");
        Ok(row)
    }

    async fn list(&self, filter: AuditLogFilter) -> AppResult<Vec<AccessLog>> {
        let limit = clamp_limit(filter.limit);
        assert!(limit > 0, "Limit must be positive");

        let query = format!(
            "SELECT {ACCESS_LOG_COLUMNS} FROM abac_access_logs \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
               AND ($2::text IS NULL OR resource_type = $2) \
               AND ($3::text IS NULL OR action = $3) \
               AND ($4::text IS NULL OR decision = $4) \
             ORDER BY created_at DESC \
             LIMIT $5"
        );

        let rows = sqlx::query_as::<_, AccessLog>(&query)
            .bind(filter.user_id)
            .bind(filter.resource_type)
            .bind(filter.action)
            .bind(filter.decision)
            .bind(limit)
            .fetch_all(self.database_service.pool())
            .await
            .map_db_error("list", "access_log")?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limit_caps_at_maximum() {
        assert_eq!(clamp_limit(10), 10);
        assert_eq!(clamp_limit(5000), PAGINATION_LIMIT_MAX);
    }

    #[test]
    fn clamp_limit_defaults_zero_to_maximum() {
        assert_eq!(clamp_limit(0), PAGINATION_LIMIT_MAX);
    }
}
