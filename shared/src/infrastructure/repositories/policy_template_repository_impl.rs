//! PostgreSQL implementation of the policy template repository.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::entities::PolicyTemplate;
use crate::domain::repositories::PolicyTemplateRepository;
use crate::infrastructure::database::{DatabaseService, RepositoryErrorExt};
use crate::shared::AppResult;

const TEMPLATE_COLUMNS: &str =
    "id, name, description, category, template_config, required_parameters, \
     is_active, created_at";

/// PostgreSQL implementation of [`PolicyTemplateRepository`].
pub struct PolicyTemplateRepositoryImpl {
    database_service: Arc<DatabaseService>,
}

impl PolicyTemplateRepositoryImpl {
    /// Create a repository over the shared database service.
    pub fn new(database_service: Arc<DatabaseService>) -> Self {
        Self { database_service }
    }
}

#[async_trait]
impl PolicyTemplateRepository for PolicyTemplateRepositoryImpl {
    async fn list(&self, category: Option<&str>) -> AppResult<Vec<PolicyTemplate>> {
        let query = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM policy_templates \
             WHERE is_active = TRUE \
               AND ($1::text IS NULL OR category = $1) \
             ORDER BY name"
        );

        let rows = sqlx::query_as::<_, PolicyTemplate>(&query)
            .bind(category)
            .fetch_all(self.database_service.pool())
            .await
            .map_db_error("list", "policy_template")?;

        Ok(rows)
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<PolicyTemplate>> {
        assert!(!name.is_empty(), "Template name must not be empty");

        let query = format!("SELECT {TEMPLATE_COLUMNS} FROM policy_templates WHERE name = $1");
        let row = sqlx::query_as::<_, PolicyTemplate>(&query)
            .bind(name)
            .fetch_optional(self.database_service.pool())
            .await
            .map_db_error("fetch", "policy_template")?;

        Ok(row)
    }
}
