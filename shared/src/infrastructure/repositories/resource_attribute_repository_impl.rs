//! PostgreSQL implementation of the resource attribute repository.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::entities::ResourceAttribute;
use crate::domain::repositories::ResourceAttributeRepository;
use crate::infrastructure::database::{DatabaseService, RepositoryErrorExt};
use crate::shared::AppResult;

/// PostgreSQL implementation of [`ResourceAttributeRepository`].
pub struct ResourceAttributeRepositoryImpl {
    database_service: Arc<DatabaseService>,
}

impl ResourceAttributeRepositoryImpl {
    /// Create a repository over the shared database service.
    pub fn new(database_service: Arc<DatabaseService>) -> Self {
        Self { database_service }
    }
}

#[async_trait]
impl ResourceAttributeRepository for ResourceAttributeRepositoryImpl {
    async fn list_for(
        &self,
        resource_type: &str,
        resource_id: i64,
    ) -> AppResult<Vec<ResourceAttribute>> {
        assert!(!resource_type.is_empty(), "Resource type must not be empty");

        let rows = sqlx::query_as::<_, ResourceAttribute>(
            "SELECT id, resource_type, resource_id, attribute_name, attribute_value, \
                    attribute_type, created_at, updated_at \
             FROM resource_attributes \
             WHERE resource_type = $1 AND resource_id = $2 \
             ORDER BY attribute_name",
        )
        .bind(resource_type)
        .bind(resource_id)
        .fetch_all(self.database_service.pool())
        .await
        .map_db_error("list", "resource_attribute")?;

        Ok(rows)
    }
}
