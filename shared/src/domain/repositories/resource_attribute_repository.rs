//! Dynamic resource attribute persistence contract.

use async_trait::async_trait;

use crate::domain::entities::ResourceAttribute;
use crate::shared::AppResult;

/// Repository for dynamic resource attributes.
#[async_trait]
pub trait ResourceAttributeRepository: Send + Sync {
    /// Fetch every attribute row stored for a resource instance.
    async fn list_for(
        &self,
        resource_type: &str,
        resource_id: i64,
    ) -> AppResult<Vec<ResourceAttribute>>;
}
