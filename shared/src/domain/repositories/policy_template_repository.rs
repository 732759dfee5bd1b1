//! Policy template persistence contract.

use async_trait::async_trait;

use crate::domain::entities::PolicyTemplate;
use crate::shared::AppResult;

/// Repository for pre-defined policy templates.
#[async_trait]
pub trait PolicyTemplateRepository: Send + Sync {
    /// List active templates, optionally restricted to a category.
    async fn list(&self, category: Option<&str>) -> AppResult<Vec<PolicyTemplate>>;

    /// Find a template by its unique name.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<PolicyTemplate>>;
}
