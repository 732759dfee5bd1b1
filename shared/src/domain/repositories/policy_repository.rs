//! Policy persistence contract.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{CreatePolicy, Policy, PolicyFilter, UpdatePolicy};
use crate::shared::AppResult;

/// Repository for ABAC policies.
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// List policies matching the filter, ordered by priority descending
    /// then id ascending.
    async fn list(&self, filter: PolicyFilter) -> AppResult<Vec<Policy>>;

    /// Find a policy by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Policy>>;

    /// Find a policy by its unique name.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Policy>>;

    /// Fetch the candidate set for a request: active policies whose
    /// action equals `action` or `*`, and whose resource type equals
    /// `resource_type` or `*`. Ordered by priority descending then id
    /// ascending.
    async fn find_candidates(&self, action: &str, resource_type: &str)
        -> AppResult<Vec<Policy>>;

    /// Persist a new policy. Fails with `Conflict` on a duplicate name.
    async fn create(&self, policy: CreatePolicy, created_by: Uuid) -> AppResult<Policy>;

    /// Apply a partial update. Fails with `NotFound` for an absent id
    /// and `Conflict` on a duplicate name.
    async fn update(&self, id: Uuid, update: UpdatePolicy) -> AppResult<Policy>;

    /// Delete a policy by id. Fails with `NotFound` for an absent id.
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}
