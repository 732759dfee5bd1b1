//! Audit log persistence contract.

use async_trait::async_trait;

use crate::domain::entities::{AccessLog, AuditLogFilter, NewAccessLog};
use crate::shared::AppResult;

/// Append-only repository for access decisions.
#[async_trait]
pub trait AccessLogRepository: Send + Sync {
    /// Durably append one decision record. The decision is only handed
    /// back to the caller after this returns.
    async fn append(&self, log: NewAccessLog) -> AppResult<AccessLog>;

    /// List decisions newest-first, applying the filter.
    async fn list(&self, filter: AuditLogFilter) -> AppResult<Vec<AccessLog>>;
}
