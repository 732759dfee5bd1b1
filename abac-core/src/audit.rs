//! Audit trail writer.
//!
//! Every decision is captured with its full inputs and durably appended
//! before the decision is handed back. A failed append fails the whole
//! decision call; no access is granted on a lost audit record.

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use shared::domain::entities::{AccessLog, AuditLogFilter, NewAccessLog};
use shared::domain::repositories::AccessLogRepository;
use shared::AppResult;

use crate::attributes::{AccessContext, AttributeBags};
use crate::engine::Arbitration;

/// Persists decision records through the access log repository.
pub struct AuditWriter {
    access_logs: Arc<dyn AccessLogRepository>,
}

impl AuditWriter {
    /// Create a writer over the access log store.
    pub fn new(access_logs: Arc<dyn AccessLogRepository>) -> Self {
        Self { access_logs }
    }

    /// Append one decision record.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn record(
        &self,
        subject_id: Uuid,
        action: &str,
        resource_type: &str,
        resource_id: Option<i64>,
        context: Option<&AccessContext>,
        bags: &AttributeBags,
        outcome: &Arbitration,
        evaluation_time_ms: i64,
    ) -> AppResult<AccessLog> {
        let log = NewAccessLog {
            user_id: subject_id,
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            resource_id,
            decision: outcome.decision.to_string(),
            policy_id: outcome.matched.as_ref().map(|policy| policy.id),
            user_attributes: Some(Value::Object(bags.subject.clone())),
            resource_attributes: Some(Value::Object(bags.resource.clone())),
            environment_attributes: Some(Value::Object(bags.environment.clone())),
            evaluated_policies: outcome.evaluated.clone(),
            evaluation_time_ms,
            reason: outcome.reason.clone(),
            ip_address: context.and_then(|c| c.ip_address.clone()),
            user_agent: context.and_then(|c| c.user_agent.clone()),
            endpoint: context.and_then(|c| c.endpoint.clone()),
        };

        self.access_logs.append(log).await
    }

    /// List decision records newest-first.
    pub async fn list(&self, filter: AuditLogFilter) -> AppResult<Vec<AccessLog>> {
        self.access_logs.list(filter).await
    }
}
