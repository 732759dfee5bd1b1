//! The policy decision engine.
//!
//! Arbitration scans candidates in priority order. The first matching
//! deny stops the scan; a matching allow is recorded and the scan
//! continues, so an equal-or-lower-priority deny still overrides it.
//! With no match the decision defaults to deny.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use shared::domain::entities::{
    AccessLog, AuditLogFilter, CreatePolicy, Policy, PolicyEffect, PolicyFilter, Subject,
    UpdatePolicy,
};
use shared::domain::repositories::{
    AccessLogRepository, PolicyRepository, ResourceAttributeRepository,
    SubjectProfileRepository,
};
use shared::{AppError, AppResult};

use crate::attributes::{AccessContext, AttributeBags, AttributeResolver};
use crate::audit::AuditWriter;
use crate::conditions;
use crate::matcher;

/// One authorization request.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    /// Requested action.
    pub action: String,
    /// Requested resource type.
    pub resource_type: String,
    /// Resource instance id, when addressing one.
    pub resource_id: Option<i64>,
    /// Live resource object to lift attributes from.
    pub resource_object: Option<Value>,
    /// Request metadata.
    pub context: Option<AccessContext>,
}

impl AccessRequest {
    /// Build a request addressing a resource type without an instance.
    pub fn new(action: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            resource_object: None,
            context: None,
        }
    }

    /// Address a specific resource instance.
    pub fn with_resource_id(mut self, resource_id: i64) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    /// Supply a live resource object.
    pub fn with_resource_object(mut self, object: Value) -> Self {
        self.resource_object = Some(object);
        self
    }

    /// Supply request metadata.
    pub fn with_context(mut self, context: AccessContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// The decision triple returned to collaborators.
#[derive(Debug, Clone)]
pub struct AccessDecision {
    /// Whether access is granted.
    pub allowed: bool,
    /// Human-readable reason, also captured in the audit trail.
    pub reason: String,
    /// The policy that determined the decision, if any matched.
    pub policy: Option<Policy>,
}

/// Outcome of arbitrating one candidate set.
#[derive(Debug, Clone)]
pub(crate) struct Arbitration {
    /// Final effect; deny unless an allow matched and survived.
    pub decision: PolicyEffect,
    /// Decision reason.
    pub reason: String,
    /// The policy that produced the decision.
    pub matched: Option<Policy>,
    /// Every candidate evaluated, in order.
    pub evaluated: Vec<Uuid>,
}

/// A combined role/ABAC gate check.
#[derive(Debug, Clone, Default)]
pub struct HybridCheck {
    /// Roles of which the subject must hold at least one.
    pub required_roles: Option<Vec<String>>,
    /// ABAC action to check, together with `resource_type`.
    pub action: Option<String>,
    /// ABAC resource type to check.
    pub resource_type: Option<String>,
    /// Resource instance for the ABAC check.
    pub resource_id: Option<i64>,
    /// Request metadata for the ABAC check.
    pub context: Option<AccessContext>,
    /// When true every supplied check must pass; otherwise one suffices.
    pub require_all: bool,
}

/// Attribute-based access-control decision engine.
pub struct PolicyEngine {
    policies: Arc<dyn PolicyRepository>,
    profiles: Arc<dyn SubjectProfileRepository>,
    resolver: AttributeResolver,
    audit: AuditWriter,
}

impl PolicyEngine {
    /// Wire the engine over its stores.
    pub fn new(
        policies: Arc<dyn PolicyRepository>,
        profiles: Arc<dyn SubjectProfileRepository>,
        resource_attributes: Arc<dyn ResourceAttributeRepository>,
        access_logs: Arc<dyn AccessLogRepository>,
    ) -> Self {
        Self {
            policies,
            profiles,
            resolver: AttributeResolver::new(resource_attributes),
            audit: AuditWriter::new(access_logs),
        }
    }

    /// Evaluate policies for a request and return the decision triple.
    ///
    /// A deny decision is a normal return value. The call fails only on
    /// infrastructure errors, including a failed audit append: the
    /// decision is returned strictly after its audit record committed.
    pub async fn check_access(
        &self,
        subject: &Subject,
        request: AccessRequest,
    ) -> AppResult<AccessDecision> {
        let started = Instant::now();

        let profile = self.profiles.find_by_subject(subject.id).await?;
        let bags = self
            .resolver
            .resolve(
                subject,
                profile.as_ref(),
                &request.resource_type,
                request.resource_id,
                request.resource_object.as_ref(),
                request.context.as_ref(),
            )
            .await?;

        let fetched = self
            .policies
            .find_candidates(&request.action, &request.resource_type)
            .await?;
        let candidates = matcher::filter_candidates(
            fetched,
            &request.action,
            &request.resource_type,
            subject,
            profile.as_ref(),
        );

        let outcome = arbitrate(&candidates, &bags);
        let evaluation_time_ms = started.elapsed().as_millis() as i64;

        self.audit
            .record(
                subject.id,
                &request.action,
                &request.resource_type,
                request.resource_id,
                request.context.as_ref(),
                &bags,
                &outcome,
                evaluation_time_ms,
            )
            .await?;

        debug!(
            subject = %subject.id,
            action = %request.action,
            resource_type = %request.resource_type,
            decision = %outcome.decision,
            evaluated = outcome.evaluated.len(),
            elapsed_ms = evaluation_time_ms,
            "Access decision"
        );

        Ok(AccessDecision {
            allowed: outcome.decision == PolicyEffect::Allow,
            reason: outcome.reason,
            policy: outcome.matched,
        })
    }

    /// Request-scoped enforcement adapter: converts a deny decision into
    /// an authorization error carrying the matched-policy reason.
    pub async fn enforce(
        &self,
        subject: &Subject,
        request: AccessRequest,
    ) -> AppResult<AccessDecision> {
        let decision = self.check_access(subject, request).await?;
        if decision.allowed {
            Ok(decision)
        } else {
            Err(AppError::Authorization(decision.reason))
        }
    }

    /// Combined role/ABAC gate. Each supplied check contributes a vote;
    /// `require_all` selects conjunction over disjunction.
    pub async fn evaluate_hybrid(
        &self,
        subject: &Subject,
        check: HybridCheck,
    ) -> AppResult<bool> {
        let mut results = Vec::new();

        if let Some(roles) = &check.required_roles {
            results.push(subject.has_any_role(roles));
        }

        if let (Some(action), Some(resource_type)) = (&check.action, &check.resource_type) {
            let mut request = AccessRequest::new(action.clone(), resource_type.clone());
            request.resource_id = check.resource_id;
            request.context = check.context.clone();
            results.push(self.check_access(subject, request).await?.allowed);
        }

        Ok(if check.require_all {
            results.iter().all(|passed| *passed)
        } else {
            results.iter().any(|passed| *passed)
        })
    }

    /// List policies matching the filter.
    pub async fn list_policies(&self, filter: PolicyFilter) -> AppResult<Vec<Policy>> {
        self.policies.list(filter).await
    }

    /// Create a policy; the name must be unique.
    pub async fn create_policy(
        &self,
        subject: &Subject,
        policy: CreatePolicy,
    ) -> AppResult<Policy> {
        if policy.name.is_empty() {
            return Err(AppError::Validation("Policy name must not be empty".to_string()));
        }
        if self.policies.find_by_name(&policy.name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Policy '{}' already exists",
                policy.name
            )));
        }
        self.policies.create(policy, subject.id).await
    }

    /// Apply a partial update to a policy.
    pub async fn update_policy(&self, id: Uuid, update: UpdatePolicy) -> AppResult<Policy> {
        if let Some(new_name) = &update.name {
            if let Some(existing) = self.policies.find_by_name(new_name).await? {
                if existing.id != id {
                    return Err(AppError::Conflict(format!(
                        "Policy '{}' already exists",
                        new_name
                    )));
                }
            }
        }
        self.policies.update(id, update).await
    }

    /// Delete a policy by id.
    pub async fn delete_policy(&self, id: Uuid) -> AppResult<()> {
        self.policies.delete(id).await
    }

    /// List audit records newest-first.
    pub async fn list_audit(&self, filter: AuditLogFilter) -> AppResult<Vec<AccessLog>> {
        self.audit.list(filter).await
    }
}

/// Arbitrate an ordered candidate set against the bags.
pub(crate) fn arbitrate(candidates: &[Policy], bags: &AttributeBags) -> Arbitration {
    let mut outcome = Arbitration {
        decision: PolicyEffect::Deny,
        reason: "No matching policy found".to_string(),
        matched: None,
        evaluated: Vec::with_capacity(candidates.len()),
    };

    for policy in candidates {
        outcome.evaluated.push(policy.id);

        if !conditions::evaluate_policy_conditions(policy.conditions.as_ref(), bags) {
            continue;
        }

        // Deny overrides: stop immediately.
        if policy.effect == PolicyEffect::Deny {
            outcome.decision = PolicyEffect::Deny;
            outcome.reason = format!("Policy '{}' matched", policy.name);
            outcome.matched = Some(policy.clone());
            break;
        }

        // First (highest-priority) allow wins the record; the scan keeps
        // going only so a later deny can still override.
        if outcome.matched.is_none() {
            outcome.decision = PolicyEffect::Allow;
            outcome.reason = format!("Policy '{}' matched", policy.name);
            outcome.matched = Some(policy.clone());
        }
    }

    outcome
}
