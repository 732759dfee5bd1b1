//! Test support: fixtures and in-memory repository fakes.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use shared::domain::entities::{
    AccessLog, AuditLogFilter, CreatePolicy, NewAccessLog, Policy, PolicyEffect, PolicyFilter,
    PolicyTemplate, ResourceAttribute, Subject, SubjectProfile, UpdatePolicy,
    UpdateSubjectProfile,
};
use shared::domain::repositories::{
    AccessLogRepository, PolicyRepository, PolicyTemplateRepository,
    ResourceAttributeRepository, SubjectProfileRepository,
};
use shared::{AppError, AppResult};

/// Build a subject with the given primary role and role set.
pub fn subject_fixture(role: &str, roles: &[&str]) -> Subject {
    Subject {
        id: Uuid::new_v4(),
        email: format!("{role}@example.com"),
        username: role.to_string(),
        role: role.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        is_active: true,
        is_superuser: false,
    }
}

/// Build a profile in department 1 / division 1.
pub fn profile_fixture(subject_id: Uuid) -> SubjectProfile {
    let now = Utc::now();
    SubjectProfile {
        subject_id,
        department_id: Some(1),
        division_id: Some(1),
        team_id: None,
        job_title: Some("Analyst".to_string()),
        job_level: Some(3),
        cost_center: None,
        approval_limit_amount: Some(10_000),
        can_approve_own_department: false,
        can_approve_all_departments: false,
        office_location: None,
        country_code: Some("US".to_string()),
        timezone: None,
        custom_attributes: None,
        created_at: now,
        updated_at: now,
    }
}

/// Build an active, unconditional allow policy.
pub fn policy_fixture(name: &str, action: &str, resource_type: &str, priority: i32) -> Policy {
    Policy {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        effect: PolicyEffect::Allow,
        priority,
        action: action.to_string(),
        resource_type: resource_type.to_string(),
        conditions: None,
        department_ids: None,
        division_ids: None,
        role_requirements: None,
        is_active: true,
        created_by: None,
        created_at: Utc::now(),
        updated_at: None,
    }
}

/// In-memory policy store.
#[derive(Default)]
pub struct FakePolicyRepository {
    policies: Mutex<Vec<Policy>>,
}

impl FakePolicyRepository {
    /// Build a store seeded with the given policies.
    pub fn with_policies(policies: Vec<Policy>) -> Self {
        Self {
            policies: Mutex::new(policies),
        }
    }
}

#[async_trait]
impl PolicyRepository for FakePolicyRepository {
    async fn list(&self, filter: PolicyFilter) -> AppResult<Vec<Policy>> {
        let mut rows: Vec<Policy> = self
            .policies
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                filter
                    .resource_type
                    .as_deref()
                    .is_none_or(|rt| p.resource_type == rt)
                    && filter.action.as_deref().is_none_or(|a| p.action == a)
                    && filter.is_active.is_none_or(|active| p.is_active == active)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Policy>> {
        Ok(self
            .policies
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Policy>> {
        Ok(self
            .policies
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn find_candidates(
        &self,
        action: &str,
        resource_type: &str,
    ) -> AppResult<Vec<Policy>> {
        let mut rows: Vec<Policy> = self
            .policies
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                p.is_active
                    && (p.action == action || p.action == "*")
                    && (p.resource_type == resource_type || p.resource_type == "*")
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn create(&self, policy: CreatePolicy, created_by: Uuid) -> AppResult<Policy> {
        let mut rows = self.policies.lock().unwrap();
        if rows.iter().any(|p| p.name == policy.name) {
            return Err(AppError::Conflict(format!(
                "Policy '{}' already exists",
                policy.name
            )));
        }
        let row = Policy {
            id: Uuid::new_v4(),
            name: policy.name,
            description: policy.description,
            effect: policy.effect,
            priority: policy.priority,
            action: policy.action,
            resource_type: policy.resource_type,
            conditions: policy.conditions,
            department_ids: policy.department_ids,
            division_ids: policy.division_ids,
            role_requirements: policy.role_requirements,
            is_active: true,
            created_by: Some(created_by),
            created_at: Utc::now(),
            updated_at: None,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, update: UpdatePolicy) -> AppResult<Policy> {
        let mut rows = self.policies.lock().unwrap();
        if let Some(new_name) = &update.name {
            if rows.iter().any(|p| p.name == *new_name && p.id != id) {
                return Err(AppError::Conflict(format!(
                    "Policy '{}' already exists",
                    new_name
                )));
            }
        }
        let row = rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Policy {} not found", id)))?;
        if let Some(name) = update.name {
            row.name = name;
        }
        if let Some(description) = update.description {
            row.description = Some(description);
        }
        if let Some(effect) = update.effect {
            row.effect = effect;
        }
        if let Some(priority) = update.priority {
            row.priority = priority;
        }
        if let Some(conditions) = update.conditions {
            row.conditions = Some(conditions);
        }
        if let Some(department_ids) = update.department_ids {
            row.department_ids = Some(department_ids);
        }
        if let Some(division_ids) = update.division_ids {
            row.division_ids = Some(division_ids);
        }
        if let Some(role_requirements) = update.role_requirements {
            row.role_requirements = Some(role_requirements);
        }
        if let Some(is_active) = update.is_active {
            row.is_active = is_active;
        }
        row.updated_at = Some(Utc::now());
        Ok(row.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut rows = self.policies.lock().unwrap();
        let before = rows.len();
        rows.retain(|p| p.id != id);
        if rows.len() == before {
            return Err(AppError::NotFound(format!("Policy {} not found", id)));
        }
        Ok(())
    }
}

/// In-memory subject profile store.
#[derive(Default)]
pub struct FakeProfileRepository {
    profiles: Mutex<HashMap<Uuid, SubjectProfile>>,
}

impl FakeProfileRepository {
    /// Build a store seeded with the given profiles.
    pub fn with_profiles(profiles: Vec<SubjectProfile>) -> Self {
        Self {
            profiles: Mutex::new(
                profiles
                    .into_iter()
                    .map(|p| (p.subject_id, p))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl SubjectProfileRepository for FakeProfileRepository {
    async fn find_by_subject(&self, subject_id: Uuid) -> AppResult<Option<SubjectProfile>> {
        Ok(self.profiles.lock().unwrap().get(&subject_id).cloned())
    }

    async fn upsert(
        &self,
        subject_id: Uuid,
        update: UpdateSubjectProfile,
    ) -> AppResult<SubjectProfile> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.entry(subject_id).or_insert_with(|| SubjectProfile {
            subject_id,
            department_id: None,
            division_id: None,
            team_id: None,
            job_title: None,
            job_level: None,
            cost_center: None,
            approval_limit_amount: None,
            can_approve_own_department: false,
            can_approve_all_departments: false,
            office_location: None,
            country_code: None,
            timezone: None,
            custom_attributes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });

        if update.department_id.is_some() {
            profile.department_id = update.department_id;
        }
        if update.division_id.is_some() {
            profile.division_id = update.division_id;
        }
        if update.team_id.is_some() {
            profile.team_id = update.team_id;
        }
        if update.job_title.is_some() {
            profile.job_title = update.job_title;
        }
        if update.job_level.is_some() {
            profile.job_level = update.job_level;
        }
        if update.cost_center.is_some() {
            profile.cost_center = update.cost_center;
        }
        if update.approval_limit_amount.is_some() {
            profile.approval_limit_amount = update.approval_limit_amount;
        }
        if let Some(flag) = update.can_approve_own_department {
            profile.can_approve_own_department = flag;
        }
        if let Some(flag) = update.can_approve_all_departments {
            profile.can_approve_all_departments = flag;
        }
        if update.office_location.is_some() {
            profile.office_location = update.office_location;
        }
        if update.country_code.is_some() {
            profile.country_code = update.country_code;
        }
        if update.timezone.is_some() {
            profile.timezone = update.timezone;
        }
        if update.custom_attributes.is_some() {
            profile.custom_attributes = update.custom_attributes;
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }
}

/// In-memory dynamic resource attribute store.
#[derive(Default)]
pub struct FakeResourceAttributeRepository {
    rows: Mutex<Vec<ResourceAttribute>>,
}

impl FakeResourceAttributeRepository {
    /// Build a store seeded with the given rows.
    pub fn with_rows(rows: Vec<ResourceAttribute>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }
}

#[async_trait]
impl ResourceAttributeRepository for FakeResourceAttributeRepository {
    async fn list_for(
        &self,
        resource_type: &str,
        resource_id: i64,
    ) -> AppResult<Vec<ResourceAttribute>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.resource_type == resource_type && r.resource_id == resource_id)
            .cloned()
            .collect())
    }
}

/// In-memory access log. `fail_next_append` simulates an audit commit
/// failure for the no-audit-no-decision contract.
#[derive(Default)]
pub struct FakeAccessLogRepository {
    logs: Mutex<Vec<AccessLog>>,
    fail_next_append: AtomicBool,
}

impl FakeAccessLogRepository {
    /// Make the next append fail with an internal error.
    pub fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::SeqCst);
    }

    /// Snapshot the appended records.
    pub fn records(&self) -> Vec<AccessLog> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccessLogRepository for FakeAccessLogRepository {
    async fn append(&self, log: NewAccessLog) -> AppResult<AccessLog> {
        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            return Err(AppError::Internal("audit write failed".to_string()));
        }
        let record = AccessLog {
            id: Uuid::new_v4(),
            user_id: log.user_id,
            action: log.action,
            resource_type: log.resource_type,
            resource_id: log.resource_id,
            decision: log.decision,
            policy_id: log.policy_id,
            user_attributes: log.user_attributes,
            resource_attributes: log.resource_attributes,
            environment_attributes: log.environment_attributes,
            evaluated_policies: Some(log.evaluated_policies),
            evaluation_time_ms: Some(log.evaluation_time_ms),
            reason: Some(log.reason),
            ip_address: log.ip_address,
            user_agent: log.user_agent,
            endpoint: log.endpoint,
            created_at: Utc::now(),
        };
        self.logs.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list(&self, filter: AuditLogFilter) -> AppResult<Vec<AccessLog>> {
        let mut rows: Vec<AccessLog> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| {
                filter.user_id.is_none_or(|id| log.user_id == id)
                    && filter
                        .resource_type
                        .as_deref()
                        .is_none_or(|rt| log.resource_type == rt)
                    && filter.action.as_deref().is_none_or(|a| log.action == a)
                    && filter
                        .decision
                        .as_deref()
                        .is_none_or(|d| log.decision == d)
            })
            .cloned()
            .collect();
        rows.reverse();
        let limit = if filter.limit == 0 { 1000 } else { filter.limit as usize };
        rows.truncate(limit.min(1000));
        Ok(rows)
    }
}

/// In-memory policy template store.
#[derive(Default)]
pub struct FakeTemplateRepository {
    templates: Mutex<Vec<PolicyTemplate>>,
}

impl FakeTemplateRepository {
    /// Build a store seeded with the given templates.
    pub fn with_templates(templates: Vec<PolicyTemplate>) -> Self {
        Self {
            templates: Mutex::new(templates),
        }
    }
}

#[async_trait]
impl PolicyTemplateRepository for FakeTemplateRepository {
    async fn list(&self, category: Option<&str>) -> AppResult<Vec<PolicyTemplate>> {
        Ok(self
            .templates
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.is_active && category.is_none_or(|c| t.category.as_deref() == Some(c)))
            .cloned()
            .collect())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<PolicyTemplate>> {
        Ok(self
            .templates
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.name == name)
            .cloned())
    }
}
