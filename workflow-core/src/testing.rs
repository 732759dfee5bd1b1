//! Test support: fixtures and an in-memory workflow repository fake that
//! mirrors the transactional replace semantics of the SQL implementation.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use shared::domain::entities::{
    CompiledWorkflow, ConditionalRoute, NewWorkflow, Subject, SubjectProfile,
    UpdateSubjectProfile, WorkflowDefinition, WorkflowFilter, WorkflowStage, WorkflowStatus,
    WorkflowVersion,
};
use shared::domain::repositories::{SubjectProfileRepository, WorkflowRepository};
use shared::{AppError, AppResult};

/// Build a subject carrying the given role set.
pub fn subject_with_roles(roles: &[&str]) -> Subject {
    Subject {
        id: Uuid::new_v4(),
        email: "user@example.com".to_string(),
        username: "user".to_string(),
        role: roles.first().copied().unwrap_or("employee").to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        is_active: true,
        is_superuser: false,
    }
}

/// Build a profile pinned to a department.
pub fn profile_in_department(subject_id: Uuid, department_id: i64) -> SubjectProfile {
    let now = Utc::now();
    SubjectProfile {
        subject_id,
        department_id: Some(department_id),
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
        created_at: now,
        updated_at: now,
    }
}

/// Build a draft workflow definition and customize it.
pub fn workflow_fixture<F>(modifier: F) -> WorkflowDefinition
where
    F: FnOnce(&mut WorkflowDefinition),
{
    let now = Utc::now();
    let mut workflow = WorkflowDefinition {
        id: Uuid::new_v4(),
        name: "Invoice Approval".to_string(),
        model_name: "Invoice".to_string(),
        workflow_graph: linear_graph(),
        version: 1,
        status: WorkflowStatus::Draft,
        created_by: None,
        department_id: None,
        division_id: None,
        view_roles: vec![],
        edit_roles: vec![],
        use_roles: vec![],
        published_at: None,
        created_at: now,
        updated_at: now,
    };
    modifier(&mut workflow);
    workflow
}

/// A minimal start → approval → end graph document.
pub fn linear_graph() -> Value {
    json!({
        "nodes": [
            {"id": "start", "type": "start", "position": {"x": 100.0, "y": 200.0}},
            {"id": "approval", "type": "approval",
             "position": {"x": 300.0, "y": 200.0},
             "data": {"required_role": "hr"}},
            {"id": "end", "type": "end", "position": {"x": 500.0, "y": 200.0}}
        ],
        "edges": [
            {"id": "e1", "source": "start", "target": "approval"},
            {"id": "e2", "source": "approval", "target": "end"}
        ],
        "viewport": {"x": 0, "y": 0, "zoom": 1}
    })
}

/// A richer approval graph with full stage configuration.
pub fn approval_graph() -> Value {
    json!({
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "approval", "type": "approval",
             "data": {"required_role": "hr", "sla_hours": 48,
                      "approval_type": "sequential", "required_count": 1}},
            {"id": "notify", "type": "notification",
             "data": {"notification_template": "approval-done"}},
            {"id": "end", "type": "end"}
        ],
        "edges": [
            {"id": "e1", "source": "start", "target": "approval"},
            {"id": "e2", "source": "approval", "target": "notify"},
            {"id": "e3", "source": "notify", "target": "end"}
        ]
    })
}

/// An approval graph whose approval stage names no approver.
pub fn incomplete_approval_graph() -> Value {
    json!({
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "approval", "type": "approval", "data": {}},
            {"id": "end", "type": "end"}
        ],
        "edges": [
            {"id": "e1", "source": "start", "target": "approval"},
            {"id": "e2", "source": "approval", "target": "end"}
        ]
    })
}

/// In-memory workflow store with the same atomic-replace behavior as the
/// PostgreSQL repository.
#[derive(Default)]
pub struct FakeWorkflowRepository {
    definitions: Mutex<Vec<WorkflowDefinition>>,
    stages: Mutex<HashMap<Uuid, Vec<WorkflowStage>>>,
    routes: Mutex<HashMap<Uuid, Vec<ConditionalRoute>>>,
    versions: Mutex<Vec<WorkflowVersion>>,
}

impl FakeWorkflowRepository {
    /// Seed the store with an existing definition and its compiled form.
    pub fn with_workflow(workflow: WorkflowDefinition, compiled: CompiledWorkflow) -> Self {
        let store = Self::default();
        let id = workflow.id;
        store.definitions.lock().unwrap().push(workflow);
        store.install_derived(id, &compiled);
        store
    }

    fn install_derived(&self, workflow_id: Uuid, compiled: &CompiledWorkflow) {
        let now = Utc::now();
        let mut ids: HashMap<&str, Uuid> = HashMap::new();
        let mut rows: Vec<WorkflowStage> = compiled
            .stages
            .iter()
            .map(|stage| {
                let id = Uuid::new_v4();
                ids.insert(stage.node_id.as_str(), id);
                WorkflowStage {
                    id,
                    workflow_id,
                    node_id: stage.node_id.clone(),
                    node_type: stage.node_type,
                    order_index: stage.order_index,
                    required_role: stage.required_role.clone(),
                    required_roles: stage.required_roles.clone(),
                    specific_users: stage.specific_users.clone(),
                    approval_type: stage.approval_type,
                    required_count: stage.required_count,
                    condition_config: stage.condition_config.clone(),
                    sla_hours: stage.sla_hours,
                    escalation_config: stage.escalation_config.clone(),
                    notification_template: stage.notification_template.clone(),
                    action_hook: stage.action_hook.clone(),
                    position_x: stage.position_x,
                    position_y: stage.position_y,
                    next_stage_id: None,
                    created_at: now,
                }
            })
            .collect();

        for (row, stage) in rows.iter_mut().zip(&compiled.stages) {
            row.next_stage_id = stage
                .next_node_id
                .as_deref()
                .and_then(|node| ids.get(node).copied());
        }

        let route_rows: Vec<ConditionalRoute> = compiled
            .routes
            .iter()
            .filter_map(|route| {
                let from = ids.get(route.from_node_id.as_str())?;
                let to = ids.get(route.to_node_id.as_str())?;
                Some(ConditionalRoute {
                    id: Uuid::new_v4(),
                    from_stage_id: *from,
                    to_stage_id: *to,
                    label: route.label.clone(),
                    condition_field: route.condition_field.clone(),
                    operator: route.operator.clone(),
                    condition_value: route.condition_value.clone(),
                    priority: route.priority,
                    created_at: now,
                })
            })
            .collect();

        self.stages.lock().unwrap().insert(workflow_id, rows);
        self.routes.lock().unwrap().insert(workflow_id, route_rows);
    }
}

#[async_trait]
impl WorkflowRepository for FakeWorkflowRepository {
    async fn create(
        &self,
        workflow: NewWorkflow,
        compiled: CompiledWorkflow,
    ) -> AppResult<WorkflowDefinition> {
        {
            let definitions = self.definitions.lock().unwrap();
            if definitions.iter().any(|w| w.name == workflow.name) {
                return Err(AppError::Conflict(format!(
                    "Workflow '{}' already exists",
                    workflow.name
                )));
            }
        }

        let now = Utc::now();
        let row = WorkflowDefinition {
            id: Uuid::new_v4(),
            name: workflow.name,
            model_name: workflow.model_name,
            workflow_graph: workflow.workflow_graph,
            version: 1,
            status: WorkflowStatus::Draft,
            created_by: workflow.created_by,
            department_id: workflow.department_id,
            division_id: workflow.division_id,
            view_roles: workflow.view_roles,
            edit_roles: workflow.edit_roles,
            use_roles: workflow.use_roles,
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        self.install_derived(row.id, &compiled);
        self.definitions.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<WorkflowDefinition>> {
        Ok(self
            .definitions
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id == id)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<WorkflowDefinition>> {
        Ok(self
            .definitions
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.name == name)
            .cloned())
    }

    async fn list(&self, filter: WorkflowFilter) -> AppResult<Vec<WorkflowDefinition>> {
        Ok(self
            .definitions
            .lock()
            .unwrap()
            .iter()
            .filter(|w| {
                filter.status.is_none_or(|status| w.status == status)
                    && filter
                        .department_id
                        .is_none_or(|dept| w.department_id == Some(dept))
            })
            .cloned()
            .collect())
    }

    async fn save_graph(
        &self,
        id: Uuid,
        graph: Value,
        compiled: CompiledWorkflow,
        change_description: Option<String>,
        edited_by: Option<Uuid>,
    ) -> AppResult<WorkflowDefinition> {
        let snapshot = {
            let definitions = self.definitions.lock().unwrap();
            let current = definitions
                .iter()
                .find(|w| w.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Workflow {} not found", id)))?;
            WorkflowVersion {
                id: Uuid::new_v4(),
                workflow_id: id,
                version_number: current.version,
                workflow_graph: current.workflow_graph.clone(),
                change_description,
                created_by: edited_by,
                created_at: Utc::now(),
            }
        };
        self.versions.lock().unwrap().push(snapshot);

        self.install_derived(id, &compiled);

        let mut definitions = self.definitions.lock().unwrap();
        let current = definitions
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Workflow {} not found", id)))?;
        current.workflow_graph = graph;
        current.version += 1;
        current.updated_at = Utc::now();
        Ok(current.clone())
    }

    async fn mark_published(&self, id: Uuid) -> AppResult<WorkflowDefinition> {
        let mut definitions = self.definitions.lock().unwrap();
        let current = definitions
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Workflow {} not found", id)))?;
        current.status = WorkflowStatus::Active;
        if current.published_at.is_none() {
            current.published_at = Some(Utc::now());
        }
        current.updated_at = Utc::now();
        Ok(current.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut definitions = self.definitions.lock().unwrap();
        let before = definitions.len();
        definitions.retain(|w| w.id != id);
        if definitions.len() == before {
            return Err(AppError::NotFound(format!("Workflow {} not found", id)));
        }
        self.stages.lock().unwrap().remove(&id);
        self.routes.lock().unwrap().remove(&id);
        self.versions.lock().unwrap().retain(|v| v.workflow_id != id);
        Ok(())
    }

    async fn list_versions(&self, workflow_id: Uuid) -> AppResult<Vec<WorkflowVersion>> {
        let mut rows: Vec<WorkflowVersion> = self
            .versions
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.workflow_id == workflow_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(rows)
    }

    async fn stages_for(&self, workflow_id: Uuid) -> AppResult<Vec<WorkflowStage>> {
        Ok(self
            .stages
            .lock()
            .unwrap()
            .get(&workflow_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn routes_for(&self, workflow_id: Uuid) -> AppResult<Vec<ConditionalRoute>> {
        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(&workflow_id)
            .cloned()
            .unwrap_or_default())
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
            profiles: Mutex::new(profiles.into_iter().map(|p| (p.subject_id, p)).collect()),
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
        _update: UpdateSubjectProfile,
    ) -> AppResult<SubjectProfile> {
        self.profiles
            .lock()
            .unwrap()
            .get(&subject_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No profile for subject {}", subject_id)))
    }
}
