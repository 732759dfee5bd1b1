//! Workflow authoring service.
//!
//! Every operation runs the visibility gate first, then the structural
//! validator; saves compile the graph and hand the projection to the
//! repository's atomic replace. Publishing additionally requires
//! completeness: every approval stage must name at least one approver
//! source.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use serde_json::Value;
use shared::domain::entities::{
    NewWorkflow, StageNodeType, Subject, WorkflowDefinition, WorkflowFilter, WorkflowStage,
    WorkflowVersion,
};
use shared::domain::repositories::{SubjectProfileRepository, WorkflowRepository};
use shared::{AppError, AppResult};

use crate::compiler;
use crate::graph;
use crate::visibility;

/// Save request: a new definition when `workflow_id` is absent, an edit
/// of an existing one otherwise.
#[derive(Debug, Clone)]
pub struct SaveGraphRequest {
    /// Existing definition to update, or `None` to create.
    pub workflow_id: Option<Uuid>,
    /// Unique name; required when creating.
    pub name: Option<String>,
    /// Routed business model; required when creating.
    pub model_name: Option<String>,
    /// The graph document to save.
    pub graph: Value,
    /// Change description stored with the version snapshot.
    pub change_description: Option<String>,
    /// Owning department for a new definition.
    pub department_id: Option<i64>,
    /// Owning division for a new definition.
    pub division_id: Option<i64>,
    /// View role list for a new definition.
    pub view_roles: Vec<String>,
    /// Edit role list for a new definition.
    pub edit_roles: Vec<String>,
    /// Use role list for a new definition.
    pub use_roles: Vec<String>,
}

impl SaveGraphRequest {
    /// Build an update request for an existing definition.
    pub fn update(workflow_id: Uuid, graph: Value) -> Self {
        Self {
            workflow_id: Some(workflow_id),
            name: None,
            model_name: None,
            graph,
            change_description: None,
            department_id: None,
            division_id: None,
            view_roles: vec![],
            edit_roles: vec![],
            use_roles: vec![],
        }
    }

    /// Build a creation request.
    pub fn create(name: impl Into<String>, model_name: impl Into<String>, graph: Value) -> Self {
        Self {
            workflow_id: None,
            name: Some(name.into()),
            model_name: Some(model_name.into()),
            graph,
            change_description: None,
            department_id: None,
            division_id: None,
            view_roles: vec![],
            edit_roles: vec![],
            use_roles: vec![],
        }
    }

    /// Attach a change description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.change_description = Some(description.into());
        self
    }
}

/// Authoring operations over workflow definitions.
pub struct VisualWorkflowService {
    workflows: Arc<dyn WorkflowRepository>,
    profiles: Arc<dyn SubjectProfileRepository>,
}

impl VisualWorkflowService {
    /// Wire the service over its stores.
    pub fn new(
        workflows: Arc<dyn WorkflowRepository>,
        profiles: Arc<dyn SubjectProfileRepository>,
    ) -> Self {
        Self {
            workflows,
            profiles,
        }
    }

    /// List the definitions visible to the subject.
    pub async fn list_workflows(
        &self,
        subject: &Subject,
        filter: WorkflowFilter,
    ) -> AppResult<Vec<WorkflowDefinition>> {
        let profile = self.profiles.find_by_subject(subject.id).await?;
        let rows = self.workflows.list(filter).await?;
        Ok(rows
            .into_iter()
            .filter(|workflow| visibility::can_view(subject, profile.as_ref(), workflow))
            .collect())
    }

    /// Fetch one definition if the subject may view it.
    pub async fn get_workflow(
        &self,
        subject: &Subject,
        id: Uuid,
    ) -> AppResult<WorkflowDefinition> {
        let workflow = self.fetch(id).await?;
        let profile = self.profiles.find_by_subject(subject.id).await?;
        if !visibility::can_view(subject, profile.as_ref(), &workflow) {
            return Err(AppError::Authorization(
                "You do not have permission to view this workflow".to_string(),
            ));
        }
        Ok(workflow)
    }

    /// Validate, compile and save a graph; creates a new DRAFT definition
    /// or a new version of an existing one.
    pub async fn save_workflow_graph(
        &self,
        subject: &Subject,
        request: SaveGraphRequest,
    ) -> AppResult<WorkflowDefinition> {
        let validated = graph::validate_graph(&request.graph)?;
        let compiled = compiler::compile(&validated.document);

        match request.workflow_id {
            Some(id) => {
                let existing = self.fetch(id).await?;
                if !visibility::can_edit(subject, &existing) {
                    return Err(AppError::Authorization(
                        "You do not have permission to edit this workflow".to_string(),
                    ));
                }

                let saved = self
                    .workflows
                    .save_graph(
                        id,
                        request.graph,
                        compiled,
                        request.change_description,
                        Some(subject.id),
                    )
                    .await?;
                info!(workflow = %saved.id, version = saved.version, "Workflow graph saved");
                Ok(saved)
            }
            None => {
                let name = request.name.clone().ok_or_else(|| {
                    AppError::Validation("A new workflow requires a name".to_string())
                })?;
                let model_name = request.model_name.clone().ok_or_else(|| {
                    AppError::Validation("A new workflow requires a model name".to_string())
                })?;
                if self.workflows.find_by_name(&name).await?.is_some() {
                    return Err(AppError::Conflict(format!(
                        "Workflow '{}' already exists",
                        name
                    )));
                }

                let created = self
                    .workflows
                    .create(
                        NewWorkflow {
                            name,
                            model_name,
                            workflow_graph: request.graph,
                            created_by: Some(subject.id),
                            department_id: request.department_id,
                            division_id: request.division_id,
                            view_roles: request.view_roles,
                            edit_roles: request.edit_roles,
                            use_roles: request.use_roles,
                        },
                        compiled,
                    )
                    .await?;
                info!(workflow = %created.id, "Workflow created");
                Ok(created)
            }
        }
    }

    /// Publish a definition: re-validate the stored graph, require
    /// completeness of every approval stage, then transition to ACTIVE.
    pub async fn publish_workflow(
        &self,
        subject: &Subject,
        id: Uuid,
    ) -> AppResult<WorkflowDefinition> {
        let workflow = self.fetch(id).await?;
        if !visibility::can_publish(subject, &workflow) {
            return Err(AppError::Authorization(
                "You do not have permission to publish this workflow".to_string(),
            ));
        }

        graph::validate_graph(&workflow.workflow_graph)?;

        let stages = self.workflows.stages_for(id).await?;
        let problems = completeness_diagnostics(&stages);
        if !problems.is_empty() {
            return Err(AppError::Validation(format!(
                "Workflow is not publishable: {}",
                problems.join("; ")
            )));
        }

        let published = self.workflows.mark_published(id).await?;
        info!(workflow = %published.id, "Workflow published");
        Ok(published)
    }

    /// Clone a definition into a fresh DRAFT under a new name.
    pub async fn clone_workflow(
        &self,
        subject: &Subject,
        id: Uuid,
        new_name: String,
    ) -> AppResult<WorkflowDefinition> {
        let source = self.fetch(id).await?;
        let profile = self.profiles.find_by_subject(subject.id).await?;
        if !visibility::can_view(subject, profile.as_ref(), &source) {
            return Err(AppError::Authorization(
                "You do not have permission to view this workflow".to_string(),
            ));
        }
        if self.workflows.find_by_name(&new_name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Workflow '{}' already exists",
                new_name
            )));
        }

        let validated = graph::validate_graph(&source.workflow_graph)?;
        let compiled = compiler::compile(&validated.document);

        self.workflows
            .create(
                NewWorkflow {
                    name: new_name,
                    model_name: source.model_name.clone(),
                    workflow_graph: source.workflow_graph.clone(),
                    created_by: Some(subject.id),
                    department_id: source.department_id,
                    division_id: source.division_id,
                    view_roles: source.view_roles.clone(),
                    edit_roles: source.edit_roles.clone(),
                    use_roles: source.use_roles.clone(),
                },
                compiled,
            )
            .await
    }

    /// List the version snapshots of a definition.
    pub async fn list_versions(
        &self,
        subject: &Subject,
        id: Uuid,
    ) -> AppResult<Vec<WorkflowVersion>> {
        let workflow = self.fetch(id).await?;
        let profile = self.profiles.find_by_subject(subject.id).await?;
        if !visibility::can_view(subject, profile.as_ref(), &workflow) {
            return Err(AppError::Authorization(
                "You do not have permission to view this workflow".to_string(),
            ));
        }
        self.workflows.list_versions(id).await
    }

    /// Delete a definition with its stages, routes and versions.
    pub async fn delete_workflow(
        &self,
        subject: &Subject,
        id: Uuid,
    ) -> AppResult<()> {
        let workflow = self.fetch(id).await?;
        if !visibility::can_edit(subject, &workflow) {
            return Err(AppError::Authorization(
                "You do not have permission to delete this workflow".to_string(),
            ));
        }
        self.workflows.delete(id).await
    }

    async fn fetch(&self, id: Uuid) -> AppResult<WorkflowDefinition> {
        self.workflows
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Workflow {} not found", id)))
    }
}

/// Approval stages must name an approver source before publishing.
fn completeness_diagnostics(stages: &[WorkflowStage]) -> Vec<String> {
    stages
        .iter()
        .filter(|stage| stage.node_type == StageNodeType::Approval)
        .filter(|stage| {
            stage.required_role.is_none()
                && stage
                    .required_roles
                    .as_ref()
                    .is_none_or(|roles| roles.is_empty())
                && stage
                    .specific_users
                    .as_ref()
                    .is_none_or(|users| users.is_empty())
        })
        .map(|stage| {
            format!(
                "Approval stage '{}' has no required role, role list or specific approvers",
                stage.node_id
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        approval_graph, incomplete_approval_graph, linear_graph, subject_with_roles,
        workflow_fixture, FakeProfileRepository, FakeWorkflowRepository,
    };
    use shared::domain::entities::WorkflowStatus;
    use shared::ErrorKind;

    fn service(workflows: Arc<FakeWorkflowRepository>) -> VisualWorkflowService {
        VisualWorkflowService::new(workflows, Arc::new(FakeProfileRepository::default()))
    }

    fn seeded_service(
        modifier: impl FnOnce(&mut WorkflowDefinition),
    ) -> (VisualWorkflowService, Arc<FakeWorkflowRepository>, WorkflowDefinition) {
        let workflow = workflow_fixture(modifier);
        let validated = graph::validate_graph(&workflow.workflow_graph).expect("fixture valid");
        let compiled = compiler::compile(&validated.document);
        let repo = Arc::new(FakeWorkflowRepository::with_workflow(
            workflow.clone(),
            compiled,
        ));
        (service(repo.clone()), repo, workflow)
    }

    #[tokio::test]
    async fn create_compiles_stages_with_node_ids() {
        let creator = subject_with_roles(&["manager"]);
        let repo = Arc::new(FakeWorkflowRepository::default());
        let service = service(repo.clone());

        let created = service
            .save_workflow_graph(
                &creator,
                SaveGraphRequest::create("Onboarding", "EmployeeProfile", approval_graph()),
            )
            .await
            .unwrap();

        assert_eq!(created.version, 1);
        assert_eq!(created.status, WorkflowStatus::Draft);
        let stages = repo.stages_for(created.id).await.unwrap();
        let node_ids: Vec<&str> = stages.iter().map(|s| s.node_id.as_str()).collect();
        assert_eq!(node_ids, vec!["start", "approval", "notify", "end"]);
    }

    #[tokio::test]
    async fn save_increments_version_and_snapshots_prior_graph() {
        let creator = subject_with_roles(&["manager"]);
        let (service, repo, workflow) = seeded_service(|w| {
            w.created_by = None;
            w.edit_roles = vec!["manager".to_string()];
        });
        let prior_graph = workflow.workflow_graph.clone();

        let saved = service
            .save_workflow_graph(
                &creator,
                SaveGraphRequest::update(workflow.id, approval_graph())
                    .with_description("richer approval config"),
            )
            .await
            .unwrap();

        // Version goes 1 -> 2; the snapshot holds version 1 and the
        // pre-save graph.
        assert_eq!(saved.version, 2);
        let versions = repo.list_versions(workflow.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version_number, 1);
        assert_eq!(versions[0].workflow_graph, prior_graph);
        assert_eq!(
            versions[0].change_description.as_deref(),
            Some("richer approval config")
        );

        // Stages were rebuilt from the new graph.
        let stages = repo.stages_for(workflow.id).await.unwrap();
        assert_eq!(stages.len(), 4);

        // The default-successor chain follows the edges.
        let by_node = |node: &str| {
            stages
                .iter()
                .find(|s| s.node_id == node)
                .cloned()
                .unwrap()
        };
        let start = by_node("start");
        let approval = by_node("approval");
        let end = by_node("end");
        assert_eq!(start.next_stage_id, Some(approval.id));
        assert!(end.next_stage_id.is_none());
    }

    #[tokio::test]
    async fn save_rejects_invalid_graphs_with_diagnostics() {
        let creator = subject_with_roles(&["manager"]);
        let (service, _repo, workflow) = seeded_service(|w| {
            w.edit_roles = vec!["manager".to_string()];
        });

        let err = service
            .save_workflow_graph(
                &creator,
                SaveGraphRequest::update(
                    workflow.id,
                    serde_json::json!({"nodes": [], "edges": []}),
                ),
            )
            .await
            .unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::Validation));
        assert!(err.to_string().contains("at least one node"));
    }

    #[tokio::test]
    async fn edit_gate_blocks_outsiders() {
        let outsider = subject_with_roles(&["employee"]);
        let (service, _repo, workflow) = seeded_service(|w| {
            w.created_by = Some(Uuid::new_v4());
            w.edit_roles = vec!["manager".to_string()];
        });

        let err = service
            .save_workflow_graph(
                &outsider,
                SaveGraphRequest::update(workflow.id, linear_graph()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Authorization));
    }

    #[tokio::test]
    async fn publish_sets_active_and_stamps_first_publish_only() {
        let creator = subject_with_roles(&["manager"]);
        // The manager is the creator, so the publish gate passes.
        let (service, _repo, workflow) = seeded_service(|w| w.created_by = Some(creator.id));

        let published = service.publish_workflow(&creator, workflow.id).await.unwrap();
        assert_eq!(published.status, WorkflowStatus::Active);
        let first_stamp = published.published_at.expect("published_at set");

        // Republishing keeps the original stamp.
        let republished = service.publish_workflow(&creator, workflow.id).await.unwrap();
        assert_eq!(republished.published_at, Some(first_stamp));
    }

    #[tokio::test]
    async fn publish_rejects_incomplete_approval_stages() {
        let creator = subject_with_roles(&["manager"]);
        let repo = Arc::new(FakeWorkflowRepository::default());
        let service = service(repo.clone());

        let created = service
            .save_workflow_graph(
                &creator,
                SaveGraphRequest::create(
                    "Incomplete",
                    "Invoice",
                    incomplete_approval_graph(),
                ),
            )
            .await
            .unwrap();

        let err = service.publish_workflow(&creator, created.id).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Validation));
        assert!(err.to_string().contains("Approval stage 'approval'"));
    }

    #[tokio::test]
    async fn publish_gate_requires_privileged_creator() {
        // An unprivileged creator may edit but not publish.
        let creator = subject_with_roles(&["employee"]);
        let (service, _repo, workflow) = seeded_service(|w| w.created_by = Some(creator.id));

        let err = service.publish_workflow(&creator, workflow.id).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Authorization));
    }

    #[tokio::test]
    async fn clone_creates_fresh_draft_with_unique_name() {
        let manager = subject_with_roles(&["manager"]);
        let (service, repo, workflow) = seeded_service(|w| {
            w.created_by = Some(Uuid::new_v4());
            w.view_roles = vec![];
            w.version = 4;
        });

        let clone = service
            .clone_workflow(&manager, workflow.id, "Invoice Approval (copy)".to_string())
            .await
            .unwrap();

        assert_eq!(clone.version, 1);
        assert_eq!(clone.status, WorkflowStatus::Draft);
        assert!(clone.published_at.is_none());
        assert_eq!(clone.created_by, Some(manager.id));
        assert_eq!(clone.workflow_graph, workflow.workflow_graph);
        assert_eq!(repo.stages_for(clone.id).await.unwrap().len(), 3);

        let err = service
            .clone_workflow(&manager, workflow.id, "Invoice Approval".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Conflict));
    }

    #[tokio::test]
    async fn list_filters_to_visible_definitions() {
        let subject = subject_with_roles(&["hr"]);
        let repo = Arc::new(FakeWorkflowRepository::default());
        let admin = subject_with_roles(&["admin"]);
        let service = service(repo.clone());

        for (name, view_roles) in [
            ("Open", vec![]),
            ("HR only", vec!["hr".to_string()]),
            ("Finance only", vec!["finance".to_string()]),
        ] {
            let mut request =
                SaveGraphRequest::create(name, "Invoice", linear_graph());
            request.view_roles = view_roles;
            service.save_workflow_graph(&admin, request).await.unwrap();
        }

        let visible = service
            .list_workflows(&subject, WorkflowFilter::default())
            .await
            .unwrap();
        let names: Vec<&str> = visible.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Open", "HR only"]);
    }

    #[tokio::test]
    async fn delete_removes_definition_and_derived_state() {
        let admin = subject_with_roles(&["admin"]);
        let (service, repo, workflow) = seeded_service(|w| w.created_by = None);

        service.delete_workflow(&admin, workflow.id).await.unwrap();
        assert!(repo.find_by_id(workflow.id).await.unwrap().is_none());
        assert!(repo.stages_for(workflow.id).await.unwrap().is_empty());

        let err = service.delete_workflow(&admin, workflow.id).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound));
    }

    #[test]
    fn completeness_accepts_any_approver_source() {
        use chrono::Utc;
        let stage = |modifier: fn(&mut WorkflowStage)| {
            let mut stage = WorkflowStage {
                id: Uuid::new_v4(),
                workflow_id: Uuid::new_v4(),
                node_id: "approval".to_string(),
                node_type: StageNodeType::Approval,
                order_index: 0,
                required_role: None,
                required_roles: None,
                specific_users: None,
                approval_type: None,
                required_count: None,
                condition_config: None,
                sla_hours: None,
                escalation_config: None,
                notification_template: None,
                action_hook: None,
                position_x: 0.0,
                position_y: 0.0,
                next_stage_id: None,
                created_at: Utc::now(),
            };
            modifier(&mut stage);
            stage
        };

        assert_eq!(completeness_diagnostics(&[stage(|_| {})]).len(), 1);
        assert!(completeness_diagnostics(&[stage(|s| {
            s.required_role = Some("hr".to_string())
        })])
        .is_empty());
        assert!(completeness_diagnostics(&[stage(|s| {
            s.required_roles = Some(vec!["hr".to_string()])
        })])
        .is_empty());
        assert!(completeness_diagnostics(&[stage(|s| {
            s.specific_users = Some(vec![Uuid::new_v4().to_string()])
        })])
        .is_empty());
        // An empty role list does not count as an approver source.
        assert_eq!(
            completeness_diagnostics(&[stage(|s| s.required_roles = Some(vec![]))]).len(),
            1
        );
        // Non-approval stages need no approver.
        assert!(completeness_diagnostics(&[stage(|s| {
            s.node_type = StageNodeType::Notification
        })])
        .is_empty());
    }
}
