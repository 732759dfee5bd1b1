//! Role-scoped workflow visibility.
//!
//! Four predicates gate every workflow operation: view, edit, publish
//! and use. Administrators bypass all of them; creators keep view and
//! edit over their own definitions. An empty view role list means the
//! definition is visible to everyone.

use shared::domain::entities::{Subject, SubjectProfile, WorkflowDefinition, WorkflowStatus};

/// Roles allowed to publish their own definitions.
const PUBLISH_ROLES: &[&str] = &["manager", "supervisor", "department_head"];

fn is_creator(subject: &Subject, workflow: &WorkflowDefinition) -> bool {
    workflow.created_by == Some(subject.id)
}

fn department_or_division_matches(
    profile: Option<&SubjectProfile>,
    workflow: &WorkflowDefinition,
) -> bool {
    let Some(profile) = profile else {
        return false;
    };
    let department = workflow.department_id.is_some()
        && workflow.department_id == profile.department_id;
    let division =
        workflow.division_id.is_some() && workflow.division_id == profile.division_id;
    department || division
}

/// May the subject see this definition?
pub fn can_view(
    subject: &Subject,
    profile: Option<&SubjectProfile>,
    workflow: &WorkflowDefinition,
) -> bool {
    subject.is_admin()
        || is_creator(subject, workflow)
        || workflow.view_roles.is_empty()
        || subject.has_any_role(&workflow.view_roles)
        || department_or_division_matches(profile, workflow)
}

/// May the subject edit this definition?
pub fn can_edit(subject: &Subject, workflow: &WorkflowDefinition) -> bool {
    subject.is_admin()
        || is_creator(subject, workflow)
        || subject.has_any_role(&workflow.edit_roles)
}

/// May the subject publish this definition?
pub fn can_publish(subject: &Subject, workflow: &WorkflowDefinition) -> bool {
    subject.is_admin()
        || (is_creator(subject, workflow) && subject.has_any_role(PUBLISH_ROLES))
}

/// May the subject start instances of this definition?
pub fn can_use(
    subject: &Subject,
    profile: Option<&SubjectProfile>,
    workflow: &WorkflowDefinition,
) -> bool {
    if workflow.status != WorkflowStatus::Active {
        return false;
    }
    if subject.is_admin() || subject.has_any_role(&workflow.use_roles) {
        return true;
    }
    let Some(profile) = profile else {
        return false;
    };
    workflow.department_id.is_some() && workflow.department_id == profile.department_id
}
