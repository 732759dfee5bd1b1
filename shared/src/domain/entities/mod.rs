//! Domain entities persisted by the infrastructure layer.

pub mod access_log;
pub mod policy;
pub mod resource_attribute;
pub mod subject;
pub mod workflow;

pub use access_log::{AccessLog, AuditLogFilter, NewAccessLog};
pub use policy::{
    CreatePolicy, Policy, PolicyEffect, PolicyFilter, PolicyTemplate, UpdatePolicy,
};
pub use resource_attribute::{AttributeValueType, ResourceAttribute};
pub use subject::{Subject, SubjectProfile, UpdateSubjectProfile};
pub use workflow::{
    ApprovalType, CompiledRoute, CompiledStage, CompiledWorkflow, ConditionalRoute, NewWorkflow,
    StageNodeType, WorkflowDefinition, WorkflowFilter, WorkflowStage, WorkflowStatus,
    WorkflowVersion,
};
