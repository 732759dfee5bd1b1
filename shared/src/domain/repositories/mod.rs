//! Repository contracts implemented by the infrastructure layer.

pub mod access_log_repository;
pub mod policy_repository;
pub mod policy_template_repository;
pub mod resource_attribute_repository;
pub mod subject_profile_repository;
pub mod workflow_repository;

pub use access_log_repository::AccessLogRepository;
pub use policy_repository::PolicyRepository;
pub use policy_template_repository::PolicyTemplateRepository;
pub use resource_attribute_repository::ResourceAttributeRepository;
pub use subject_profile_repository::SubjectProfileRepository;
pub use workflow_repository::WorkflowRepository;
