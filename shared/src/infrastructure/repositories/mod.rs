//! PostgreSQL repository implementations.

pub mod access_log_repository_impl;
pub mod policy_repository_impl;
pub mod policy_template_repository_impl;
pub mod resource_attribute_repository_impl;
pub mod subject_profile_repository_impl;
pub mod workflow_repository_impl;

pub use access_log_repository_impl::AccessLogRepositoryImpl;
pub use policy_repository_impl::PolicyRepositoryImpl;
pub use policy_template_repository_impl::PolicyTemplateRepositoryImpl;
pub use resource_attribute_repository_impl::ResourceAttributeRepositoryImpl;
pub use subject_profile_repository_impl::SubjectProfileRepositoryImpl;
pub use workflow_repository_impl::WorkflowRepositoryImpl;
