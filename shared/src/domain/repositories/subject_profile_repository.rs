//! Subject profile persistence contract.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{SubjectProfile, UpdateSubjectProfile};
use crate::shared::AppResult;

/// Repository for extended subject attributes.
#[async_trait]
pub trait SubjectProfileRepository: Send + Sync {
    /// Fetch the profile for a subject, if one exists.
    async fn find_by_subject(&self, subject_id: Uuid) -> AppResult<Option<SubjectProfile>>;

    /// Create or partially update the profile for a subject.
    async fn upsert(
        &self,
        subject_id: Uuid,
        update: UpdateSubjectProfile,
    ) -> AppResult<SubjectProfile>;
}
