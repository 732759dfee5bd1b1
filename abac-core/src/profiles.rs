//! Subject profile management.

use std::sync::Arc;
use uuid::Uuid;

use shared::domain::entities::{SubjectProfile, UpdateSubjectProfile};
use shared::domain::repositories::SubjectProfileRepository;
use shared::{AppError, AppResult};

/// Read and update extended subject attributes.
pub struct ProfileService {
    profiles: Arc<dyn SubjectProfileRepository>,
}

impl ProfileService {
    /// Create a service over the profile store.
    pub fn new(profiles: Arc<dyn SubjectProfileRepository>) -> Self {
        Self { profiles }
    }

    /// Fetch a subject's profile.
    pub async fn get_profile(&self, subject_id: Uuid) -> AppResult<SubjectProfile> {
        self.profiles
            .find_by_subject(subject_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No profile for subject {}", subject_id))
            })
    }

    /// Create or partially update a subject's profile.
    pub async fn update_profile(
        &self,
        subject_id: Uuid,
        update: UpdateSubjectProfile,
    ) -> AppResult<SubjectProfile> {
        self.profiles.upsert(subject_id, update).await
    }
}
