//! PostgreSQL implementation of the subject profile repository.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{SubjectProfile, UpdateSubjectProfile};
use crate::domain::repositories::SubjectProfileRepository;
use crate::infrastructure::database::{DatabaseService, RepositoryErrorExt};
use crate::shared::AppResult;

const PROFILE_COLUMNS: &str = "subject_id, department_id, division_id, team_id, job_title, \
     job_level, cost_center, approval_limit_amount, \
     can_approve_own_department, can_approve_all_departments, \
     office_location, country_code, timezone, custom_attributes, \
     created_at, updated_at";

/// PostgreSQL implementation of [`SubjectProfileRepository`].
pub struct SubjectProfileRepositoryImpl {
    database_service: Arc<DatabaseService>,
}

impl SubjectProfileRepositoryImpl {
    /// Create a repository over the shared database service.
    pub fn new(database_service: Arc<DatabaseService>) -> Self {
        Self { database_service }
    }
}

#[async_trait]
impl SubjectProfileRepository for SubjectProfileRepositoryImpl {
    async fn find_by_subject(&self, subject_id: Uuid) -> AppResult<Option<SubjectProfile>> {
        assert!(!subject_id.is_nil(), "Subject ID must not be nil");

        let query =
            format!("SELECT {PROFILE_COLUMNS} FROM subject_profiles WHERE subject_id = $1");
        let row = sqlx::query_as::<_, SubjectProfile>(&query)
            .bind(subject_id)
            .fetch_optional(self.database_service.pool())
            .await
            .map_db_error("fetch", "subject_profile")?;

        Ok(row)
    }

    async fn upsert(
        &self,
        subject_id: Uuid,
        update: UpdateSubjectProfile,
    ) -> AppResult<SubjectProfile> {
        assert!(!subject_id.is_nil(), "Subject ID must not be nil");

        let now = Utc::now();
        let query = format!(
            "INSERT INTO subject_profiles ( \
                 subject_id, department_id, division_id, team_id, job_title, \
                 job_level, cost_center, approval_limit_amount, \
                 can_approve_own_department, can_approve_all_departments, \
                 office_location, country_code, timezone, custom_attributes, \
                 created_at, updated_at \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, \
                     COALESCE($9, FALSE), COALESCE($10, FALSE), \
                     $11, $12, $13, $14, $15, $15) \
             ON CONFLICT (subject_id) DO UPDATE SET \
                 department_id = COALESCE($2, subject_profiles.department_id), \
                 division_id = COALESCE($3, subject_profiles.division_id), \
                 team_id = COALESCE($4, subject_profiles.team_id), \
                 job_title = COALESCE($5, subject_profiles.job_title), \
                 job_level = COALESCE($6, subject_profiles.job_level), \
                 cost_center = COALESCE($7, subject_profiles.cost_center), \
                 approval_limit_amount = COALESCE($8, subject_profiles.approval_limit_amount), \
                 can_approve_own_department = \
                     COALESCE($9, subject_profiles.can_approve_own_department), \
                 can_approve_all_departments = \
                     COALESCE($10, subject_profiles.can_approve_all_departments), \
                 office_location = COALESCE($11, subject_profiles.office_location), \
                 country_code = COALESCE($12, subject_profiles.country_code), \
                 timezone = COALESCE($13, subject_profiles.timezone), \
                 custom_attributes = COALESCE($14, subject_profiles.custom_attributes), \
                 updated_at = $15 \
             RETURNING {PROFILE_COLUMNS}"
        );

        let row = sqlx::query_as::<_, SubjectProfile>(&query)
            .bind(subject_id)
            .bind(update.department_id)
            .bind(update.division_id)
            .bind(update.team_id)
            .bind(update.job_title)
            .bind(update.job_level)
            .bind(update.cost_center)
            .bind(update.approval_limit_amount)
            .bind(update.can_approve_own_department)
            .bind(update.can_approve_all_departments)
            .bind(update.office_location)
            .bind(update.country_code)
            .bind(update.timezone)
            .bind(update.custom_attributes)
            .bind(now)
            .fetch_one(self.database_service.pool())
            .await
            .map_db_error("upsert", "subject_profile")?;

        assert_eq!(row.subject_id, subject_id, "Upserted profile ID mismatch");
        Ok(row)
    }
}
