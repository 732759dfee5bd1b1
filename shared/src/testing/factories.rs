//! Factory functions for creating test entities with realistic defaults.
//!
//! ```ignore
//! let subject = SubjectFactory::build();
//! let manager = SubjectFactory::build_with(|s| s.roles = vec!["manager".into()]);
//! ```

use chrono::Utc;
use uuid::Uuid;

use crate::domain::entities::{Policy, PolicyEffect, Subject, SubjectProfile};

/// Subject factory.
pub struct SubjectFactory;

impl SubjectFactory {
    /// Build a basic active subject with no role relationships.
    pub fn build() -> Subject {
        Subject {
            id: Uuid::new_v4(),
            email: "test-user@example.com".to_string(),
            username: "testuser".to_string(),
            role: "employee".to_string(),
            roles: vec![],
            is_active: true,
            is_superuser: false,
        }
    }

    /// Build with custom modifications.
    pub fn build_with<F>(modifier: F) -> Subject
    where
        F: FnOnce(&mut Subject),
    {
        let mut subject = Self::build();
        modifier(&mut subject);
        subject
    }

    /// Build an administrator.
    pub fn build_admin() -> Subject {
        Self::build_with(|s| {
            s.email = "admin@example.com".to_string();
            s.username = "admin".to_string();
            s.role = "admin".to_string();
            s.is_superuser = true;
        })
    }
}

/// Subject profile factory.
pub struct ProfileFactory;

impl ProfileFactory {
    /// Build a profile for a subject in department 1 / division 1.
    pub fn build(subject_id: Uuid) -> SubjectProfile {
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
            office_location: Some("HQ".to_string()),
            country_code: Some("US".to_string()),
            timezone: Some("America/New_York".to_string()),
            custom_attributes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build with custom modifications.
    pub fn build_with<F>(subject_id: Uuid, modifier: F) -> SubjectProfile
    where
        F: FnOnce(&mut SubjectProfile),
    {
        let mut profile = Self::build(subject_id);
        modifier(&mut profile);
        profile
    }
}

/// Policy factory.
pub struct PolicyFactory;

impl PolicyFactory {
    /// Build an active, unconditional allow policy.
    pub fn build(name: &str, action: &str, resource_type: &str) -> Policy {
        Policy {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            effect: PolicyEffect::Allow,
            priority: 0,
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

    /// Build with custom modifications.
    pub fn build_with<F>(name: &str, action: &str, resource_type: &str, modifier: F) -> Policy
    where
        F: FnOnce(&mut Policy),
    {
        let mut policy = Self::build(name, action, resource_type);
        modifier(&mut policy);
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_factory_defaults() {
        let subject = SubjectFactory::build();
        assert!(subject.is_active);
        assert!(!subject.is_admin());
        assert_eq!(subject.effective_roles(), vec!["employee"]);
    }

    #[test]
    fn policy_factory_builds_unconditional_allow() {
        let policy = PolicyFactory::build("p", "read", "invoice");
        assert!(policy.conditions.is_none());
        assert_eq!(policy.effect, PolicyEffect::Allow);
    }

    #[test]
    fn profile_factory_pins_department_and_division() {
        let subject = SubjectFactory::build();
        let profile = ProfileFactory::build_with(subject.id, |p| p.job_level = Some(7));
        assert_eq!(profile.subject_id, subject.id);
        assert_eq!(profile.department_id, Some(1));
        assert_eq!(profile.job_level, Some(7));
    }
}
