//! Candidate policy selection.
//!
//! Applies the pre-filter in order: active flag, action and resource
//! type (explicit OR against the literal `*`), required-role
//! intersection, then department and division scope. Scoped policies
//! require a subject profile; a subject without one never matches them.
//! Survivors are ordered by priority descending, ties broken by
//! ascending id, so evaluation order is deterministic.

use shared::domain::entities::{Policy, Subject, SubjectProfile};

/// Check a policy's action/resource-type targeting against a request.
pub fn target_matches(policy: &Policy, action: &str, resource_type: &str) -> bool {
    (policy.action == action || policy.action == "*")
        && (policy.resource_type == resource_type || policy.resource_type == "*")
}

/// Reduce fetched policies to the ordered candidate set for a request.
pub fn filter_candidates(
    policies: Vec<Policy>,
    action: &str,
    resource_type: &str,
    subject: &Subject,
    profile: Option<&SubjectProfile>,
) -> Vec<Policy> {
    let roles = subject.effective_roles();

    let mut candidates: Vec<Policy> = policies
        .into_iter()
        .filter(|policy| {
            if !policy.is_active || !target_matches(policy, action, resource_type) {
                return false;
            }
            if let Some(required) = &policy.role_requirements {
                if !required.is_empty() && !roles.iter().any(|role| required.contains(role)) {
                    return false;
                }
            }
            if !scope_matches(policy.department_ids.as_deref(), profile.and_then(|p| p.department_id)) {
                return false;
            }
            if !scope_matches(policy.division_ids.as_deref(), profile.and_then(|p| p.division_id)) {
                return false;
            }
            true
        })
        .collect();

    candidates.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
    candidates
}

fn scope_matches(scope: Option<&[i64]>, subject_value: Option<i64>) -> bool {
    match scope {
        None => true,
        Some([]) => true,
        Some(ids) => subject_value.is_some_and(|value| ids.contains(&value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{policy_fixture, profile_fixture, subject_fixture};
    use uuid::Uuid;

    #[test]
    fn wildcard_action_and_resource_type_match_everything() {
        let p = policy_fixture("any", "*", "*", 0);
        assert!(target_matches(&p, "read", "invoice"));
        assert!(target_matches(&p, "approve", "PurchaseOrder"));

        let scoped = policy_fixture("read-invoice", "read", "invoice", 0);
        assert!(target_matches(&scoped, "read", "invoice"));
        assert!(!target_matches(&scoped, "read", "employee"));
        assert!(!target_matches(&scoped, "delete", "invoice"));
    }

    #[test]
    fn inactive_policies_are_dropped() {
        let subject = subject_fixture("employee", &[]);
        let mut p = policy_fixture("off", "read", "invoice", 0);
        p.is_active = false;

        let kept = filter_candidates(vec![p], "read", "invoice", &subject, None);
        assert!(kept.is_empty());
    }

    #[test]
    fn role_requirements_intersect_effective_role_set() {
        let by_primary = subject_fixture("finance_manager", &[]);
        let by_set = subject_fixture("employee", &["finance_manager", "auditor"]);
        let outsider = subject_fixture("employee", &[]);

        let mut p = policy_fixture("managers-only", "approve", "invoice", 0);
        p.role_requirements = Some(vec!["finance_manager".to_string()]);

        for (subject, expected) in [(&by_primary, 1), (&by_set, 1), (&outsider, 0)] {
            let kept =
                filter_candidates(vec![p.clone()], "approve", "invoice", subject, None);
            assert_eq!(kept.len(), expected);
        }
    }

    #[test]
    fn department_scope_requires_a_profile() {
        let subject = subject_fixture("employee", &[]);
        let mut p = policy_fixture("dept-scoped", "read", "invoice", 0);
        p.department_ids = Some(vec![3, 4]);

        // No profile: scoped policies silently fail.
        let kept = filter_candidates(vec![p.clone()], "read", "invoice", &subject, None);
        assert!(kept.is_empty());

        let in_scope = profile_fixture(subject.id);
        let mut in_scope = in_scope;
        in_scope.department_id = Some(3);
        let kept =
            filter_candidates(vec![p.clone()], "read", "invoice", &subject, Some(&in_scope));
        assert_eq!(kept.len(), 1);

        let mut out_of_scope = profile_fixture(subject.id);
        out_of_scope.department_id = Some(9);
        let kept =
            filter_candidates(vec![p], "read", "invoice", &subject, Some(&out_of_scope));
        assert!(kept.is_empty());
    }

    #[test]
    fn candidates_order_by_priority_then_id() {
        let subject = subject_fixture("employee", &[]);
        let mut low = policy_fixture("low", "read", "invoice", 10);
        let mut high = policy_fixture("high", "read", "invoice", 100);
        let mut tie_a = policy_fixture("tie-a", "read", "invoice", 50);
        let mut tie_b = policy_fixture("tie-b", "read", "invoice", 50);
        low.id = Uuid::from_u128(4);
        high.id = Uuid::from_u128(3);
        tie_a.id = Uuid::from_u128(1);
        tie_b.id = Uuid::from_u128(2);

        let kept = filter_candidates(
            vec![low, tie_b, high, tie_a],
            "read",
            "invoice",
            &subject,
            None,
        );
        let names: Vec<&str> = kept.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["high", "tie-a", "tie-b", "low"]);
    }
}
