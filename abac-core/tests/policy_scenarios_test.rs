//! Scenario tests driving the public evaluation API with the starter
//! policy set.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use abac_core::attributes::{environment_bag, resource_bag, subject_bag};
use abac_core::conditions::evaluate_policy_conditions;
use abac_core::AttributeBags;
use shared::domain::entities::{CreatePolicy, Subject};

fn subject(role: &str) -> Subject {
    Subject {
        id: Uuid::new_v4(),
        email: format!("{role}@example.com"),
        username: role.to_string(),
        role: role.to_string(),
        roles: vec![],
        is_active: true,
        is_superuser: false,
    }
}

fn bags_for(subject: &Subject, resource_object: Value) -> AttributeBags {
    AttributeBags {
        subject: subject_bag(subject, None),
        resource: resource_bag("Invoice", Some(7), Some(&resource_object), &[]),
        environment: environment_bag(None, chrono::Utc::now()),
    }
}

fn find_policy(name_fragment: &str) -> CreatePolicy {
    abac_core::seed::starter_policies()
        .into_iter()
        .find(|p| p.name.contains(name_fragment))
        .expect("starter policy present")
}

#[test]
fn self_approval_ban_matches_own_invoice() {
    let ban = find_policy("Self-Approval");
    let approver = subject("finance_manager");

    let own_invoice = json!({"created_by": approver.id.to_string(), "amount": 500});
    let bags = bags_for(&approver, own_invoice);
    assert!(evaluate_policy_conditions(ban.conditions.as_ref(), &bags));

    let someone_elses = json!({"created_by": Uuid::new_v4().to_string(), "amount": 500});
    let bags = bags_for(&approver, someone_elses);
    assert!(!evaluate_policy_conditions(ban.conditions.as_ref(), &bags));
}

#[test]
fn between_condition_brackets_the_amount() {
    let conditions = json!({
        "all": [
            {"attribute": "resource.amount", "operator": "between", "value": [5000, 50000]}
        ]
    });
    let approver = subject("finance_manager");

    let in_range = bags_for(&approver, json!({"amount": 25000}));
    assert!(evaluate_policy_conditions(Some(&conditions), &in_range));

    let below = bags_for(&approver, json!({"amount": 4999}));
    assert!(!evaluate_policy_conditions(Some(&conditions), &below));
}

#[test]
fn missing_profile_attribute_is_not_equal() {
    let conditions = json!({
        "all": [{"attribute": "user.department_id", "operator": "eq", "value": 3}]
    });
    // No profile: department_id is absent from the subject bag.
    let bags = bags_for(&subject("clerk"), json!({}));
    assert!(!evaluate_policy_conditions(Some(&conditions), &bags));
}

#[test]
fn cfo_tier_requires_high_value_and_known_status() {
    let cfo_policy = find_policy("CFO");
    let cfo = subject("cfo");

    let high_value = bags_for(&cfo, json!({"amount": 50000, "status": "pending"}));
    assert!(evaluate_policy_conditions(cfo_policy.conditions.as_ref(), &high_value));

    let low_value = bags_for(&cfo, json!({"amount": 900, "status": "pending"}));
    assert!(!evaluate_policy_conditions(cfo_policy.conditions.as_ref(), &low_value));

    let rejected = bags_for(&cfo, json!({"amount": 50000, "status": "rejected"}));
    assert!(!evaluate_policy_conditions(cfo_policy.conditions.as_ref(), &rejected));
}

#[test]
fn approval_limit_reference_reads_subject_profile_value() {
    let limit_policy = find_policy("Purchase Orders");
    let buyer = subject("procurement_manager");

    // The subject bag carries the custom limit through the profile merge;
    // simulate it via a custom attribute map on a profile-less bag.
    let mut subject_attrs = subject_bag(&buyer, None);
    subject_attrs.insert("approval_limit_amount".to_string(), json!(20000));

    let mut resource_attrs = Map::new();
    resource_attrs.insert("type".to_string(), json!("PurchaseOrder"));
    resource_attrs.insert("id".to_string(), json!(12));
    resource_attrs.insert("amount".to_string(), json!(15000));
    resource_attrs.insert("status".to_string(), json!("pending"));

    let bags = AttributeBags {
        subject: subject_attrs,
        resource: resource_attrs,
        environment: environment_bag(None, chrono::Utc::now()),
    };
    assert!(evaluate_policy_conditions(limit_policy.conditions.as_ref(), &bags));

    let mut over_limit = bags.clone();
    over_limit
        .resource
        .insert("amount".to_string(), json!(25000));
    assert!(!evaluate_policy_conditions(limit_policy.conditions.as_ref(), &over_limit));
}
