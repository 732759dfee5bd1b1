//! Starter policy set.
//!
//! The common ERP policies installed on a fresh deployment: invoice
//! approval tiers, the self-approval ban, employee onboarding and
//! purchase order limits. Also used by tests as realistic fixtures.

use serde_json::json;
use uuid::Uuid;

use shared::domain::entities::{CreatePolicy, PolicyEffect};
use shared::domain::repositories::PolicyRepository;
use shared::AppResult;

/// The starter policies.
pub fn starter_policies() -> Vec<CreatePolicy> {
    vec![
        CreatePolicy {
            name: "Finance Manager - Approve Own Department Invoices".to_string(),
            description: Some(
                "Finance managers can approve invoices from their department under $10,000"
                    .to_string(),
            ),
            effect: PolicyEffect::Allow,
            priority: 100,
            action: "approve".to_string(),
            resource_type: "Invoice".to_string(),
            conditions: Some(json!({
                "all": [
                    {"attribute": "user.department_id", "operator": "eq",
                     "value": "{{resource.department_id}}"},
                    {"attribute": "resource.amount", "operator": "lte", "value": 10000},
                    {"attribute": "resource.status", "operator": "eq", "value": "pending"}
                ]
            })),
            department_ids: None,
            division_ids: None,
            role_requirements: Some(vec!["finance_manager".to_string()]),
        },
        CreatePolicy {
            name: "CFO - Approve High Value Invoices".to_string(),
            description: Some("CFO can approve any invoice over $10,000".to_string()),
            effect: PolicyEffect::Allow,
            priority: 150,
            action: "approve".to_string(),
            resource_type: "Invoice".to_string(),
            conditions: Some(json!({
                "all": [
                    {"attribute": "resource.amount", "operator": "gt", "value": 10000},
                    {"attribute": "resource.status", "operator": "in",
                     "value": ["pending", "manager_approved"]}
                ]
            })),
            department_ids: None,
            division_ids: None,
            role_requirements: Some(vec!["cfo".to_string()]),
        },
        CreatePolicy {
            name: "Prevent Self-Approval of Invoices".to_string(),
            description: Some("Users cannot approve their own invoices".to_string()),
            effect: PolicyEffect::Deny,
            priority: 200,
            action: "approve".to_string(),
            resource_type: "Invoice".to_string(),
            conditions: Some(json!({
                "all": [
                    {"attribute": "user.id", "operator": "eq",
                     "value": "{{resource.created_by}}"}
                ]
            })),
            department_ids: None,
            division_ids: None,
            role_requirements: None,
        },
        CreatePolicy {
            name: "HR Manager - Approve Department Employees".to_string(),
            description: Some(
                "HR managers can approve employees for their department".to_string(),
            ),
            effect: PolicyEffect::Allow,
            priority: 100,
            action: "approve".to_string(),
            resource_type: "EmployeeProfile".to_string(),
            conditions: Some(json!({
                "all": [
                    {"attribute": "user.department_id", "operator": "eq",
                     "value": "{{resource.department_id}}"}
                ]
            })),
            department_ids: None,
            division_ids: None,
            role_requirements: Some(vec!["hr_manager".to_string()]),
        },
        CreatePolicy {
            name: "Procurement - Approve Purchase Orders Within Limit".to_string(),
            description: Some(
                "Procurement staff approve purchase orders up to their personal limit"
                    .to_string(),
            ),
            effect: PolicyEffect::Allow,
            priority: 100,
            action: "approve".to_string(),
            resource_type: "PurchaseOrder".to_string(),
            conditions: Some(json!({
                "all": [
                    {"attribute": "resource.amount", "operator": "lte",
                     "value": "{{user.approval_limit_amount}}"},
                    {"attribute": "resource.status", "operator": "eq", "value": "pending"}
                ]
            })),
            department_ids: None,
            division_ids: None,
            role_requirements: Some(vec!["procurement_manager".to_string()]),
        },
        CreatePolicy {
            name: "Read Access - Own Department Resources".to_string(),
            description: Some(
                "Everyone can read resources belonging to their own department".to_string(),
            ),
            effect: PolicyEffect::Allow,
            priority: 10,
            action: "read".to_string(),
            resource_type: "*".to_string(),
            conditions: Some(json!({
                "all": [
                    {"attribute": "user.department_id", "operator": "eq",
                     "value": "{{resource.department_id}}"}
                ]
            })),
            department_ids: None,
            division_ids: None,
            role_requirements: None,
        },
    ]
}

/// Install the starter policies, skipping names that already exist.
/// Returns the number of policies created.
pub async fn install_starter_policies(
    policies: &dyn PolicyRepository,
    admin_id: Uuid,
) -> AppResult<usize> {
    let mut created = 0;
    for policy in starter_policies() {
        if policies.find_by_name(&policy.name).await?.is_some() {
            continue;
        }
        policies.create(policy, admin_id).await?;
        created += 1;
    }
    Ok(created)
}
