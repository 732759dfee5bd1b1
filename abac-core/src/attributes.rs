//! Attribute bag assembly.
//!
//! Builds the three bags a condition can address: `subject` (account
//! fields, profile fields, then the custom attribute map, which wins
//! on collision), `resource` (type and id, shallow-copied resource
//! object fields, then persisted dynamic attributes), and `environment`
//! (wall-clock UTC plus request metadata). Missing values stay absent so
//! `is_null` checks can tell them from zero values.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use shared::domain::entities::{AttributeValueType, ResourceAttribute, Subject, SubjectProfile};
use shared::domain::repositories::ResourceAttributeRepository;
use shared::AppResult;

/// Resource object fields lifted into the resource bag when present.
const RESOURCE_OBJECT_FIELDS: &[&str] = &[
    "status",
    "amount",
    "total_amount",
    "created_by",
    "department_id",
    "division_id",
    "created_at",
    "priority",
    "category",
    "assigned_to",
];

/// Request metadata merged into the environment bag and captured in the
/// audit trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessContext {
    /// Requesting IP address.
    pub ip_address: Option<String>,
    /// Requesting user agent.
    pub user_agent: Option<String>,
    /// Requested endpoint.
    pub endpoint: Option<String>,
}

/// The three attribute bags of one authorization request.
#[derive(Debug, Clone)]
pub struct AttributeBags {
    /// Subject attributes.
    pub subject: Map<String, Value>,
    /// Resource attributes.
    pub resource: Map<String, Value>,
    /// Environment attributes.
    pub environment: Map<String, Value>,
}

impl AttributeBags {
    /// Resolve a dotted attribute path against the bags.
    ///
    /// The first segment selects the bag (`subject` and `user` are
    /// aliases); remaining segments are nested lookups in map-valued
    /// attributes. Any missing segment yields `Null`.
    pub fn lookup(&self, path: &str) -> Value {
        let mut parts = path.split('.');
        let bag = match parts.next() {
            Some("subject") | Some("user") => &self.subject,
            Some("resource") => &self.resource,
            Some("environment") => &self.environment,
            _ => return Value::Null,
        };

        let Some(first) = parts.next() else {
            return Value::Null;
        };
        let mut current = match bag.get(first) {
            Some(value) => value,
            None => return Value::Null,
        };

        for part in parts {
            match current {
                Value::Object(map) => match map.get(part) {
                    Some(value) => current = value,
                    None => return Value::Null,
                },
                _ => return Value::Null,
            }
        }

        current.clone()
    }
}

/// Build the subject bag from the account and its optional profile.
pub fn subject_bag(subject: &Subject, profile: Option<&SubjectProfile>) -> Map<String, Value> {
    let mut bag = Map::new();
    bag.insert("id".to_string(), Value::String(subject.id.to_string()));
    bag.insert("email".to_string(), Value::String(subject.email.clone()));
    bag.insert(
        "username".to_string(),
        Value::String(subject.username.clone()),
    );
    bag.insert("role".to_string(), Value::String(subject.role.clone()));
    bag.insert("is_active".to_string(), Value::Bool(subject.is_active));
    bag.insert("is_superuser".to_string(), Value::Bool(subject.is_superuser));
    bag.insert(
        "roles".to_string(),
        Value::Array(
            subject
                .roles
                .iter()
                .map(|r| Value::String(r.clone()))
                .collect(),
        ),
    );

    if let Some(profile) = profile {
        insert_opt(&mut bag, "department_id", profile.department_id.map(Value::from));
        insert_opt(&mut bag, "division_id", profile.division_id.map(Value::from));
        insert_opt(&mut bag, "team_id", profile.team_id.map(Value::from));
        insert_opt(
            &mut bag,
            "job_title",
            profile.job_title.clone().map(Value::String),
        );
        insert_opt(&mut bag, "job_level", profile.job_level.map(Value::from));
        insert_opt(
            &mut bag,
            "approval_limit_amount",
            profile.approval_limit_amount.map(Value::from),
        );
        bag.insert(
            "can_approve_own_department".to_string(),
            Value::Bool(profile.can_approve_own_department),
        );
        bag.insert(
            "can_approve_all_departments".to_string(),
            Value::Bool(profile.can_approve_all_departments),
        );
        insert_opt(
            &mut bag,
            "office_location",
            profile.office_location.clone().map(Value::String),
        );
        insert_opt(
            &mut bag,
            "country_code",
            profile.country_code.clone().map(Value::String),
        );

        // Custom attributes land last: collisions resolve in favor of
        // the custom map.
        if let Some(Value::Object(custom)) = &profile.custom_attributes {
            for (key, value) in custom {
                bag.insert(key.clone(), value.clone());
            }
        }
    }

    bag
}

/// Build the resource bag from the request, an optional live resource
/// object, and the persisted dynamic attribute rows.
pub fn resource_bag(
    resource_type: &str,
    resource_id: Option<i64>,
    resource_object: Option<&Value>,
    dynamic: &[ResourceAttribute],
) -> Map<String, Value> {
    let mut bag = Map::new();
    bag.insert(
        "type".to_string(),
        Value::String(resource_type.to_string()),
    );
    bag.insert(
        "id".to_string(),
        resource_id.map(Value::from).unwrap_or(Value::Null),
    );

    if let Some(Value::Object(object)) = resource_object {
        for field in RESOURCE_OBJECT_FIELDS {
            if let Some(value) = object.get(*field) {
                bag.insert((*field).to_string(), value.clone());
            }
        }
    }

    for attribute in dynamic {
        bag.insert(
            attribute.attribute_name.clone(),
            parse_attribute_value(attribute),
        );
    }

    bag
}

/// Build the environment bag from the wall clock and request metadata.
pub fn environment_bag(
    context: Option<&AccessContext>,
    now: DateTime<Utc>,
) -> Map<String, Value> {
    let mut bag = Map::new();
    bag.insert("current_time".to_string(), Value::String(now.to_rfc3339()));
    bag.insert(
        "current_date".to_string(),
        Value::String(now.date_naive().to_string()),
    );
    bag.insert("current_hour".to_string(), Value::from(now.hour()));
    bag.insert(
        "current_day_of_week".to_string(),
        Value::String(now.format("%A").to_string()),
    );
    bag.insert("current_month".to_string(), Value::from(now.month()));
    bag.insert("current_year".to_string(), Value::from(now.year()));

    if let Some(context) = context {
        insert_opt(
            &mut bag,
            "ip_address",
            context.ip_address.clone().map(Value::String),
        );
        insert_opt(
            &mut bag,
            "user_agent",
            context.user_agent.clone().map(Value::String),
        );
        insert_opt(
            &mut bag,
            "endpoint",
            context.endpoint.clone().map(Value::String),
        );
    }

    bag
}

/// Parse a stored attribute value per its type tag; parse failures fall
/// back to the raw string rather than failing the resolver.
fn parse_attribute_value(attribute: &ResourceAttribute) -> Value {
    let Some(raw) = attribute.attribute_value.as_deref() else {
        return Value::Null;
    };

    match attribute.attribute_type {
        AttributeValueType::Number => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        AttributeValueType::Boolean => {
            let lowered = raw.to_ascii_lowercase();
            Value::Bool(matches!(lowered.as_str(), "true" | "1" | "yes"))
        }
        AttributeValueType::Json => serde_json::from_str(raw)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        AttributeValueType::String => Value::String(raw.to_string()),
    }
}

fn insert_opt(bag: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        bag.insert(key.to_string(), value);
    }
}

/// Assembles attribute bags for the decision engine, pulling persisted
/// dynamic attributes for the addressed resource. Unknown keys surface
/// as absent, never as an error.
pub struct AttributeResolver {
    resource_attributes: Arc<dyn ResourceAttributeRepository>,
}

impl AttributeResolver {
    /// Create a resolver over the dynamic attribute store.
    pub fn new(resource_attributes: Arc<dyn ResourceAttributeRepository>) -> Self {
        Self {
            resource_attributes,
        }
    }

    /// Assemble the three bags for one request.
    pub async fn resolve(
        &self,
        subject: &Subject,
        profile: Option<&SubjectProfile>,
        resource_type: &str,
        resource_id: Option<i64>,
        resource_object: Option<&Value>,
        context: Option<&AccessContext>,
    ) -> AppResult<AttributeBags> {
        let dynamic = match resource_id {
            Some(id) => {
                self.resource_attributes
                    .list_for(resource_type, id)
                    .await?
            }
            None => Vec::new(),
        };

        Ok(AttributeBags {
            subject: subject_bag(subject, profile),
            resource: resource_bag(resource_type, resource_id, resource_object, &dynamic),
            environment: environment_bag(context, Utc::now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{profile_fixture, subject_fixture};
    use chrono::TimeZone;
    use serde_json::json;
    use uuid::Uuid;

    fn dynamic_attribute(
        name: &str,
        value: Option<&str>,
        value_type: AttributeValueType,
    ) -> ResourceAttribute {
        ResourceAttribute {
            id: Uuid::new_v4(),
            resource_type: "invoice".to_string(),
            resource_id: 7,
            attribute_name: name.to_string(),
            attribute_value: value.map(|v| v.to_string()),
            attribute_type: value_type,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn subject_bag_merges_profile_and_custom_attributes() {
        let subject = subject_fixture("finance_manager", &[]);
        let mut profile = profile_fixture(subject.id);
        profile.department_id = Some(3);
        profile.custom_attributes = Some(json!({
            "clearance_level": "confidential",
            "job_title": "Overridden"
        }));

        let bag = subject_bag(&subject, Some(&profile));
        assert_eq!(bag["department_id"], json!(3));
        assert_eq!(bag["clearance_level"], json!("confidential"));
        // Custom attributes win over profile fields.
        assert_eq!(bag["job_title"], json!("Overridden"));
    }

    #[test]
    fn subject_bag_without_profile_leaves_keys_absent() {
        let subject = subject_fixture("employee", &[]);
        let bag = subject_bag(&subject, None);
        assert!(!bag.contains_key("department_id"));
        assert_eq!(bag["role"], json!("employee"));
    }

    #[test]
    fn resource_bag_copies_known_object_fields_only() {
        let object = json!({
            "status": "pending",
            "amount": 25000,
            "internal_notes": "should not leak"
        });

        let bag = resource_bag("invoice", Some(7), Some(&object), &[]);
        assert_eq!(bag["type"], json!("invoice"));
        assert_eq!(bag["id"], json!(7));
        assert_eq!(bag["status"], json!("pending"));
        assert!(!bag.contains_key("internal_notes"));
    }

    #[test]
    fn dynamic_attributes_parse_per_type_tag() {
        let rows = vec![
            dynamic_attribute("risk_score", Some("42.5"), AttributeValueType::Number),
            dynamic_attribute("flagged", Some("Yes"), AttributeValueType::Boolean),
            dynamic_attribute("tags", Some(r#"["urgent","q3"]"#), AttributeValueType::Json),
            dynamic_attribute("bad_number", Some("n/a"), AttributeValueType::Number),
        ];

        let bag = resource_bag("invoice", Some(7), None, &rows);
        assert_eq!(bag["risk_score"], json!(42.5));
        assert_eq!(bag["flagged"], json!(true));
        assert_eq!(bag["tags"], json!(["urgent", "q3"]));
        // Parse failure falls back to the raw string.
        assert_eq!(bag["bad_number"], json!("n/a"));
    }

    #[test]
    fn environment_bag_reflects_wall_clock() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 14, 30, 0).unwrap();
        let bag = environment_bag(None, now);
        assert_eq!(bag["current_hour"], json!(14));
        assert_eq!(bag["current_day_of_week"], json!("Monday"));
        assert_eq!(bag["current_month"], json!(3));
        assert_eq!(bag["current_year"], json!(2025));
        assert_eq!(bag["current_date"], json!("2025-03-10"));
    }

    #[test]
    fn lookup_supports_both_subject_roots_and_nesting() {
        let subject = subject_fixture("employee", &[]);
        let mut profile = profile_fixture(subject.id);
        profile.custom_attributes = Some(json!({"skills": {"rust": "expert"}}));

        let bags = AttributeBags {
            subject: subject_bag(&subject, Some(&profile)),
            resource: Map::new(),
            environment: Map::new(),
        };

        assert_eq!(bags.lookup("user.role"), json!("employee"));
        assert_eq!(bags.lookup("subject.role"), json!("employee"));
        assert_eq!(bags.lookup("user.skills.rust"), json!("expert"));
        assert_eq!(bags.lookup("user.skills.go"), Value::Null);
        assert_eq!(bags.lookup("unknown.role"), Value::Null);
    }
}
