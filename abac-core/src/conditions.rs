//! Typed condition evaluation.
//!
//! A condition is (attribute path, operator, operand). Operands may be a
//! single `{{path}}` reference, resolved against the same bags at
//! evaluation time; the reference form is only recognized when the whole
//! operand is one reference. The evaluator never fails: coercion errors,
//! unknown operators and malformed documents all evaluate to false.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::AttributeBags;

static REFERENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{(.+?)\}\}$").expect("reference pattern compiles"));

/// Comparison operators for conditions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Deep equality.
    #[default]
    Eq,
    /// Deep inequality.
    Ne,
    /// Numeric greater-than.
    Gt,
    /// Numeric greater-or-equal.
    Gte,
    /// Numeric less-than.
    Lt,
    /// Numeric less-or-equal.
    Lte,
    /// Membership in a list operand.
    In,
    /// Absence from a list operand.
    NotIn,
    /// Substring on string forms.
    Contains,
    /// Prefix on string forms.
    StartsWith,
    /// Suffix on string forms.
    EndsWith,
    /// Inclusive numeric range; operand is `[lo, hi]`.
    Between,
    /// The attribute is absent or null; operand ignored.
    IsNull,
    /// The attribute is present and non-null; operand ignored.
    IsNotNull,
}

/// A single typed predicate from a policy's condition group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted attribute path with root `subject`/`user`, `resource` or
    /// `environment`.
    pub attribute: String,
    /// Comparison operator; defaults to equality.
    #[serde(default)]
    pub operator: ConditionOperator,
    /// Literal, list, or `{{path}}` reference.
    #[serde(default)]
    pub value: Value,
}

/// Evaluate a policy's condition-group document against the bags.
///
/// `None` or JSON null means an unconditional match. The document must
/// carry exactly one of `all`, `any` or `none`; anything else evaluates
/// to false, as does any condition that fails to parse.
pub fn evaluate_policy_conditions(conditions: Option<&Value>, bags: &AttributeBags) -> bool {
    let Some(doc) = conditions else {
        return true;
    };
    if doc.is_null() {
        return true;
    }
    let Some(object) = doc.as_object() else {
        return false;
    };

    let groups: Vec<&str> = ["all", "any", "none"]
        .into_iter()
        .filter(|key| object.contains_key(*key))
        .collect();
    let [group] = groups.as_slice() else {
        return false;
    };

    let Some(members) = object.get(*group).and_then(Value::as_array) else {
        return false;
    };

    match *group {
        "all" => members.iter().all(|member| member_matches(member, bags)),
        "any" => members.iter().any(|member| member_matches(member, bags)),
        "none" => !members.iter().any(|member| member_matches(member, bags)),
        _ => false,
    }
}

fn member_matches(member: &Value, bags: &AttributeBags) -> bool {
    serde_json::from_value::<Condition>(member.clone())
        .map(|condition| evaluate_condition(&condition, bags))
        .unwrap_or(false)
}

/// Evaluate one condition against the bags.
pub fn evaluate_condition(condition: &Condition, bags: &AttributeBags) -> bool {
    let actual = bags.lookup(&condition.attribute);
    let expected = resolve_operand(&condition.value, bags);
    apply_operator(condition.operator, &actual, &expected)
}

/// Resolve a `{{path}}` operand against the bags; all other operands
/// pass through unchanged. References inside strings or list elements
/// are not supported.
fn resolve_operand(operand: &Value, bags: &AttributeBags) -> Value {
    if let Value::String(raw) = operand {
        if let Some(captures) = REFERENCE_PATTERN.captures(raw) {
            return bags.lookup(captures[1].trim());
        }
    }
    operand.clone()
}

/// Apply a comparison operator to resolved operands.
pub fn apply_operator(operator: ConditionOperator, actual: &Value, expected: &Value) -> bool {
    match operator {
        ConditionOperator::Eq => values_equal(actual, expected),
        ConditionOperator::Ne => !values_equal(actual, expected),
        ConditionOperator::Gt => numeric_compare(actual, expected, |a, b| a > b),
        ConditionOperator::Gte => numeric_compare(actual, expected, |a, b| a >= b),
        ConditionOperator::Lt => numeric_compare(actual, expected, |a, b| a < b),
        ConditionOperator::Lte => numeric_compare(actual, expected, |a, b| a <= b),
        ConditionOperator::In => match expected.as_array() {
            Some(list) => list.iter().any(|item| values_equal(actual, item)),
            None => false,
        },
        ConditionOperator::NotIn => match expected.as_array() {
            Some(list) => !list.iter().any(|item| values_equal(actual, item)),
            None => true,
        },
        ConditionOperator::Contains => string_form(actual).contains(&string_form(expected)),
        ConditionOperator::StartsWith => {
            string_form(actual).starts_with(&string_form(expected))
        }
        ConditionOperator::EndsWith => string_form(actual).ends_with(&string_form(expected)),
        ConditionOperator::Between => between(actual, expected),
        ConditionOperator::IsNull => actual.is_null(),
        ConditionOperator::IsNotNull => !actual.is_null(),
    }
}

/// Deep equality with numeric promotion, so an integer attribute equals
/// a float operand with the same value.
fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (number_of(a), number_of(b)) {
        return x == y;
    }
    a == b
}

fn numeric_compare<F>(actual: &Value, expected: &Value, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (number_of(actual), number_of(expected)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Coerce a value to a double: numbers directly, strings by parsing.
/// Everything else has no numeric form.
fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn between(actual: &Value, expected: &Value) -> bool {
    let Some(bounds) = expected.as_array() else {
        return false;
    };
    if bounds.len() != 2 {
        return false;
    }
    match (number_of(actual), number_of(&bounds[0]), number_of(&bounds[1])) {
        (Some(value), Some(lo), Some(hi)) => lo <= value && value <= hi,
        _ => false,
    }
}

fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
