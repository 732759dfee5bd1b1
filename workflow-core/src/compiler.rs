//! Stage compilation.
//!
//! Transforms a validated graph into the derived stage/route projection.
//! Every node becomes one stage in node-list order. Edges either carry a
//! truthy `data.condition` and become conditional routes, or set the
//! source stage's default successor; further unconditional edges from an
//! already-linked source are accepted as implicit-else and produce no
//! record.

use serde_json::{Map, Value};
use std::collections::HashSet;

use shared::domain::entities::{
    ApprovalType, CompiledRoute, CompiledStage, CompiledWorkflow, StageNodeType,
};

use crate::graph::{GraphDocument, GraphNode};

/// Compile a validated graph document into its stage/route projection.
pub fn compile(document: &GraphDocument) -> CompiledWorkflow {
    let mut stages: Vec<CompiledStage> = document
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| compile_node(index, node))
        .collect();

    let node_ids: HashSet<&str> = document.nodes.iter().map(|node| node.id.as_str()).collect();
    let mut routes: Vec<CompiledRoute> = Vec::new();

    for edge in &document.edges {
        if !node_ids.contains(edge.source.as_str()) || !node_ids.contains(edge.target.as_str())
        {
            continue;
        }

        let data = edge
            .data
            .as_ref()
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        if is_truthy(data.get("condition")) {
            routes.push(CompiledRoute {
                from_node_id: edge.source.clone(),
                to_node_id: edge.target.clone(),
                label: string_field(&data, "label"),
                condition_field: string_field(&data, "condition_field"),
                operator: string_field(&data, "operator"),
                condition_value: data.get("condition_value").cloned(),
                priority: int_field(&data, "priority").unwrap_or(0),
            });
            continue;
        }

        // Unconditional edge: first one wins the default successor slot;
        // the rest are implicit-else.
        if let Some(stage) = stages.iter_mut().find(|s| s.node_id == edge.source) {
            if stage.next_node_id.is_none() {
                stage.next_node_id = Some(edge.target.clone());
            }
        }
    }

    CompiledWorkflow { stages, routes }
}

fn compile_node(index: usize, node: &GraphNode) -> CompiledStage {
    let data = node
        .data
        .as_object()
        .cloned()
        .unwrap_or_default();

    CompiledStage {
        node_id: node.id.clone(),
        node_type: StageNodeType::from_node_type(&node.node_type),
        order_index: index as i32,
        required_role: string_field(&data, "required_role"),
        required_roles: string_list_field(&data, "required_roles"),
        specific_users: string_list_field(&data, "specific_users"),
        approval_type: data
            .get("approval_type")
            .cloned()
            .and_then(|value| serde_json::from_value::<ApprovalType>(value).ok()),
        required_count: int_field(&data, "required_count"),
        condition_config: data.get("condition_config").cloned(),
        sla_hours: int_field(&data, "sla_hours"),
        escalation_config: data.get("escalation").cloned(),
        notification_template: string_field(&data, "notification_template"),
        action_hook: string_field(&data, "action"),
        position_x: node.position.x,
        position_y: node.position.y,
        next_node_id: None,
    }
}

/// Truthiness of an edge condition marker: null, false, zero, and empty
/// strings/collections do not mark a conditional edge.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

fn string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn string_list_field(data: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    data.get(key)
        .cloned()
        .and_then(|value| serde_json::from_value::<Vec<String>>(value).ok())
}

fn int_field(data: &Map<String, Value>, key: &str) -> Option<i32> {
    data.get(key).and_then(Value::as_i64).map(|v| v as i32)
}
