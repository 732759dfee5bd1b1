//! Graph document model and structural validation.
//!
//! The editor ships `{nodes, edges, viewport}`. Validation checks the
//! shape the compiler depends on: a non-empty node list, unique node
//! ids, exactly one start node, and edges whose endpoints exist. A
//! failing graph is rejected with the full diagnostic list; reachability
//! problems are reported as warnings without blocking the save.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use shared::{AppError, AppResult};

/// 2-D editor position of a node.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct NodePosition {
    /// Horizontal coordinate.
    #[serde(default)]
    pub x: f64,
    /// Vertical coordinate.
    #[serde(default)]
    pub y: f64,
}

/// One node of the authored graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Author-supplied node id; unique within the graph.
    pub id: String,
    /// Node type string ("start", "approval", ...).
    #[serde(rename = "type")]
    pub node_type: String,
    /// Editor position.
    #[serde(default)]
    pub position: NodePosition,
    /// Node configuration payload.
    #[serde(default)]
    pub data: Value,
}

/// One edge of the authored graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Edge id.
    pub id: String,
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Edge payload; `data.condition` truthy marks a conditional edge.
    #[serde(default)]
    pub data: Option<Value>,
}

/// The full graph document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Authored nodes.
    pub nodes: Vec<GraphNode>,
    /// Authored edges.
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    /// Editor viewport; opaque.
    #[serde(default)]
    pub viewport: Option<Value>,
}

/// A structurally valid graph together with non-fatal warnings.
#[derive(Debug, Clone)]
pub struct ValidatedGraph {
    /// The parsed document.
    pub document: GraphDocument,
    /// Non-fatal findings, e.g. nodes unreachable from the start node.
    pub warnings: Vec<String>,
}

/// Validate an incoming graph document.
pub fn validate_graph(graph: &Value) -> AppResult<ValidatedGraph> {
    let document: GraphDocument = serde_json::from_value(graph.clone())
        .map_err(|e| AppError::Validation(format!("Malformed graph document: {}", e)))?;

    let mut diagnostics: Vec<String> = Vec::new();

    if document.nodes.is_empty() {
        diagnostics.push("Graph must contain at least one node".to_string());
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for node in &document.nodes {
        if node.id.is_empty() {
            diagnostics.push("Node ids must not be empty".to_string());
        } else if !seen.insert(node.id.as_str()) {
            diagnostics.push(format!("Duplicate node id '{}'", node.id));
        }
    }

    let start_count = document
        .nodes
        .iter()
        .filter(|node| node.node_type.eq_ignore_ascii_case("start"))
        .count();
    if !document.nodes.is_empty() {
        if start_count == 0 {
            diagnostics.push("Graph must declare a start node".to_string());
        } else if start_count > 1 {
            diagnostics.push("Graph must declare exactly one start node".to_string());
        }
    }

    for edge in &document.edges {
        if !seen.contains(edge.source.as_str()) {
            diagnostics.push(format!(
                "Edge '{}' references unknown source node '{}'",
                edge.id, edge.source
            ));
        }
        if !seen.contains(edge.target.as_str()) {
            diagnostics.push(format!(
                "Edge '{}' references unknown target node '{}'",
                edge.id, edge.target
            ));
        }
    }

    if !diagnostics.is_empty() {
        return Err(AppError::Validation(diagnostics.join("; ")));
    }

    Ok(ValidatedGraph {
        warnings: reachability_warnings(&document),
        document,
    })
}

/// Find nodes a token starting at the start node can never reach.
fn reachability_warnings(document: &GraphDocument) -> Vec<String> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut indices: HashMap<&str, NodeIndex> = HashMap::new();

    for node in &document.nodes {
        indices.insert(node.id.as_str(), graph.add_node(node.id.as_str()));
    }
    for edge in &document.edges {
        if let (Some(&source), Some(&target)) = (
            indices.get(edge.source.as_str()),
            indices.get(edge.target.as_str()),
        ) {
            graph.add_edge(source, target, ());
        }
    }

    let Some(start) = document
        .nodes
        .iter()
        .find(|node| node.node_type.eq_ignore_ascii_case("start"))
        .and_then(|node| indices.get(node.id.as_str()))
    else {
        return Vec::new();
    };

    let mut reached: HashSet<NodeIndex> = HashSet::new();
    let mut bfs = Bfs::new(&graph, *start);
    while let Some(index) = bfs.next(&graph) {
        reached.insert(index);
    }

    document
        .nodes
        .iter()
        .filter(|node| {
            indices
                .get(node.id.as_str())
                .is_some_and(|index| !reached.contains(index))
        })
        .map(|node| format!("Node '{}' is unreachable from the start node", node.id))
        .collect()
}
