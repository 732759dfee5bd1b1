//! Visual workflow compiler and validator.
//!
//! Ingests node-and-edge graphs from the visual editor, validates their
//! structure, compiles them into stage and route records, snapshots
//! prior revisions on every save and gates all access through role-based
//! visibility rules.

pub mod compiler;
pub mod graph;
pub mod service;
pub mod visibility;

#[cfg(test)]
pub mod testing;

pub use compiler::compile;
pub use graph::{validate_graph, GraphDocument, GraphEdge, GraphNode, ValidatedGraph};
pub use service::{SaveGraphRequest, VisualWorkflowService};
