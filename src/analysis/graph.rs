//! # Exposure Graph
//!
//! @title Context Graph Construction
//! @author Ramprasad
//!
//! Builds the directed graph connecting the abstract untrusted-origin node
//! through route entries and functions to dangerous sinks. The graph holds
//! structure only; reachability decisions live in
//! [`crate::analysis::reachability`].
//!
//! ## Key Types
//!
//! - [`ExposureGraph`] - Node and edge accumulator with adjacency index
//! - [`GraphNode`] / [`GraphEdge`] - Typed graph elements
//! - [`NodeKind`] - Origin, Entry, Function, or Sink
//! - [`GraphExport`] - Serializable snapshot in insertion order

use indexmap::map::Entry;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Identifier and label of the abstract untrusted-origin node.
pub const ORIGIN_ID: &str = "INTERNET";

const ORIGIN_COLOR: &str = "#00f2ff";
const ENTRY_COLOR: &str = "#ff9f1c";
const FUNCTION_COLOR: &str = "#2d3442";
const SINK_COLOR: &str = "#ff3355";

/// Role of a node in the exposure graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// The abstract untrusted origin.
    Origin,

    /// A network-facing route entry point.
    Entry,

    /// A function definition.
    Function,

    /// A dangerous operation.
    Sink,
}

/// A typed node in the exposure graph.
///
/// The `color` field is presentation metadata for downstream graph
/// consumers and never influences any decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique node identifier.
    pub id: String,

    /// Role of the node.
    pub kind: NodeKind,

    /// Display label.
    pub label: String,

    /// Display color as a hex string.
    pub color: String,
}

impl GraphNode {
    /// Creates the untrusted-origin node.
    pub fn origin() -> Self {
        Self {
            id: ORIGIN_ID.to_string(),
            kind: NodeKind::Origin,
            label: ORIGIN_ID.to_string(),
            color: ORIGIN_COLOR.to_string(),
        }
    }

    /// Creates an entry node for a route path.
    pub fn entry(route_path: &str) -> Self {
        Self {
            id: entry_id(route_path),
            kind: NodeKind::Entry,
            label: route_path.to_string(),
            color: ENTRY_COLOR.to_string(),
        }
    }

    /// Creates a function node.
    pub fn function(name: &str) -> Self {
        Self {
            id: name.to_string(),
            kind: NodeKind::Function,
            label: name.to_string(),
            color: FUNCTION_COLOR.to_string(),
        }
    }

    /// Creates a sink node for a dangerous call name.
    pub fn sink(call_name: &str) -> Self {
        Self {
            id: sink_id(call_name),
            kind: NodeKind::Sink,
            label: call_name.to_string(),
            color: SINK_COLOR.to_string(),
        }
    }
}

/// Returns the node identifier used for a route entry.
pub fn entry_id(route_path: &str) -> String {
    format!("ROUTE: {}", route_path)
}

/// Returns the node identifier used for a dangerous sink.
pub fn sink_id(call_name: &str) -> String {
    format!("VULN: {}", call_name)
}

/// A directed edge between two node identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node identifier.
    pub source: String,

    /// Target node identifier.
    pub target: String,
}

/// Serializable snapshot of an exposure graph.
///
/// Nodes and edges appear in insertion order, so identical inputs produce
/// structurally identical exports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    /// All nodes in insertion order.
    pub nodes: Vec<GraphNode>,

    /// All edges in insertion order.
    pub edges: Vec<GraphEdge>,
}

/// Accumulator for exposure graph structure.
///
/// Nodes are keyed by unique identifier with insert-if-absent semantics;
/// the first writer wins for node attributes. Edge insertion is idempotent.
/// Edges never create nodes, so a malformed build is observable afterwards
/// through [`ExposureGraph::dangling_edge`].
#[derive(Debug, Clone, Default)]
pub struct ExposureGraph {
    nodes: IndexMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
    edge_set: FxHashSet<(String, String)>,
    outgoing: FxHashMap<String, Vec<String>>,
}

impl ExposureGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node if no node with the same identifier exists.
    ///
    /// # Arguments
    ///
    /// * `node` - The node to insert
    ///
    /// # Returns
    ///
    /// `true` when the node was inserted, `false` when the identifier was
    /// already present and the existing node was kept unchanged.
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        match self.nodes.entry(node.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(node);
                true
            }
        }
    }

    /// Inserts a directed edge between two node identifiers.
    ///
    /// Duplicate insertion is a no-op. The endpoints are not required to
    /// exist yet; [`ExposureGraph::dangling_edge`] reports edges whose
    /// endpoints never materialized.
    ///
    /// # Returns
    ///
    /// `true` when the edge was inserted, `false` when it already existed.
    pub fn add_edge(&mut self, source: &str, target: &str) -> bool {
        let key = (source.to_string(), target.to_string());
        if !self.edge_set.insert(key) {
            return false;
        }
        self.edges.push(GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
        });
        self.outgoing
            .entry(source.to_string())
            .or_default()
            .push(target.to_string());
        true
    }

    /// Returns whether a node with the given identifier exists.
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Looks up a node by identifier.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Returns the identifiers reachable from `id` over one edge.
    pub fn outgoing(&self, id: &str) -> &[String] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the first edge referencing a missing node, if any.
    ///
    /// A well-formed build never produces one; the reachability engine
    /// treats a dangling edge as an integrity failure and blocks.
    pub fn dangling_edge(&self) -> Option<&GraphEdge> {
        self.edges
            .iter()
            .find(|e| !self.nodes.contains_key(&e.source) || !self.nodes.contains_key(&e.target))
    }

    /// Produces a serializable snapshot in insertion order.
    pub fn export(&self) -> GraphExport {
        GraphExport {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.clone(),
        }
    }
}
