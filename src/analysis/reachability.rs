//! # Reachability Engine
//!
//! @title Origin-to-Sink Reachability
//! @author Ramprasad
//!
//! Decides whether any discovered sink can be reached from the untrusted
//! origin. Sinks are inspected in discovery order and the first reachable
//! one decides; every inspection leaves a line in the audit log.
//!
//! ## Key Types
//!
//! - [`ReachabilityOutcome`] - Decision, reason, audit log, and evidence
//! - [`decide`] - The reachability check itself

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::analysis::graph::ExposureGraph;
use crate::report::Decision;

/// Outcome of a reachability check.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachabilityOutcome {
    /// Whether the submission is blocked by reachability.
    pub decision: Decision,

    /// One-line explanation of the decision.
    pub reason: String,

    /// Ordered audit log of every inspected sink.
    pub audit: Vec<String>,

    /// Shortest origin-to-sink node path when one was found.
    pub evidence: Option<Vec<String>>,
}

/// Checks every discovered sink for a path from the origin.
///
/// Sinks are inspected in the order given; the first reachable sink blocks
/// the submission and the remaining sinks are not inspected. When the graph
/// fails its integrity check the submission is blocked outright, since a
/// failed safety check must never pass as proof of safety.
///
/// # Arguments
///
/// * `graph` - The populated exposure graph
/// * `origin_id` - Identifier of the untrusted-origin node
/// * `sink_ids` - Sink node identifiers in discovery order
///
/// # Returns
///
/// The [`ReachabilityOutcome`] with decision, audit log, and evidence.
pub fn decide(graph: &ExposureGraph, origin_id: &str, sink_ids: &[String]) -> ReachabilityOutcome {
    let mut audit = Vec::new();

    if let Some(edge) = graph.dangling_edge() {
        audit.push(format!(
            "FATAL: Context graph references a missing node on edge {} -> {}; blocking as a precaution.",
            edge.source, edge.target
        ));
        return ReachabilityOutcome {
            decision: Decision::Block,
            reason: "context graph failed its integrity check".to_string(),
            audit,
            evidence: None,
        };
    }

    for sink_id in sink_ids {
        let label = sink_label(graph, sink_id);

        match shortest_path(graph, origin_id, sink_id) {
            Some(path) => {
                audit.push(format!(
                    "CRITICAL: Kill Chain Detected! {}",
                    path.join(" -> ")
                ));
                audit.push(format!(
                    "ALERT: Blocking deployment due to reachable '{}'",
                    label
                ));
                return ReachabilityOutcome {
                    decision: Decision::Block,
                    reason: format!("'{}' is reachable from the public internet", label),
                    audit,
                    evidence: Some(path),
                };
            }
            None => {
                audit.push(format!(
                    "WARNING: Found '{}', but it is internal/safe (No path from {}).",
                    label, origin_id
                ));
            }
        }
    }

    ReachabilityOutcome {
        decision: Decision::Allow,
        reason: "no dangerous sink is reachable from the public internet".to_string(),
        audit,
        evidence: None,
    }
}

/// Returns the display label for a sink node, falling back to its id.
fn sink_label(graph: &ExposureGraph, sink_id: &str) -> String {
    graph
        .node(sink_id)
        .map(|n| n.label.clone())
        .unwrap_or_else(|| sink_id.to_string())
}

/// Breadth-first search for the shortest path between two nodes.
///
/// Visited-set bookkeeping makes the traversal terminate on cyclic graphs.
///
/// # Returns
///
/// The node-id path from `from` to `to` inclusive, or `None` when `to`
/// is unreachable.
fn shortest_path(graph: &ExposureGraph, from: &str, to: &str) -> Option<Vec<String>> {
    if !graph.contains_node(from) || !graph.contains_node(to) {
        return None;
    }
    if from == to {
        return Some(vec![from.to_string()]);
    }

    let mut visited: FxHashSet<&str> = FxHashSet::default();
    let mut parents: FxHashMap<&str, &str> = FxHashMap::default();
    let mut queue: VecDeque<&str> = VecDeque::new();

    visited.insert(from);
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        for next in graph.outgoing(current) {
            if !visited.insert(next.as_str()) {
                continue;
            }
            parents.insert(next.as_str(), current);
            if next.as_str() == to {
                return Some(rebuild_path(&parents, from, to));
            }
            queue.push_back(next.as_str());
        }
    }

    None
}

/// Walks the parent map backwards from `to` to `from`.
fn rebuild_path(parents: &FxHashMap<&str, &str>, from: &str, to: &str) -> Vec<String> {
    let mut path = vec![to.to_string()];
    let mut cursor = to;
    while cursor != from {
        match parents.get(cursor) {
            Some(&parent) => {
                path.push(parent.to_string());
                cursor = parent;
            }
            None => break,
        }
    }
    path.reverse();
    path
}
