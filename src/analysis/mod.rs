//! # Analysis Module
//!
//! @title Exposure Analysis Engine
//! @author Ramprasad
//!
//! This module contains the decision core: the exposure graph, the
//! origin-to-sink reachability check, and the scanner finding correlation
//! pass.
//!
//! ## Components
//!
//! - **Graph**: Typed nodes and edges from origin to sinks
//! - **Reachability**: Breadth-first kill chain search with audit log
//! - **Correlation**: Scanner findings mapped onto the function map

pub mod correlation;
pub mod graph;
pub mod reachability;

pub use correlation::{correlate, CorrelationRule};
pub use graph::{ExposureGraph, GraphEdge, GraphExport, GraphNode, NodeKind, ORIGIN_ID};
pub use reachability::{decide, ReachabilityOutcome};
