//! # Route-Sentinel Library
//!
//! @title Route-Sentinel - Deployment Admission Gate
//! @author Ramprasad
//!
//! A static analysis library that decides whether a submitted Python web
//! service is safe to deploy.
//!
//! A submission is modeled as an exposure graph: the public internet, the
//! routes the service registers, the functions behind them, and the
//! dangerous calls those functions make. A deployment is blocked when a
//! dangerous call is reachable from the internet, or when an external
//! scanner finding correlates with a publicly invoked call. A submission
//! that cannot be analyzed is never admitted.
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions and argument parsing
//! - [`config`] - Analysis policy: sinks, route verbs, rules, scanners
//! - [`parser`] - Python AST parsing and exposure extraction
//! - [`analysis`] - Exposure graph, reachability, and correlation
//! - [`scanners`] - External scanner integration
//! - [`engine`] - The analysis pipeline
//! - [`report`] - Analysis results in multiple formats
//!
//! ## Example
//!
//! ```rust,ignore
//! use route_sentinel::{AnalysisConfig, AnalysisEngine};
//!
//! let engine = AnalysisEngine::new(AnalysisConfig::default());
//! let result = engine.analyze_source(source, None);
//! println!("{}", result.decision);
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod engine;
pub mod parser;
pub mod report;
pub mod scanners;

pub use cli::Cli;
pub use config::AnalysisConfig;
pub use engine::AnalysisEngine;
pub use report::{AnalysisResult, Decision, Severity};
