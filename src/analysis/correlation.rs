//! # Correlation Module
//!
//! @title Scanner Finding Correlation
//! @author Ramprasad
//!
//! Maps third-party scanner findings onto the extracted function map to
//! decide which findings are actually exploitable through a public entry
//! point. Correlation is a pure function of its inputs and keeps no state
//! between calls.
//!
//! ## Key Types
//!
//! - [`CorrelationRule`] - Data-driven mapping from finding text to call names
//! - [`correlate`] - The correlation pass itself

use serde::{Deserialize, Serialize};

use crate::parser::{FunctionMap, Visibility};
use crate::report::{Decision, VulnerabilityAssessment};
use crate::scanners::VulnerabilityFinding;

/// Data-driven rule tying a class of scanner findings to call names.
///
/// A finding whose match text contains one of `finding_keywords` is
/// escalated when a public entry point's handler invokes one of
/// `call_names`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRule {
    /// Human-readable risk category, used in assessment reasons.
    pub category: String,

    /// Case-insensitive substrings matched against the finding text.
    pub finding_keywords: Vec<String>,

    /// Resolved call names that realize the risk inside a handler.
    pub call_names: Vec<String>,
}

/// Assesses each scanner finding against the extracted function map.
///
/// Findings are processed in order and produce exactly one assessment
/// each, so identical inputs yield identical output.
///
/// # Arguments
///
/// * `findings` - Structured scanner findings
/// * `functions` - Function map produced by the extractor
/// * `rules` - Correlation rules from the analysis policy
///
/// # Returns
///
/// One [`VulnerabilityAssessment`] per finding, in input order.
pub fn correlate(
    findings: &[VulnerabilityFinding],
    functions: &FunctionMap,
    rules: &[CorrelationRule],
) -> Vec<VulnerabilityAssessment> {
    findings
        .iter()
        .map(|finding| assess_finding(finding, functions, rules))
        .collect()
}

/// Produces the assessment for a single finding.
fn assess_finding(
    finding: &VulnerabilityFinding,
    functions: &FunctionMap,
    rules: &[CorrelationRule],
) -> VulnerabilityAssessment {
    let text = finding.match_text();

    let rule = rules.iter().find(|rule| {
        rule.finding_keywords
            .iter()
            .any(|keyword| text.contains(&keyword.to_lowercase()))
    });

    let Some(rule) = rule else {
        return VulnerabilityAssessment {
            id: finding.id.clone(),
            status: Decision::Allow,
            reason: "no risk category matched".to_string(),
        };
    };

    match find_public_invocation(functions, &rule.call_names) {
        Some((route_path, call_name, handler)) => VulnerabilityAssessment {
            id: finding.id.clone(),
            status: Decision::Block,
            reason: format!(
                "public route '{}' invokes '{}' in handler '{}' ({} risk)",
                route_path, call_name, handler, rule.category
            ),
        },
        None => VulnerabilityAssessment {
            id: finding.id.clone(),
            status: Decision::Allow,
            reason: "not reachable from untrusted origin".to_string(),
        },
    }
}

/// Finds the first public entry point whose handler invokes one of the
/// given call names.
///
/// # Returns
///
/// The route path, the matched call name, and the handler name.
fn find_public_invocation(
    functions: &FunctionMap,
    call_names: &[String],
) -> Option<(String, String, String)> {
    functions.values().find_map(|function| {
        if function.visibility != Some(Visibility::Public) {
            return None;
        }
        let call = function
            .called_names
            .iter()
            .find(|called| call_names.iter().any(|name| name == *called))?;
        let route_path = function
            .route_path
            .clone()
            .unwrap_or_else(|| function.name.clone());
        Some((route_path, call.clone(), function.name.clone()))
    })
}
