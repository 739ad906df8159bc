//! # Report Generation Module
//!
//! @title Analysis Result Rendering
//! @author Ramprasad
//!
//! Defines the analysis result returned to callers and renders it as
//! colorized terminal output, JSON, or a Markdown document for CI/CD
//! integration.
//!
//! ## Key Types
//!
//! - [`AnalysisResult`] - Complete outcome of one analysis request
//! - [`Decision`] - Final ALLOW / BLOCK / ERROR verdict
//! - [`VulnerabilityAssessment`] - Per-finding correlation verdict
//! - [`Severity`] - Severity classification for scanner findings

mod decision;

pub use decision::{Decision, Severity, VulnerabilityAssessment};

use colored::*;
use serde::{Deserialize, Serialize};

use crate::analysis::graph::GraphExport;

/// Complete outcome of one analysis request.
///
/// Carries the decision, the ordered audit log that led to it, the exposure
/// graph for visualization, and optional per-finding assessments when
/// scanner findings were supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Final admission decision.
    pub decision: Decision,

    /// Ordered audit log of every analysis step.
    pub logs: Vec<String>,

    /// Exposure graph in export form.
    pub graph: GraphExport,

    /// Shortest origin-to-sink node path when a kill chain was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<String>>,

    /// Correlation verdicts, present only when scanner findings were assessed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vec<VulnerabilityAssessment>>,
}

impl AnalysisResult {
    /// Prints colorized output to the terminal.
    ///
    /// Displays the decision banner, the audit log, the kill chain when one
    /// was found, and the scanner finding assessments.
    pub fn print_terminal(&self) {
        println!("\n{}", "=".repeat(60).cyan());
        println!("{} {}", "[*] Decision:".white().bold(), self.decision.colored_label());
        println!("{}", "=".repeat(60).cyan());

        println!("\n{}", "[*] Audit Log:".white().bold());
        for line in &self.logs {
            print_log_line(line);
        }

        if let Some(ref chain) = self.evidence {
            println!("\n{}", "[!] Kill Chain:".red().bold());
            println!("    {}", chain.join(" -> ").red());
        }

        if let Some(ref assessments) = self.vulnerabilities {
            println!("\n{}", "[*] Scanner Findings:".white().bold());
            for (i, assessment) in assessments.iter().enumerate() {
                assessment.print_terminal(i + 1);
            }
        }

        println!(
            "\n{}",
            format!(
                "[*] Graph: {} node(s), {} edge(s)",
                self.graph.nodes.len(),
                self.graph.edges.len()
            )
            .dimmed()
        );
    }

    /// Serializes the result as pretty-printed JSON.
    ///
    /// # Returns
    ///
    /// A JSON string, or a serialization error.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Converts the result to Markdown format.
    ///
    /// # Returns
    ///
    /// A Markdown-formatted string representation of the result.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("# Route-Sentinel Analysis\n\n");
        md.push_str(&format!("**Decision:** `{}`\n\n", self.decision));

        md.push_str("## Audit Log\n\n");
        md.push_str("```\n");
        for line in &self.logs {
            md.push_str(line);
            md.push('\n');
        }
        md.push_str("```\n\n");

        if let Some(ref chain) = self.evidence {
            md.push_str("## Kill Chain\n\n");
            md.push_str(&format!("`{}`\n\n", chain.join(" -> ")));
        }

        if let Some(ref assessments) = self.vulnerabilities {
            md.push_str("## Scanner Findings\n\n");
            md.push_str("| Finding | Status | Reason |\n");
            md.push_str("|---------|--------|--------|\n");
            for assessment in assessments {
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    assessment.id, assessment.status, assessment.reason
                ));
            }
            md.push('\n');
        }

        md.push_str(&format!(
            "## Graph\n\n{} node(s), {} edge(s)\n",
            self.graph.nodes.len(),
            self.graph.edges.len()
        ));

        md
    }
}

/// Prints one audit log line with a color chosen from its prefix.
fn print_log_line(line: &str) {
    if line.starts_with("CRITICAL") || line.starts_with("ALERT") || line.starts_with("FATAL") {
        println!("  {}", line.red());
    } else if line.starts_with("WARNING") {
        println!("  {}", line.yellow());
    } else if line.starts_with("SUCCESS") {
        println!("  {}", line.green());
    } else {
        println!("  {}", line.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            decision: Decision::Block,
            logs: vec![
                "START: Received analysis request.".to_string(),
                "CRITICAL: Kill Chain Detected! INTERNET -> ROUTE: /deploy".to_string(),
            ],
            graph: GraphExport::default(),
            evidence: Some(vec![
                "INTERNET".to_string(),
                "ROUTE: /deploy".to_string(),
            ]),
            vulnerabilities: Some(vec![VulnerabilityAssessment {
                id: "CVE-2020-14343".to_string(),
                status: Decision::Block,
                reason: "public route '/deploy' invokes 'yaml.load'".to_string(),
            }]),
        }
    }

    #[test]
    fn test_json_round_trip() {
        let result = sample_result();
        let json = result.to_json().unwrap();
        let parsed: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_json_omits_empty_sections() {
        let result = AnalysisResult {
            decision: Decision::Allow,
            logs: vec![],
            graph: GraphExport::default(),
            evidence: None,
            vulnerabilities: None,
        };
        let json = result.to_json().unwrap();
        assert!(!json.contains("evidence"));
        assert!(!json.contains("vulnerabilities"));
    }

    #[test]
    fn test_markdown_contains_decision_and_chain() {
        let md = sample_result().to_markdown();
        assert!(md.contains("`BLOCK`"));
        assert!(md.contains("INTERNET -> ROUTE: /deploy"));
        assert!(md.contains("CVE-2020-14343"));
    }
}
