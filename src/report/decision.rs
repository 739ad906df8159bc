//! # Decision and Severity Definitions
//!
//! @title Admission Decision Data Structures
//! @author Ramprasad
//!
//! Defines the core data structures for representing admission decisions,
//! scanner finding severity, and per-finding assessments.

use colored::*;
use serde::{Deserialize, Serialize};

/// Final admission decision for a submitted program.
///
/// `Block` wins over `Allow` when signals are combined, and `Error` is
/// reserved for submissions that could not be analyzed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    /// The submission may be deployed.
    Allow,

    /// The submission must not be deployed.
    Block,

    /// The submission could not be analyzed.
    Error,
}

impl Decision {
    /// Combines two decision signals into one.
    ///
    /// `Error` dominates, then `Block`; a submission is only allowed when
    /// every signal allows it.
    ///
    /// # Arguments
    ///
    /// * `other` - The second decision signal
    ///
    /// # Returns
    ///
    /// The combined `Decision`.
    pub fn combined_with(self, other: Decision) -> Decision {
        match (self, other) {
            (Decision::Error, _) | (_, Decision::Error) => Decision::Error,
            (Decision::Block, _) | (_, Decision::Block) => Decision::Block,
            _ => Decision::Allow,
        }
    }

    /// Returns a colored label for terminal output.
    pub fn colored_label(&self) -> ColoredString {
        match self {
            Decision::Allow => "ALLOW".white().on_green().bold(),
            Decision::Block => "BLOCK".white().on_red().bold(),
            Decision::Error => "ERROR".black().on_yellow().bold(),
        }
    }

    /// Returns the process exit code associated with the decision.
    pub fn exit_code(&self) -> i32 {
        match self {
            Decision::Allow => 0,
            Decision::Block => 1,
            Decision::Error => 2,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Allow => write!(f, "ALLOW"),
            Decision::Block => write!(f, "BLOCK"),
            Decision::Error => write!(f, "ERROR"),
        }
    }
}

/// Severity level classification for scanner findings.
///
/// Ordered from lowest to highest severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational finding, no direct security impact.
    Info = 0,

    /// Low severity, minimal security impact.
    Low = 1,

    /// Medium severity, moderate security impact.
    Medium = 2,

    /// High severity, significant security impact.
    High = 3,

    /// Critical severity, severe security impact.
    Critical = 4,
}

impl Severity {
    /// Parses a severity level from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of severity
    ///
    /// # Returns
    ///
    /// The corresponding `Severity` variant, defaulting to `Info` for unknown values.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Info,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Verdict for a single scanner finding after correlation.
///
/// A finding keeps its scanner identifier; the status says whether the
/// finding is actually exploitable through a public entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityAssessment {
    /// Identifier of the finding as reported by the scanner.
    pub id: String,

    /// Whether the finding blocks deployment.
    pub status: Decision,

    /// Explanation of how the status was reached.
    pub reason: String,
}

impl VulnerabilityAssessment {
    /// Prints the assessment to terminal with color formatting.
    ///
    /// # Arguments
    ///
    /// * `index` - The assessment number for display.
    pub fn print_terminal(&self, index: usize) {
        println!(
            "  {} {} {}",
            format!("#{}", index).cyan().bold(),
            self.status.colored_label(),
            self.id.white().bold()
        );
        println!("     {}", self.reason.dimmed());
    }
}
