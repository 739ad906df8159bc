//! # Scanner Boundary
//!
//! @title External Scanner Integration
//! @author Ramprasad
//!
//! Wraps the third-party scanners behind one structured finding type so
//! the analysis core never parses tool output itself. Trivy covers
//! dependency advisories, Semgrep covers code patterns. An unavailable
//! scanner degrades the analysis with a warning instead of failing it.
//!
//! ## Components
//!
//! - [`runner`] - Subprocess execution with timeout
//! - [`dependency`] - Trivy report parsing
//! - [`pattern`] - Semgrep report parsing

mod dependency;
mod pattern;
mod runner;

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ScannerConfig;
use crate::report::Severity;

/// Which scanner produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerKind {
    /// Dependency advisory scanner (Trivy).
    Dependency,

    /// Code pattern scanner (Semgrep).
    Pattern,
}

impl std::fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScannerKind::Dependency => write!(f, "dependency"),
            ScannerKind::Pattern => write!(f, "pattern"),
        }
    }
}

/// What a finding points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FindingTarget {
    /// A declared dependency.
    Package { name: String },

    /// A location in the submitted source.
    Code {
        file: String,
        line: usize,
        snippet: String,
    },
}

/// One structured scanner finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityFinding {
    /// Advisory or check identifier as reported by the scanner.
    pub id: String,

    /// Scanner that produced the finding.
    pub scanner: ScannerKind,

    /// Severity as mapped from the scanner's vocabulary.
    pub severity: Severity,

    /// Human-readable summary from the scanner.
    pub description: String,

    /// The package or code location the finding points at.
    pub target: FindingTarget,
}

impl VulnerabilityFinding {
    /// Lowercased text the correlation rules match keywords against.
    ///
    /// Combines the identifier, the description, and the package name or
    /// code snippet so a rule keyword can hit any of them.
    pub fn match_text(&self) -> String {
        let target = match &self.target {
            FindingTarget::Package { name } => name.as_str(),
            FindingTarget::Code { snippet, .. } => snippet.as_str(),
        };
        format!("{} {} {}", self.id, self.description, target).to_lowercase()
    }
}

/// Why a scanner could not contribute findings.
#[derive(Error, Debug)]
pub enum ScannerError {
    /// The configured command had no program to run.
    #[error("scanner command is empty")]
    EmptyCommand,

    /// The scanner binary could not be spawned.
    #[error("scanner '{command}' could not be started")]
    Unavailable {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The scanner ran past its deadline and was killed.
    #[error("scanner '{command}' timed out after {seconds}s")]
    TimedOut { command: String, seconds: u64 },

    /// The scanner exited but its report did not parse.
    #[error("scanner produced a malformed report: {0}")]
    MalformedReport(#[from] serde_json::Error),
}

/// Runs every applicable scanner over the staged submission.
///
/// The dependency scanner only runs when a manifest was declared; the
/// pattern scanner always runs. A failing scanner contributes a warning
/// line instead of findings, so analysis continues on the remaining
/// signals.
///
/// # Arguments
///
/// * `config` - Scanner commands and timeout
/// * `code_path` - Staged source file
/// * `requirements_path` - Staged dependency manifest, if declared
///
/// # Returns
///
/// The collected findings and any degradation warnings, both in scanner
/// order.
pub fn gather_findings(
    config: &ScannerConfig,
    code_path: &Path,
    requirements_path: Option<&Path>,
) -> (Vec<VulnerabilityFinding>, Vec<String>) {
    let mut findings = Vec::new();
    let mut warnings = Vec::new();

    if let Some(requirements) = requirements_path {
        match dependency::scan(config, requirements) {
            Ok(mut scanned) => findings.append(&mut scanned),
            Err(err) => degrade(ScannerKind::Dependency, err, &mut warnings),
        }
    }

    match pattern::scan(config, code_path) {
        Ok(mut scanned) => findings.append(&mut scanned),
        Err(err) => degrade(ScannerKind::Pattern, err, &mut warnings),
    }

    (findings, warnings)
}

fn degrade(kind: ScannerKind, err: ScannerError, warnings: &mut Vec<String>) {
    log::warn!("{} scanner degraded: {}", kind, err);
    warnings.push(format!(
        "WARNING: {} scanner degraded ({}); continuing without its findings.",
        kind, err
    ));
}
