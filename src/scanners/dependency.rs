//! # Dependency Scanner
//!
//! @title Trivy Report Parsing
//! @author Ramprasad
//!
//! Runs Trivy against the declared dependency manifest and lifts its
//! report into structured findings. Records missing the fields the
//! correlation step keys on are skipped with a warning rather than
//! failing the whole scan.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::config::ScannerConfig;
use crate::report::Severity;

use super::runner::run_tool;
use super::{FindingTarget, ScannerError, ScannerKind, VulnerabilityFinding};

/// Top level of a Trivy JSON report.
#[derive(Debug, Deserialize)]
struct TrivyReport {
    #[serde(rename = "Results", default)]
    results: Vec<TrivyResult>,
}

/// One scanned target inside a Trivy report.
#[derive(Debug, Deserialize)]
struct TrivyResult {
    #[serde(rename = "Vulnerabilities", default)]
    vulnerabilities: Vec<JsonValue>,
}

/// Scans the dependency manifest for known vulnerable packages.
///
/// # Arguments
///
/// * `config` - Scanner commands and timeout
/// * `requirements_path` - Staged dependency manifest to scan
///
/// # Errors
///
/// Propagates [`ScannerError`] when Trivy cannot run or its report does
/// not parse.
pub fn scan(
    config: &ScannerConfig,
    requirements_path: &Path,
) -> Result<Vec<VulnerabilityFinding>, ScannerError> {
    let mut command = config.dependency_command.clone();
    command.push(requirements_path.display().to_string());

    let output = run_tool(&command, config.timeout_secs)?;
    parse_report(&output.stdout)
}

fn parse_report(stdout: &str) -> Result<Vec<VulnerabilityFinding>, ScannerError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let report: TrivyReport = serde_json::from_str(stdout)?;
    let findings = report
        .results
        .iter()
        .flat_map(|result| result.vulnerabilities.iter())
        .filter_map(|record| {
            let finding = finding_from_record(record);
            if finding.is_none() {
                log::warn!("skipping dependency record without id or package: {}", record);
            }
            finding
        })
        .collect();
    Ok(findings)
}

/// Lifts one Trivy vulnerability record into a finding.
///
/// Returns `None` when the record lacks an advisory id or package name.
fn finding_from_record(record: &JsonValue) -> Option<VulnerabilityFinding> {
    let id = record.get("VulnerabilityID")?.as_str()?;
    let package = record.get("PkgName")?.as_str()?;

    let severity = record
        .get("Severity")
        .and_then(|s| s.as_str())
        .map(Severity::from_str)
        .unwrap_or(Severity::Info);
    let description = record
        .get("Title")
        .or_else(|| record.get("Description"))
        .and_then(|d| d.as_str())
        .unwrap_or("known vulnerable dependency")
        .to_string();

    Some(VulnerabilityFinding {
        id: id.to_string(),
        scanner: ScannerKind::Dependency,
        severity,
        description,
        target: FindingTarget::Package {
            name: package.to_string(),
        },
    })
}
