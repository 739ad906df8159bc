//! # Pattern Scanner
//!
//! @title Semgrep Report Parsing
//! @author Ramprasad
//!
//! Runs Semgrep against the staged source file and lifts its results
//! into structured findings keyed by check id and location.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::config::ScannerConfig;
use crate::report::Severity;

use super::runner::run_tool;
use super::{FindingTarget, ScannerError, ScannerKind, VulnerabilityFinding};

/// Top level of a Semgrep JSON report.
#[derive(Debug, Deserialize)]
struct SemgrepReport {
    #[serde(default)]
    results: Vec<JsonValue>,
}

/// Scans the staged source file for suspicious code patterns.
///
/// # Arguments
///
/// * `config` - Scanner commands and timeout
/// * `code_path` - Staged source file to scan
///
/// # Errors
///
/// Propagates [`ScannerError`] when Semgrep cannot run or its report
/// does not parse.
pub fn scan(
    config: &ScannerConfig,
    code_path: &Path,
) -> Result<Vec<VulnerabilityFinding>, ScannerError> {
    let mut command = config.pattern_command.clone();
    command.push(code_path.display().to_string());

    let output = run_tool(&command, config.timeout_secs)?;
    parse_report(&output.stdout)
}

fn parse_report(stdout: &str) -> Result<Vec<VulnerabilityFinding>, ScannerError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let report: SemgrepReport = serde_json::from_str(stdout)?;
    let findings = report
        .results
        .iter()
        .filter_map(|record| {
            let finding = finding_from_record(record);
            if finding.is_none() {
                log::warn!("skipping pattern record without check id or location: {}", record);
            }
            finding
        })
        .collect();
    Ok(findings)
}

/// Lifts one Semgrep result into a finding.
///
/// Returns `None` when the result lacks a check id, path, or start line.
fn finding_from_record(record: &JsonValue) -> Option<VulnerabilityFinding> {
    let check_id = record.get("check_id")?.as_str()?;
    let file = record.get("path")?.as_str()?;
    let line = record.get("start")?.get("line")?.as_u64()? as usize;

    let extra = record.get("extra");
    let severity = extra
        .and_then(|e| e.get("severity"))
        .and_then(|s| s.as_str())
        .map(severity_from_semgrep)
        .unwrap_or(Severity::Info);
    let snippet = extra
        .and_then(|e| e.get("lines"))
        .and_then(|l| l.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    let description = extra
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("suspicious code pattern")
        .to_string();

    Some(VulnerabilityFinding {
        id: check_id.to_string(),
        scanner: ScannerKind::Pattern,
        severity,
        description,
        target: FindingTarget::Code {
            file: file.to_string(),
            line,
            snippet,
        },
    })
}

/// Maps Semgrep's severity vocabulary onto ours.
fn severity_from_semgrep(value: &str) -> Severity {
    match value.to_uppercase().as_str() {
        "ERROR" => Severity::High,
        "WARNING" => Severity::Medium,
        _ => Severity::Info,
    }
}
