//! # Analysis Engine
//!
//! @title Admission Analysis Pipeline
//! @author Ramprasad
//!
//! Drives one submission through the full pipeline: parse, extract,
//! reachability, and scanner correlation. The two signal families are
//! combined with a logical OR, so either one can block a deployment on
//! its own. The engine holds only the immutable policy and can be shared
//! freely across threads.
//!
//! ## Pipeline Stages
//!
//! 1. Parse the submission (fail closed on syntax errors)
//! 2. Extract entry points, functions, and dangerous calls
//! 3. Walk the exposure graph from the origin to every sink
//! 4. Correlate external scanner findings with the function map

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::analysis::{correlate, decide, ORIGIN_ID};
use crate::config::AnalysisConfig;
use crate::parser::{extract, ParsedProgram};
use crate::report::{AnalysisResult, Decision};
use crate::scanners::{self, VulnerabilityFinding};

/// Stateless analysis engine configured with one policy.
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    config: Arc<AnalysisConfig>,
}

impl AnalysisEngine {
    /// Creates an engine from an analysis policy.
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Analyzes a submission, running external scanners when enabled.
    ///
    /// The submission is staged into a throwaway directory for the
    /// scanners; the dependency scanner only runs when a manifest was
    /// declared. Scanner failures degrade into warnings instead of
    /// failing the analysis.
    ///
    /// # Arguments
    ///
    /// * `code` - Python source of the submitted program
    /// * `declared_dependencies` - Dependency manifest text, if declared
    ///
    /// # Returns
    ///
    /// The full [`AnalysisResult`] for the submission.
    pub fn analyze_source(
        &self,
        code: &str,
        declared_dependencies: Option<&str>,
    ) -> AnalysisResult {
        if !self.config.scanners.enabled {
            return self.run_pipeline(code, &[], Vec::new());
        }

        let (findings, warnings) = self.scan_submission(code, declared_dependencies);
        self.run_pipeline(code, &findings, warnings)
    }

    /// Analyzes a submission against findings gathered elsewhere.
    ///
    /// Used when a caller already holds structured scanner findings and
    /// wants them correlated without re-running the scanners.
    pub fn analyze_with_findings(
        &self,
        code: &str,
        findings: &[VulnerabilityFinding],
    ) -> AnalysisResult {
        self.run_pipeline(code, findings, Vec::new())
    }

    /// Stages the submission and runs the external scanners over it.
    fn scan_submission(
        &self,
        code: &str,
        declared_dependencies: Option<&str>,
    ) -> (Vec<VulnerabilityFinding>, Vec<String>) {
        let staged = match stage_submission(code, declared_dependencies) {
            Ok(staged) => staged,
            Err(err) => {
                log::warn!("scanner staging failed: {}", err);
                return (
                    Vec::new(),
                    vec![format!(
                        "WARNING: scanner staging failed ({}); continuing without scanner findings.",
                        err
                    )],
                );
            }
        };

        scanners::gather_findings(
            &self.config.scanners,
            &staged.code_path,
            staged.requirements_path.as_deref(),
        )
    }

    /// Runs the analysis pipeline over one submission.
    ///
    /// The audit log records every stage in order. A submission that does
    /// not parse fails closed with a single syntax error log entry and an
    /// empty graph.
    fn run_pipeline(
        &self,
        code: &str,
        findings: &[VulnerabilityFinding],
        warnings: Vec<String>,
    ) -> AnalysisResult {
        let mut logs = vec!["START: Received analysis request.".to_string()];
        logs.extend(warnings);

        logs.push("INFO: Building Abstract Syntax Tree (AST)...".to_string());
        let program = match ParsedProgram::from_source(code) {
            Ok(program) => program,
            Err(err) => {
                log::error!("{}", err);
                return AnalysisResult {
                    decision: Decision::Error,
                    logs: vec![err.to_string()],
                    graph: Default::default(),
                    evidence: None,
                    vulnerabilities: None,
                };
            }
        };

        logs.push("INFO: Constructing Context Graph...".to_string());
        let extraction = extract(&self.config, &program);

        let mut decision;
        let mut evidence = None;

        if extraction.sink_order.is_empty() {
            logs.push(
                "SUCCESS: No dangerous sinks (e.g. subprocess, yaml.load) found in code."
                    .to_string(),
            );
            decision = Decision::Allow;
        } else {
            let outcome = decide(&extraction.graph, ORIGIN_ID, &extraction.sink_order);
            logs.extend(outcome.audit);
            decision = outcome.decision;
            evidence = outcome.evidence;
        }

        let vulnerabilities = if findings.is_empty() {
            None
        } else {
            let assessments = correlate(
                findings,
                &extraction.functions,
                &self.config.correlation_rules,
            );
            for (finding, assessment) in findings.iter().zip(&assessments) {
                let line = match assessment.status {
                    Decision::Block => format!(
                        "ALERT: {} finding '{}' ({}) is exploitable: {}",
                        finding.scanner, finding.id, finding.severity, assessment.reason
                    ),
                    _ => format!(
                        "INFO: {} finding '{}' ({}) is not exploitable: {}",
                        finding.scanner, finding.id, finding.severity, assessment.reason
                    ),
                };
                logs.push(line);
                decision = decision.combined_with(assessment.status);
            }
            Some(assessments)
        };

        if decision == Decision::Allow {
            if extraction.sink_order.is_empty() && findings.is_empty() {
                logs.push("INFO: Code looks clean.".to_string());
            } else {
                logs.push(
                    "INFO: Vulnerabilities found but marked SAFE due to lack of public reachability."
                        .to_string(),
                );
            }
        }

        AnalysisResult {
            decision,
            logs,
            graph: extraction.graph.export(),
            evidence,
            vulnerabilities,
        }
    }
}

/// A submission staged on disk for the external scanners.
///
/// The temporary directory lives as long as this value.
struct StagedSubmission {
    _dir: tempfile::TempDir,
    code_path: PathBuf,
    requirements_path: Option<PathBuf>,
}

fn stage_submission(
    code: &str,
    declared_dependencies: Option<&str>,
) -> io::Result<StagedSubmission> {
    let dir = tempfile::tempdir()?;

    let code_path = dir.path().join("app.py");
    fs::write(&code_path, code)?;

    let requirements_path = match declared_dependencies {
        Some(manifest) => {
            let path = dir.path().join("requirements.txt");
            fs::write(&path, manifest)?;
            Some(path)
        }
        None => None,
    };

    log::debug!("staged submission under {}", dir.path().display());

    Ok(StagedSubmission {
        _dir: dir,
        code_path,
        requirements_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;
    use crate::scanners::{FindingTarget, ScannerKind};

    const PUBLIC_KILL_CHAIN: &str = r#"
import subprocess
from fastapi import FastAPI

app = FastAPI()

@app.get("/deploy")
def deploy_service(cmd: str):
    subprocess.call(cmd, shell=True)
    return {"status": "ok"}
"#;

    const INTERNAL_ONLY: &str = r#"
import os
from fastapi import FastAPI

app = FastAPI()

@app.get("/internal/cleanup")
def cleanup():
    os.system("rm -rf /tmp/cache")
    return {"status": "ok"}
"#;

    const UNROUTED_SINK: &str = r#"
import os

def maintenance():
    os.system("logrotate /etc/logrotate.conf")
"#;

    const CLEAN: &str = r#"
from fastapi import FastAPI

app = FastAPI()

@app.get("/health")
def health():
    return {"status": "healthy"}
"#;

    const TWO_SINKS: &str = r#"
import os
import subprocess
from fastapi import FastAPI

app = FastAPI()

@app.get("/deploy")
def deploy_service(cmd: str):
    subprocess.call(cmd, shell=True)
    os.system(cmd)
"#;

    const MARSHAL_HANDLER: &str = r#"
import marshal
from fastapi import FastAPI

app = FastAPI()

@app.post("/restore")
def restore_state(blob: bytes):
    return marshal.loads(blob)
"#;

    fn engine() -> AnalysisEngine {
        let mut config = AnalysisConfig::default();
        config.scanners.enabled = false;
        AnalysisEngine::new(config)
    }

    fn package_finding(id: &str, package: &str, description: &str) -> VulnerabilityFinding {
        VulnerabilityFinding {
            id: id.to_string(),
            scanner: ScannerKind::Dependency,
            severity: Severity::Critical,
            description: description.to_string(),
            target: FindingTarget::Package {
                name: package.to_string(),
            },
        }
    }

    #[test]
    fn test_public_kill_chain_blocks() {
        let result = engine().analyze_source(PUBLIC_KILL_CHAIN, None);

        assert_eq!(result.decision, Decision::Block);
        assert!(result.logs.contains(
            &"CRITICAL: Kill Chain Detected! INTERNET -> ROUTE: /deploy -> deploy_service -> VULN: subprocess.call"
                .to_string()
        ));
        assert!(result.logs.contains(
            &"ALERT: Blocking deployment due to reachable 'subprocess.call'".to_string()
        ));
        assert_eq!(
            result.evidence,
            Some(vec![
                "INTERNET".to_string(),
                "ROUTE: /deploy".to_string(),
                "deploy_service".to_string(),
                "VULN: subprocess.call".to_string(),
            ])
        );
    }

    #[test]
    fn test_internal_route_allows_with_warning() {
        let result = engine().analyze_source(INTERNAL_ONLY, None);

        assert_eq!(result.decision, Decision::Allow);
        assert!(result.logs.contains(
            &"WARNING: Found 'os.system', but it is internal/safe (No path from INTERNET)."
                .to_string()
        ));
        assert!(result.logs.contains(
            &"INFO: Vulnerabilities found but marked SAFE due to lack of public reachability."
                .to_string()
        ));
        assert!(result.evidence.is_none());
    }

    #[test]
    fn test_unrouted_sink_allows() {
        let result = engine().analyze_source(UNROUTED_SINK, None);

        assert_eq!(result.decision, Decision::Allow);
        assert!(result
            .logs
            .iter()
            .any(|l| l.starts_with("WARNING: Found 'os.system'")));
    }

    #[test]
    fn test_clean_code_allows() {
        let result = engine().analyze_source(CLEAN, None);

        assert_eq!(result.decision, Decision::Allow);
        assert!(result.logs.contains(
            &"SUCCESS: No dangerous sinks (e.g. subprocess, yaml.load) found in code.".to_string()
        ));
        assert!(result.logs.contains(&"INFO: Code looks clean.".to_string()));
        assert_eq!(result.graph.nodes.len(), 3);
        assert_eq!(result.graph.edges.len(), 2);
    }

    #[test]
    fn test_syntax_error_fails_closed() {
        let result = engine().analyze_source("def broken(:\n    pass\n", None);

        assert_eq!(result.decision, Decision::Error);
        assert_eq!(result.logs.len(), 1);
        assert!(result.logs[0].starts_with("Syntax Error:"));
        assert!(result.graph.nodes.is_empty());
        assert!(result.graph.edges.is_empty());
        assert!(result.evidence.is_none());
        assert!(result.vulnerabilities.is_none());
    }

    #[test]
    fn test_first_reachable_sink_wins() {
        let result = engine().analyze_source(TWO_SINKS, None);

        assert_eq!(result.decision, Decision::Block);
        assert_eq!(
            result.evidence.as_ref().and_then(|path| path.last()),
            Some(&"VULN: subprocess.call".to_string())
        );
        assert!(!result.logs.iter().any(|l| l.contains("os.system")));
    }

    #[test]
    fn test_audit_log_orders_stages() {
        let result = engine().analyze_source(CLEAN, None);

        assert_eq!(result.logs[0], "START: Received analysis request.");
        assert_eq!(result.logs[1], "INFO: Building Abstract Syntax Tree (AST)...");
        assert_eq!(result.logs[2], "INFO: Constructing Context Graph...");
    }

    #[test]
    fn test_decisions_are_deterministic() {
        let engine = engine();

        let first = engine.analyze_source(PUBLIC_KILL_CHAIN, None);
        let second = engine.analyze_source(PUBLIC_KILL_CHAIN, None);

        assert_eq!(first, second);
    }

    #[test]
    fn test_correlation_blocks_without_reachable_sink() {
        let finding = package_finding(
            "CVE-2024-9999",
            "marshal-kit",
            "unsafe marshal deserialization",
        );

        let result = engine().analyze_with_findings(MARSHAL_HANDLER, &[finding]);

        // marshal.loads is not on the sink list, so reachability alone allows.
        assert!(result.logs.contains(
            &"SUCCESS: No dangerous sinks (e.g. subprocess, yaml.load) found in code.".to_string()
        ));
        assert_eq!(result.decision, Decision::Block);

        let assessments = result.vulnerabilities.unwrap();
        assert_eq!(assessments.len(), 1);
        assert_eq!(assessments[0].status, Decision::Block);
        assert!(assessments[0].reason.contains("/restore"));
        assert!(result
            .logs
            .iter()
            .any(|l| l.starts_with("ALERT: dependency finding 'CVE-2024-9999'")));
    }

    #[test]
    fn test_uncategorized_finding_stays_allowed() {
        let finding = package_finding("CVE-2024-0001", "leftpad", "prototype pollution");

        let result = engine().analyze_with_findings(CLEAN, &[finding]);

        assert_eq!(result.decision, Decision::Allow);
        let assessments = result.vulnerabilities.unwrap();
        assert_eq!(assessments[0].reason, "no risk category matched");
        assert!(result
            .logs
            .iter()
            .any(|l| l.starts_with("INFO: dependency finding 'CVE-2024-0001'")));
    }

    #[test]
    fn test_finding_without_public_path_stays_allowed() {
        let finding = package_finding(
            "GHSA-shell-0001",
            "shellkit",
            "shell command injection helper",
        );

        let result = engine().analyze_with_findings(INTERNAL_ONLY, &[finding]);

        assert_eq!(result.decision, Decision::Allow);
        let assessments = result.vulnerabilities.unwrap();
        assert_eq!(assessments[0].reason, "not reachable from untrusted origin");
    }

    #[test]
    fn test_benign_finding_never_unblocks() {
        let finding = package_finding("CVE-2024-0001", "leftpad", "prototype pollution");

        let result = engine().analyze_with_findings(PUBLIC_KILL_CHAIN, &[finding]);

        assert_eq!(result.decision, Decision::Block);
    }

    #[test]
    fn test_disabled_scanners_match_no_findings() {
        let engine = engine();

        let via_source = engine.analyze_source(PUBLIC_KILL_CHAIN, Some("PyYAML==5.3.1\n"));
        let via_findings = engine.analyze_with_findings(PUBLIC_KILL_CHAIN, &[]);

        assert_eq!(via_source, via_findings);
    }

    #[test]
    fn test_missing_scanners_degrade_into_warnings() {
        let mut config = AnalysisConfig::default();
        config.scanners.dependency_command = vec!["route-sentinel-no-such-trivy".to_string()];
        config.scanners.pattern_command = vec!["route-sentinel-no-such-semgrep".to_string()];
        let engine = AnalysisEngine::new(config);

        let result = engine.analyze_source(CLEAN, Some("PyYAML==5.3.1\n"));

        assert_eq!(result.decision, Decision::Allow);
        assert!(result
            .logs
            .iter()
            .any(|l| l.contains("dependency scanner degraded")));
        assert!(result
            .logs
            .iter()
            .any(|l| l.contains("pattern scanner degraded")));
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_shareable<T: Send + Sync + Clone>() {}
        assert_shareable::<AnalysisEngine>();
    }

    #[test]
    fn test_concurrent_analyses_agree() {
        let engine = engine();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                std::thread::spawn(move || engine.analyze_source(PUBLIC_KILL_CHAIN, None))
            })
            .collect();

        for handle in handles {
            let result = handle.join().unwrap();
            assert_eq!(result.decision, Decision::Block);
        }
    }
}
