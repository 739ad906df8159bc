//! # Analysis Policy
//!
//! @title Configurable Analysis Policy
//! @author Ramprasad
//!
//! Everything the analysis treats as data rather than code: the sink
//! list, the route decorator verbs, the internal path prefixes, the
//! correlation rules, and the scanner commands. A policy file overrides
//! individual fields; anything unspecified keeps its default.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::CorrelationRule;

/// Full analysis policy for one engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Resolved call names treated as dangerous sinks.
    #[serde(default = "default_sink_names")]
    pub sink_names: Vec<String>,

    /// Decorator attribute names recognized as route registrations.
    #[serde(default = "default_route_verbs")]
    pub route_verbs: Vec<String>,

    /// Route path prefixes that mark an entry point as internal.
    #[serde(default = "default_internal_prefixes")]
    pub internal_prefixes: Vec<String>,

    /// Rules mapping scanner finding text to risky call names.
    #[serde(default = "default_correlation_rules")]
    pub correlation_rules: Vec<CorrelationRule>,

    /// External scanner commands and limits.
    #[serde(default)]
    pub scanners: ScannerConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sink_names: default_sink_names(),
            route_verbs: default_route_verbs(),
            internal_prefixes: default_internal_prefixes(),
            correlation_rules: default_correlation_rules(),
            scanners: ScannerConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Loads a policy file, filling unspecified fields with defaults.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to a JSON policy file
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or does not parse as a policy.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read policy file {}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse policy file {}", path.display()))?;
        Ok(config)
    }
}

/// External scanner commands and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Whether external scanners run at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Dependency scanner command; the manifest path is appended.
    #[serde(default = "default_dependency_command")]
    pub dependency_command: Vec<String>,

    /// Pattern scanner command; the source path is appended.
    #[serde(default = "default_pattern_command")]
    pub pattern_command: Vec<String>,

    /// Wall-clock budget per scanner invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            dependency_command: default_dependency_command(),
            pattern_command: default_pattern_command(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn default_sink_names() -> Vec<String> {
    strings(&[
        "yaml.load",
        "subprocess.call",
        "subprocess.run",
        "subprocess.Popen",
        "os.system",
        "os.popen",
        "eval",
        "exec",
        "pickle.loads",
    ])
}

fn default_route_verbs() -> Vec<String> {
    strings(&["get", "post", "put", "delete"])
}

fn default_internal_prefixes() -> Vec<String> {
    strings(&["/internal", "/admin"])
}

fn default_correlation_rules() -> Vec<CorrelationRule> {
    vec![
        CorrelationRule {
            category: "deserialization".to_string(),
            finding_keywords: strings(&["pickle", "yaml", "marshal", "deserial"]),
            call_names: strings(&[
                "yaml.load",
                "pickle.load",
                "pickle.loads",
                "marshal.loads",
            ]),
        },
        CorrelationRule {
            category: "command execution".to_string(),
            finding_keywords: strings(&["subprocess", "shell", "command injection", "os-command"]),
            call_names: strings(&[
                "os.system",
                "os.popen",
                "subprocess.call",
                "subprocess.run",
                "subprocess.Popen",
            ]),
        },
    ]
}

fn default_enabled() -> bool {
    true
}

fn default_dependency_command() -> Vec<String> {
    strings(&["trivy", "fs", "--format", "json", "--quiet"])
}

fn default_pattern_command() -> Vec<String> {
    strings(&["semgrep", "--config", "p/python", "--json", "--quiet"])
}

fn default_timeout_secs() -> u64 {
    30
}
