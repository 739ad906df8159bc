//! # Route-Sentinel CLI Entry Point
//!
//! @title Route-Sentinel CLI
//! @author Ramprasad
//!
//! This module provides the main entry point for the Route-Sentinel
//! deployment admission gate.

use anyhow::Result;
use clap::Parser;
use colored::*;
use std::path::PathBuf;

use route_sentinel::cli::Commands;
use route_sentinel::{AnalysisConfig, AnalysisEngine, Cli};

/// ASCII art banner displayed at startup.
const BANNER: &str = r#"
 ____             _           ____             _   _            _
|  _ \ ___  _   _| |_ ___    / ___|  ___ _ __ | |_(_)_ __   ___| |
| |_) / _ \| | | | __/ _ \   \___ \ / _ \ '_ \| __| | '_ \ / _ \ |
|  _ < (_) | |_| | ||  __/    ___) |  __/ | | | |_| | | | |  __/ |
|_| \_\___/ \__,_|\__\___|   |____/ \___|_| |_|\__|_|_| |_|\___|_|

           Deployment Admission Gate for Python Web Services
"#;

/// Application entry point.
///
/// Initializes the logging system, displays the banner, parses command-line
/// arguments, and dispatches to the appropriate command handler.
///
/// # Returns
///
/// Returns `Ok(())` on successful execution, or an error if any operation fails.
/// The `analyze` command additionally exits with the decision's code.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("{}", BANNER.cyan().bold());

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            requirements,
            format,
            policy,
            no_scanners,
            scanner_timeout,
        } => {
            let code = run_analyze(path, requirements, format, policy, no_scanners, scanner_timeout)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Policy { policy } => {
            run_policy(policy)?;
        }
        Commands::Version => {
            println!(
                "{} {}",
                "Route-Sentinel version:".green(),
                env!("CARGO_PKG_VERSION").yellow()
            );
        }
    }

    Ok(())
}

/// Executes the admission analysis.
///
/// This function orchestrates the complete analysis workflow:
/// 1. Loads the analysis policy and applies CLI overrides
/// 2. Reads the submitted source and optional dependency manifest
/// 3. Runs the analysis engine over the submission
/// 4. Renders the result in the requested format
///
/// # Arguments
///
/// * `path` - Path to the submitted Python source file
/// * `requirements` - Optional path to the dependency manifest
/// * `format` - Output format: "terminal", "json", or "markdown"
/// * `policy` - Optional path to a JSON policy file
/// * `no_scanners` - Whether to skip the external scanners
/// * `scanner_timeout` - Optional per-scanner timeout override
///
/// # Returns
///
/// The process exit code for the decision: 0 ALLOW, 1 BLOCK, 2 ERROR.
fn run_analyze(
    path: PathBuf,
    requirements: Option<PathBuf>,
    format: String,
    policy: Option<PathBuf>,
    no_scanners: bool,
    scanner_timeout: Option<u64>,
) -> Result<i32> {
    println!(
        "{} {}",
        "[*] Analyzing:".green().bold(),
        path.display().to_string().yellow()
    );

    let mut config = load_policy(policy)?;
    if no_scanners {
        config.scanners.enabled = false;
    }
    if let Some(seconds) = scanner_timeout {
        config.scanners.timeout_secs = seconds;
    }

    let code = std::fs::read_to_string(&path)?;
    let manifest = match &requirements {
        Some(manifest_path) => Some(std::fs::read_to_string(manifest_path)?),
        None => None,
    };

    let engine = AnalysisEngine::new(config);
    let result = engine.analyze_source(&code, manifest.as_deref());

    match format.as_str() {
        "json" => {
            println!("{}", result.to_json()?);
        }
        "markdown" => {
            println!("{}", result.to_markdown());
        }
        _ => {
            result.print_terminal();
        }
    }

    Ok(result.decision.exit_code())
}

/// Loads the analysis policy, falling back to the built-in defaults.
fn load_policy(policy: Option<PathBuf>) -> Result<AnalysisConfig> {
    match policy {
        Some(path) => {
            println!(
                "{} {}",
                "[*] Policy:".green().bold(),
                path.display().to_string().yellow()
            );
            AnalysisConfig::from_file(&path)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

/// Displays the effective analysis policy.
///
/// Prints the policy as pretty JSON after applying any policy file, so
/// operators can see exactly which sinks, verbs, and rules are active.
fn run_policy(policy: Option<PathBuf>) -> Result<()> {
    let config = load_policy(policy)?;

    println!("{}", "[*] Effective analysis policy:".green().bold());
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}
