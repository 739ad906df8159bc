//! # CLI Module
//!
//! @title Command Line Interface
//! @author Ramprasad
//!
//! This module defines the command-line interface for Route-Sentinel using
//! the `clap` derive macros for declarative argument parsing.
//!
//! ## Commands
//!
//! - `analyze` - Decide whether a submitted Python service is safe to deploy
//! - `policy` - Display the effective analysis policy
//! - `version` - Show version information

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Route-Sentinel command-line interface.
///
/// A deployment admission gate for Python web services. Builds an
/// exposure graph from the submitted source and blocks deployments where
/// a dangerous call is reachable from the public internet.
#[derive(Parser, Debug)]
#[command(name = "route-sentinel")]
#[command(author = "RamprasadGoud")]
#[command(version)]
#[command(about = "Deployment admission gate for Python web services")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the Route-Sentinel CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a submitted Python service and decide its admission.
    ///
    /// Parses the source, builds the exposure graph, checks whether any
    /// dangerous call is reachable from the public internet, and
    /// correlates external scanner findings. Exits 0 on ALLOW, 1 on
    /// BLOCK, and 2 when the submission could not be analyzed.
    Analyze {
        /// Path to the Python source file to analyze.
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Path to the declared dependency manifest.
        ///
        /// When given, the dependency scanner checks the manifest for
        /// known vulnerable packages.
        #[arg(short, long)]
        requirements: Option<PathBuf>,

        /// Output format for the analysis report.
        ///
        /// Supported formats:
        /// - `terminal`: Colorized console output (default)
        /// - `json`: Machine-readable JSON format
        /// - `markdown`: Human-readable Markdown report
        #[arg(short, long, default_value = "terminal")]
        format: String,

        /// Path to a JSON policy file overriding the default policy.
        ///
        /// Unspecified policy fields keep their defaults.
        #[arg(short, long)]
        policy: Option<PathBuf>,

        /// Skip the external scanners entirely.
        ///
        /// The reachability analysis still runs; only the scanner
        /// findings are missing.
        #[arg(long)]
        no_scanners: bool,

        /// Wall-clock budget per scanner invocation, in seconds.
        #[arg(long, value_name = "SECONDS")]
        scanner_timeout: Option<u64>,
    },

    /// Display the effective analysis policy as JSON.
    ///
    /// Shows the sink list, route verbs, internal prefixes, correlation
    /// rules, and scanner commands after applying any policy file.
    Policy {
        /// Path to a JSON policy file overriding the default policy.
        #[arg(short, long)]
        policy: Option<PathBuf>,
    },

    /// Print version information.
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    /// Verify that the CLI definition is valid.
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
