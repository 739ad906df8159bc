//! # Scanner Process Runner
//!
//! @title External Tool Execution
//! @author Ramprasad
//!
//! Runs scanner subprocesses with a polling timeout. Output pipes are
//! read after the process exits, and a process that outlives its
//! deadline is killed and reported as timed out.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::ScannerError;

/// Captured output of a finished scanner process.
#[derive(Debug)]
pub struct ToolOutput {
    /// Standard output, expected to hold the JSON report.
    pub stdout: String,

    /// Standard error, kept for diagnostics.
    pub stderr: String,

    /// Process exit code, if the platform reports one.
    pub status_code: Option<i32>,
}

/// Runs one scanner command to completion.
///
/// Scanners signal findings through their report, not their exit code,
/// so a non-zero status is not an error here.
///
/// # Arguments
///
/// * `command` - Program followed by its arguments
/// * `timeout_secs` - Wall-clock budget for the process
///
/// # Returns
///
/// The captured [`ToolOutput`].
///
/// # Errors
///
/// Returns [`ScannerError::Unavailable`] when the program cannot be
/// spawned and [`ScannerError::TimedOut`] when the deadline passes.
pub fn run_tool(command: &[String], timeout_secs: u64) -> Result<ToolOutput, ScannerError> {
    let (program, args) = command.split_first().ok_or(ScannerError::EmptyCommand)?;

    log::debug!("running scanner: {} {:?}", program, args);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ScannerError::Unavailable {
            command: program.clone(),
            source,
        })?;

    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ScannerError::TimedOut {
                        command: program.clone(),
                        seconds: timeout_secs,
                    });
                }
                thread::sleep(Duration::from_millis(100));
            }
            Err(source) => {
                return Err(ScannerError::Unavailable {
                    command: program.clone(),
                    source,
                });
            }
        }
    };

    let mut stdout = String::new();
    if let Some(mut pipe) = child.stdout.take() {
        let _ = pipe.read_to_string(&mut stdout);
    }
    let mut stderr = String::new();
    if let Some(mut pipe) = child.stderr.take() {
        let _ = pipe.read_to_string(&mut stderr);
    }

    log::debug!("scanner {} exited with status {:?}", program, status.code());

    Ok(ToolOutput {
        stdout,
        stderr,
        status_code: status.code(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let err = run_tool(&[], 5).unwrap_err();
        assert!(matches!(err, ScannerError::EmptyCommand));
    }

    #[test]
    fn test_missing_binary_reports_unavailable() {
        let err = run_tool(&command(&["route-sentinel-missing-scanner"]), 5).unwrap_err();
        assert!(matches!(err, ScannerError::Unavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout() {
        let output = run_tool(&command(&["echo", "hello"]), 5).unwrap();
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.status_code, Some(0));
    }

    #[cfg(unix)]
    #[test]
    fn test_deadline_kills_slow_scanner() {
        let err = run_tool(&command(&["sleep", "5"]), 1).unwrap_err();
        assert!(matches!(err, ScannerError::TimedOut { seconds: 1, .. }));
    }
}
