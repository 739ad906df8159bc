//! End-to-end tests for the route-sentinel binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn sentinel() -> Command {
    Command::new(env!("CARGO_BIN_EXE_route-sentinel"))
}

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

#[test]
fn test_public_kill_chain_blocks_with_exit_code_one() {
    sentinel()
        .args(["analyze", &fixture("public_exec.py"), "--no-scanners"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Kill Chain Detected!"))
        .stdout(predicate::str::contains("BLOCK"));
}

#[test]
fn test_internal_route_allows() {
    sentinel()
        .args(["analyze", &fixture("internal_exec.py"), "--no-scanners"])
        .assert()
        .success()
        .stdout(predicate::str::contains("internal/safe"));
}

#[test]
fn test_syntax_error_exits_with_code_two() {
    sentinel()
        .args(["analyze", &fixture("syntax_error.py"), "--no-scanners"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Syntax Error"));
}

#[test]
fn test_clean_service_allows() {
    sentinel()
        .args(["analyze", &fixture("clean.py"), "--no-scanners"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Code looks clean."));
}

#[test]
fn test_json_format_emits_decision() {
    sentinel()
        .args([
            "analyze",
            &fixture("public_exec.py"),
            "--no-scanners",
            "--format",
            "json",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""decision": "BLOCK""#));
}

#[test]
fn test_markdown_format_contains_audit_log() {
    sentinel()
        .args([
            "analyze",
            &fixture("internal_exec.py"),
            "--no-scanners",
            "--format",
            "markdown",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Route-Sentinel Analysis"))
        .stdout(predicate::str::contains("## Audit Log"));
}

#[test]
fn test_policy_command_lists_default_sinks() {
    sentinel()
        .arg("policy")
        .assert()
        .success()
        .stdout(predicate::str::contains("os.system"))
        .stdout(predicate::str::contains("subprocess.call"));
}

#[test]
fn test_version_command() {
    sentinel()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Route-Sentinel version:"));
}

#[test]
fn test_policy_file_changes_the_sink_list() {
    let mut policy = tempfile::NamedTempFile::new().unwrap();
    write!(policy, r#"{{"sink_names": ["danger.zone"]}}"#).unwrap();
    let policy_path = policy.path().to_string_lossy().to_string();

    // The custom sink blocks under the custom policy.
    sentinel()
        .args([
            "analyze",
            &fixture("custom_sink.py"),
            "--no-scanners",
            "--policy",
            &policy_path,
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("danger.zone"));

    // The default sinks are no longer on the list.
    sentinel()
        .args([
            "analyze",
            &fixture("public_exec.py"),
            "--no-scanners",
            "--policy",
            &policy_path,
        ])
        .assert()
        .success();
}
