//! Integration tests for the credlens CLI
//!
//! These tests run the built binary as a subprocess in offline mode.

use std::process::{Command, Output};

fn credlens(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_credlens"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run CLI")
}

#[test]
fn test_cli_help() {
    let output = credlens(&["--help"]);
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(output.status.success());
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("--author"));
    assert!(stdout.contains("--offline"));
}

#[test]
fn test_cli_version() {
    let output = credlens(&["--version"]);
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(output.status.success());
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_offline_json_analysis() {
    let output = credlens(&[
        "--offline",
        "--author",
        "Jane Doe",
        "--source",
        "Reuters",
        "--format",
        "json",
        "Argentina striker Lionel Messi lifted the World Cup.",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let analysis: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(analysis["credibility_score"], 0);
    assert_eq!(analysis["breakdown"]["total"], 0);
    assert!(analysis["graph"]["nodes"].as_array().unwrap().len() >= 3);
}

#[test]
fn test_explicit_entities_in_summary() {
    let output = credlens(&[
        "--offline",
        "--author",
        "Jane Doe",
        "--source",
        "Daily Planet",
        "--entity",
        "Lionel Messi=ATHLETE",
        "--entity",
        "Inter Miami=TEAM",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Credibility Score: 0"));
    assert!(stdout.contains("Lionel Messi [Athlete]"));
    assert!(stdout.contains("Inter Miami [SportsTeam]"));
}

#[test]
fn test_ntriples_output() {
    let output = credlens(&[
        "--offline",
        "--author",
        "Jane Doe",
        "--source",
        "Daily Planet",
        "--format",
        "ntriples",
        "--entity",
        "FIFA=ORGANIZATION",
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.lines().all(|line| line.ends_with(" .")));
    assert!(stdout.contains("#hasAuthor>"));
}

#[test]
fn test_rejects_unknown_entity_type() {
    let output = credlens(&[
        "--offline",
        "--author",
        "Jane Doe",
        "--source",
        "Daily Planet",
        "--entity",
        "Tuesday=DATE",
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_empty_author_fails() {
    let output = credlens(&[
        "--offline",
        "--author",
        "  ",
        "--source",
        "Reuters",
        "Some article text.",
    ]);
    assert!(!output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("author must not be empty"));
}
