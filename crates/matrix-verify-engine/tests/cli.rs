//! `matrix-verify` binary: exit codes and output channels.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;

const POLICY: &str = "format: matrix.policy.v1\nrules:\n  - { id: owner, kind: require_metadata, name: owner }\n";

const PROGRAM: &str = r#"{"format":"matrix.program.v1","abi_version":"v2","symbols":[],"metadata":{"owner":"payments"}}"#;

fn temp_file(name: &str, body: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("matrix-verify-cli-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

/// `case` names the temp files; tests run in parallel.
fn run(case: &str, program: &str, expect: &str, extra: &[&str]) -> Output {
    let program = temp_file(&format!("{case}.program.json"), program);
    let policy = temp_file(&format!("{case}.policy.yaml"), POLICY);
    Command::new(env!("CARGO_BIN_EXE_matrix-verify"))
        .arg("--program")
        .arg(&program)
        .arg("--policy")
        .arg(&policy)
        .args(["--expect", expect])
        .args(extra)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(out: &Output) -> String {
    String::from_utf8(out.stdout.clone()).unwrap()
}

fn stderr(out: &Output) -> String {
    String::from_utf8(out.stderr.clone()).unwrap()
}

#[test]
fn accept_exits_zero() {
    let out = run("accept", PROGRAM, "v2", &[]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(stdout(&out).starts_with("ACCEPT abi=v2 (exact)\n"));
}

#[test]
fn reject_exits_one() {
    let out = run("reject", PROGRAM, "v3", &[]);
    assert_eq!(out.status.code(), Some(1), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("ABI_MISMATCH: expected v3, got v2"));
}

#[test]
fn reject_json_report_on_stdout() {
    let out = run("reject-json", PROGRAM, "v3", &["--json", "--plugins", "kql"]);
    assert_eq!(out.status.code(), Some(1));
    let v: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(v["verdict"], "REJECT");
    assert_eq!(v["meta"]["plugins"][0], "kql");
    assert_eq!(v["meta"]["abi_hash"].as_str().unwrap().len(), 64);
}

#[test]
fn malformed_program_exits_two() {
    let out = run("malformed", "{not json", "v2", &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("SCHEMA_ERROR: invalid program"), "{}", stderr(&out));
    assert!(stdout(&out).is_empty());
}

#[test]
fn empty_program_exits_two_with_program_required() {
    let out = run("empty", "", "v2", &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("PROGRAM_REQUIRED"), "{}", stderr(&out));

    let out = run("empty-json", "", "v2", &["--json"]);
    assert_eq!(out.status.code(), Some(2));
    let v: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(v["error"], "PROGRAM_REQUIRED");
}

#[test]
fn unknown_plugin_exits_two() {
    let out = run("unknown", PROGRAM, "v2", &["--plugins", "nope"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("UNKNOWN_PLUGIN: unknown plugin: nope"), "{}", stderr(&out));
}
