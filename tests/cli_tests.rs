//! Integration tests for the sql-flow-analyzer binary.

mod common;

use std::path::Path;

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use common::*;
use predicates::prelude::*;
use sql_flow_analyzer::{
    app::decode_source_files,
    cli::{Dialect, Format},
    host::SourceFile
};
use tempfile::TempDir;

/// Command isolated from user config files and `SQL_FLOW_*` variables.
fn cmd(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("sql-flow-analyzer");
    cmd.current_dir(home)
        .env("HOME", home)
        .env_remove("SQL_FLOW_DIALECT")
        .env_remove("SQL_FLOW_MAX_QUERY_LENGTH")
        .env_remove("RUST_LOG");
    cmd
}

fn write_input(dir: &TempDir, name: &str, files: &[SourceFile]) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_string(files).unwrap()).unwrap();
    path.to_str().unwrap().to_string()
}

fn clean_file() -> SourceFile {
    let s = stmt("stmt");
    functions_file(vec![method("find", vec![
        prepare(s.clone(), "SELECT id FROM users WHERE id = :id", 2),
        execute(&s, vec![params(&[("id", 3)])], 3),
    ])])
}

fn broken_file() -> SourceFile {
    functions_file(vec![method("find", vec![prepare(stmt("stmt"), "SELECT id, name FROM", 7)])])
}

fn warning_file() -> SourceFile {
    functions_file(vec![method("find", vec![prepare(
        stmt("stmt"),
        "SELECT id FROM users WHERE 1 = 1",
        4
    )])])
}

#[test]
fn test_clean_input_succeeds() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "clean.json", &[clean_file()]);

    cmd(dir.path())
        .args(["check", "-i", input.as_str(), "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 error(s), 0 warning(s), 0 info in 1 unit(s)"));
}

#[test]
fn test_syntax_error_exits_with_two() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "broken.json", &[broken_file()]);

    cmd(dir.path())
        .args(["check", "-i", input.as_str(), "--no-color"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("app.php:7:9 ERROR [SQL001]"));
}

#[test]
fn test_warning_exits_with_one() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "warn.json", &[warning_file()]);

    cmd(dir.path())
        .args(["check", "-i", input.as_str(), "--no-color", "-v"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[SQL002]"))
        .stdout(predicate::str::contains("= help:"));
}

#[test]
fn test_multiple_inputs_and_json_format() {
    let dir = TempDir::new().unwrap();
    let clean = write_input(&dir, "clean.json", &[clean_file()]);
    let broken = write_input(&dir, "broken.json", &[broken_file()]);

    let output = cmd(dir.path())
        .args(["check", "-i", clean.as_str(), broken.as_str(), "-f", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["units_count"], 2);
    assert_eq!(value["files"].as_array().unwrap().len(), 2);
}

#[test]
fn test_yaml_input() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clean.yaml");
    std::fs::write(&path, serde_yaml::to_string(&clean_file()).unwrap()).unwrap();

    cmd(dir.path())
        .args(["check", "-i", path.to_str().unwrap(), "--no-color"])
        .assert()
        .success();
}

#[test]
fn test_config_file_in_working_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".sql-flow.toml"), "[rules]\ndisabled = [\"SQL001\"]\n").unwrap();
    let input = write_input(&dir, "broken.json", &[broken_file()]);

    cmd(dir.path())
        .args(["check", "-i", input.as_str(), "--no-color"])
        .assert()
        .success();
}

#[test]
fn test_invalid_env_dialect_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "clean.json", &[clean_file()]);

    cmd(dir.path())
        .env("SQL_FLOW_DIALECT", "oracle")
        .args(["check", "-i", input.as_str()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();

    cmd(dir.path())
        .args(["check", "-i", "does-not-exist.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_malformed_input_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{\"functions\": 5}").unwrap();

    cmd(dir.path())
        .args(["check", "-i", path.to_str().unwrap()])
        .assert()
        .code(2);
}

#[test]
fn test_input_is_required() {
    let dir = TempDir::new().unwrap();

    cmd(dir.path()).arg("check").assert().failure();
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();

    cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_value_enums() {
    let dialect = Dialect::Postgresql;
    assert!(format!("{:?}", dialect).contains("Postgresql"));
    assert!(matches!(Format::Json, Format::Json));
}

#[test]
fn test_decoded_input_takes_origin_path() {
    let json = serde_json::to_string(&SourceFile::default()).unwrap();
    let files = decode_source_files(&json, true, "lowered/Repo.json").unwrap();
    assert_eq!(files[0].path, "lowered/Repo.json");
}
