//! CLI integration tests
//!
//! Runs the `tm` binary against throwaway projects with a file-backed
//! DuckDB database.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Path to the compiled tm binary (resolved at compile time)
fn tm_bin() -> String {
    env!("CARGO_BIN_EXE_tm").to_string()
}

fn tm(project: &Path, args: &[&str]) -> Output {
    Command::new(tm_bin())
        .args(args)
        .args(["--project-dir", project.to_str().unwrap()])
        .env_remove("TIDEMARK_TARGET")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run tm")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn describe(output: &Output) -> String {
    format!(
        "status: {:?}\nstdout: {}\nstderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn write_project(dir: &Path) {
    fs::write(
        dir.join("tidemark.yml"),
        "name: accounts-service\ndatabase:\n  path: app.duckdb\nlock_timeout_secs: 0\n",
    )
    .unwrap();
    let migrations = dir.join("migrations");
    fs::create_dir_all(&migrations).unwrap();
    fs::write(
        migrations.join("1_create_accounts.yml"),
        r#"
up:
  - op: create_table
    name: accounts
    columns:
      - { name: id, type: INTEGER, nullable: false }
      - { name: username, type: VARCHAR }
"#,
    )
    .unwrap();
    fs::write(
        migrations.join("2_add_locked.yml"),
        r#"
up:
  - op: add_column
    table: accounts
    column: { name: locked, type: BOOLEAN, nullable: false, default: false }
"#,
    )
    .unwrap();
}

fn status_json(dir: &Path) -> serde_json::Value {
    let output = tm(dir, &["status", "--json"]);
    assert!(output.status.success(), "{}", describe(&output));
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── up / down / status ─────────────────────────────────────────────────

#[test]
fn test_up_then_status() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let before = status_json(dir.path());
    assert_eq!(before["current"], serde_json::Value::Null);
    assert_eq!(before["pending"].as_array().unwrap().len(), 2);

    let output = tm(dir.path(), &["up"]);
    assert!(output.status.success(), "{}", describe(&output));
    assert!(stdout(&output).contains("Applied 2 migration(s)"));

    let after = status_json(dir.path());
    assert_eq!(after["current"], "2");
    assert_eq!(after["applied"], 2);
    assert!(after["pending"].as_array().unwrap().is_empty());

    let output = tm(dir.path(), &["up"]);
    assert!(output.status.success(), "{}", describe(&output));
    assert!(stdout(&output).contains("No pending migrations"));
}

#[test]
fn test_down_by_steps_and_history() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    assert!(tm(dir.path(), &["up"]).status.success());

    let output = tm(dir.path(), &["down", "--steps", "1"]);
    assert!(output.status.success(), "{}", describe(&output));
    assert!(stdout(&output).contains("Reverted 1 migration(s)"));

    let output = tm(dir.path(), &["history", "--json"]);
    assert!(output.status.success(), "{}", describe(&output));
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["version"], "1");
    assert_eq!(rows[0]["name"], "create_accounts");
    assert_eq!(rows[0]["checksum"].as_str().unwrap().len(), 64);
}

#[test]
fn test_dry_run_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let output = tm(dir.path(), &["up", "--dry-run"]);
    assert!(output.status.success(), "{}", describe(&output));
    let out = stdout(&output);
    assert!(out.contains("would apply 2 migration(s)"));
    assert!(out.contains("1 (create_accounts)"));

    assert_eq!(status_json(dir.path())["pending"].as_array().unwrap().len(), 2);
}

#[test]
fn test_up_to_explicit_version() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let output = tm(dir.path(), &["up", "--to", "1"]);
    assert!(output.status.success(), "{}", describe(&output));
    assert_eq!(status_json(dir.path())["current"], "1");

    let output = tm(dir.path(), &["down", "--to", "7"]);
    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
}

// ── failures and exit codes ────────────────────────────────────────────

#[test]
fn test_partial_failure_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    fs::write(
        dir.path().join("migrations").join("3_broken.yml"),
        r#"
up:
  - op: add_column
    table: accounts
    column: { name: email, type: VARCHAR }
  - op: add_column
    table: accounts
    column: { name: email, type: VARCHAR }
"#,
    )
    .unwrap();

    let output = tm(dir.path(), &["up"]);
    assert_eq!(output.status.code(), Some(2), "{}", describe(&output));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Migration 3 failed"));
    assert!(stderr.contains("failing operation: #1"));

    assert_eq!(status_json(dir.path())["current"], "2");
}

#[test]
fn test_edited_migration_fails_verify_and_up() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    assert!(tm(dir.path(), &["up", "--to", "1"]).status.success());

    let output = tm(dir.path(), &["verify"]);
    assert!(output.status.success(), "{}", describe(&output));

    fs::write(
        dir.path().join("migrations").join("1_create_accounts.yml"),
        r#"
up:
  - op: create_table
    name: accounts
    columns:
      - { name: id, type: BIGINT, nullable: false }
      - { name: username, type: VARCHAR }
"#,
    )
    .unwrap();

    let output = tm(dir.path(), &["verify"]);
    assert_eq!(output.status.code(), Some(4), "{}", describe(&output));

    let output = tm(dir.path(), &["up"]);
    assert_eq!(output.status.code(), Some(4), "{}", describe(&output));
    assert_eq!(status_json(dir.path())["current"], "1");
}

#[test]
fn test_unlock_without_lock() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let output = tm(dir.path(), &["unlock"]);
    assert!(output.status.success(), "{}", describe(&output));
    assert!(stdout(&output).contains("was not held"));
}

#[test]
fn test_missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = tm(dir.path(), &["status"]);
    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load project config"));
}

// ── new ────────────────────────────────────────────────────────────────

#[test]
fn test_new_scaffolds_loadable_migration() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let output = tm(dir.path(), &["new", "add_email", "--version", "3"]);
    assert!(output.status.success(), "{}", describe(&output));
    assert!(dir.path().join("migrations/3_add_email.yml").exists());

    // the scaffold is an empty but valid migration
    assert_eq!(status_json(dir.path())["pending"].as_array().unwrap().len(), 3);

    let output = tm(dir.path(), &["new", "again", "--version", "3"]);
    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));

    let output = tm(dir.path(), &["new", "bad name"]);
    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
}

#[test]
fn test_new_rejects_version_with_separator() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let output = tm(dir.path(), &["new", "x", "--version", "2024_01"]);
    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
    assert!(!dir.path().join("migrations/2024_01_x.yml").exists());
    assert_eq!(status_json(dir.path())["pending"].as_array().unwrap().len(), 2);
}
