//! Integration tests for tabgroups-cli
//!
//! These tests run the binary against a temporary data document and check
//! output, the written document and exit codes.

#![allow(clippy::uninlined_format_args)]

use std::path::Path;
use std::process::{Command, Output};

use serde_json::{Value, json};
use tempfile::TempDir;

/// Helper to run the CLI against the given data document
fn run_cli(args: &[&str], data: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tabgroups-cli"))
        .env("TABGROUPS_DATA", data)
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

/// Helper to get stdout as string
fn stdout_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn read_document(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn data_file(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("storage.json")
}

// ============================================================================
// Help
// ============================================================================

#[test]
fn test_help_command() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["--help"], &data_file(&dir));

    assert!(output.status.success(), "Help command should succeed");
    let stdout = stdout_str(&output);
    for command in ["list", "add", "rules", "backup", "restore", "migrate"] {
        assert!(stdout.contains(command), "Help should mention {command}");
    }
}

// ============================================================================
// Group editing
// ============================================================================

#[test]
fn test_add_list_rename_delete() {
    let dir = TempDir::new().unwrap();
    let data = data_file(&dir);

    assert!(run_cli(&["add", "--title", "Work"], &data).status.success());
    assert!(run_cli(&["add", "--title", "Reading", "--sticky"], &data).status.success());

    let listed = stdout_str(&run_cli(&["list", "--format", "json"], &data));
    let groups: Value = serde_json::from_str(&listed).unwrap();
    assert_eq!(groups[0]["title"], "Work");
    assert_eq!(groups[1]["id"], 2);
    assert_eq!(groups[1]["isSticky"], true);

    assert!(run_cli(&["rename", "Work", "Office"], &data).status.success());
    assert!(run_cli(&["delete", "2"], &data).status.success());

    let document = read_document(&data);
    assert_eq!(document["groups"].as_array().unwrap().len(), 1);
    assert_eq!(document["groups"][0]["title"], "Office");
    assert_eq!(document["lastCreatedGroupPosition"], 2);
}

#[test]
fn test_missing_group_exit_code() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["show", "Nothing"], &data_file(&dir));

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
}

// ============================================================================
// Catch rules
// ============================================================================

#[test]
fn test_rules_add_and_test() {
    let dir = TempDir::new().unwrap();
    let data = data_file(&dir);
    run_cli(&["add", "--title", "Docs"], &data);

    let added = run_cli(&["rules", "add", "Docs", r"docs\.test"], &data);
    assert!(added.status.success());

    let caught = stdout_str(&run_cli(&["rules", "test", "https://docs.test/page"], &data));
    assert!(caught.contains("'Docs'"), "got: {caught}");

    let missed = stdout_str(&run_cli(&["rules", "test", "https://other.test"], &data));
    assert!(missed.contains("No group catches"));

    let invalid = run_cli(&["rules", "add", "Docs", "(unclosed"], &data);
    assert_eq!(invalid.status.code(), Some(1));
}

// ============================================================================
// Migration and backups
// ============================================================================

#[test]
fn test_migrate_old_document() {
    let dir = TempDir::new().unwrap();
    let data = data_file(&dir);
    let old = json!({
        "version": "4.1",
        "groups": [{"id": 3, "title": "Old", "catchTabRules": "a\nb"}],
        "lastCreatedGroupPosition": 3,
        "followToLoadedGroupInSideBar": true,
    });
    std::fs::write(&data, old.to_string()).unwrap();

    let dry = run_cli(&["migrate", "--dry-run"], &data);
    assert!(dry.status.success());
    assert_eq!(read_document(&data)["version"], "4.1");

    assert!(run_cli(&["migrate"], &data).status.success());
    let document = read_document(&data);
    assert_ne!(document["version"], "4.1");
    assert!(document.get("followToLoadedGroupInSideBar").is_none());
    assert_eq!(document["groups"][0]["catchTabRules"], json!(["a", "b"]));
}

#[test]
fn test_newer_document_is_refused() {
    let dir = TempDir::new().unwrap();
    let data = data_file(&dir);
    std::fs::write(&data, r#"{"version": "99.0"}"#).unwrap();

    let output = run_cli(&["list"], &data);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_backup_and_restore() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source.json");
    let target = dir.path().join("target.json");
    let backup = dir.path().join("backup.json");

    run_cli(&["add", "--title", "Work"], &source);
    let written = run_cli(&["backup", "--output", backup.to_str().unwrap()], &source);
    assert!(written.status.success());

    run_cli(&["add", "--title", "Mine"], &target);
    let restored = run_cli(&["restore", backup.to_str().unwrap()], &target);
    assert!(restored.status.success());

    let document = read_document(&target);
    let titles: Vec<&str> = document["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Mine", "Work"]);
    assert_eq!(document["groups"][1]["id"], 2);
}
