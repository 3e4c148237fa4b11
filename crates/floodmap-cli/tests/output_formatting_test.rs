//! Integration tests for output formatting
//!
//! These tests verify that JSON output and dry-run mode work correctly.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn floodmap_bin() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test binary name
    path.pop(); // Remove 'deps' directory
    path.push(format!("floodmap{}", std::env::consts::EXE_SUFFIX));
    path
}

fn floodmap(args: &[&str]) -> Output {
    Command::new(floodmap_bin())
        .args(args)
        .env_remove("FLOODMAP_PROJECTION")
        .env_remove("FLOODMAP_DEM")
        .output()
        .expect("Failed to execute command")
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Initialized workspace with a projection and an existing DEM file
fn configured_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = path_arg(dir.path());
    fs::write(dir.path().join("dem.grd"), "dem").unwrap();

    let output = floodmap(&["init", &root, "--projection", "UTM 18 D122", "--dem", "dem.grd"]);
    assert!(output.status.success(), "init failed: {}", String::from_utf8_lossy(&output.stderr));
    dir
}

fn parse_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

#[test]
fn test_json_output_is_valid() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("run");

    let output = floodmap(&["init", &path_arg(&root), "--json"]);

    let parsed = parse_json(&output);
    assert_eq!(parsed.get("status").and_then(|v| v.as_str()), Some("success"));
    let data = parsed.get("data").expect("Should have data field");
    assert_eq!(data.get("stage_dirs").and_then(|v| v.as_array()).map(|a| a.len()), Some(8));
}

#[test]
fn test_dry_run_no_state_modification() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("run");

    let output = floodmap(&["init", &path_arg(&root), "--dry-run"]);

    assert!(output.status.success(), "Command should succeed");
    assert!(!root.exists(), "Dry-run should not create the workspace");
}

#[test]
fn test_actual_init_creates_layout() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("run");

    let output = floodmap(&["init", &path_arg(&root)]);

    assert!(output.status.success(), "Command should succeed");
    for name in ["Raw", "Ortho", "Mosaic", "Scaled", "OWFEP", "VEGFEP", "MERGEFEP", "Logs"] {
        assert!(root.join(name).is_dir(), "{} missing", name);
    }
    assert!(root.join("floodmap.toml").is_file());

    let again = floodmap(&["init", &path_arg(&root)]);
    assert!(!again.status.success(), "Second init without --force should fail");
}

#[test]
fn test_run_dry_run_plans_without_writing() {
    let dir = configured_workspace();

    let output = floodmap(&["run", "--workspace", &path_arg(dir.path()), "--dry-run", "--json"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let parsed = parse_json(&output);
    let data = parsed.get("data").expect("Should have data field");
    assert_eq!(data.get("dry_run").and_then(|v| v.as_bool()), Some(true));
    let actions = data.get("planned_actions").and_then(|v| v.as_array()).unwrap();
    assert_eq!(actions.len(), 9);
    assert!(actions
        .iter()
        .all(|a| a.get("would_skip").and_then(|v| v.as_str()) == Some("skipped_missing_input")));
    assert_eq!(fs::read_dir(dir.path().join("Logs")).unwrap().count(), 0);
}

#[test]
fn test_empty_workspace_has_nothing_to_process() {
    let dir = configured_workspace();

    let output = floodmap(&["run", "--workspace", &path_arg(dir.path()), "--json"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let parsed = parse_json(&output);
    let data = parsed.get("data").unwrap();
    assert_eq!(data.get("status").and_then(|v| v.as_str()), Some("nothing_to_process"));
    assert_eq!(fs::read_dir(dir.path().join("Logs")).unwrap().count(), 1);

    let status = floodmap(&["status", "--workspace", &path_arg(dir.path()), "--json"]);
    let parsed = parse_json(&status);
    let last_run = parsed.get("data").and_then(|d| d.get("last_run")).unwrap();
    assert_eq!(last_run.get("status").and_then(|v| v.as_str()), Some("nothing_to_process"));
}

#[test]
fn test_missing_dem_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let root = path_arg(dir.path());
    assert!(floodmap(&["init", &root, "--projection", "UTM 18 D122"]).status.success());

    let output = floodmap(&["run", "--workspace", &root]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("DEM not available"));
}

#[test]
fn test_invalid_skip_stage_is_rejected() {
    let dir = configured_workspace();

    let output = floodmap(&["run", "--workspace", &path_arg(dir.path()), "--skip", "mosaik"]);

    assert!(!output.status.success());
}
