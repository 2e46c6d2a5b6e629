use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const BIN: &str = "crm-helpers";

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/crm.json")
}

/// Command rooted in an empty workspace so no stray helpers.toml is picked up.
fn cmd(workspace: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("--workspace")
        .arg(workspace.path())
        .env_remove("CRM_HELPERS_STEP_TIMEOUT")
        .env_remove("CRM_HELPERS_GEO_ENDPOINT")
        .env_remove("CRM_HELPERS_GEO_TIMEOUT")
        .env_remove("CRM_HELPERS_LOG_DIR")
        .env_remove("CRM_HELPERS_EMBEDDED")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_help_lists_commands() {
    let workspace = TempDir::new().unwrap();
    cmd(&workspace)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn test_list_text_catalog() {
    let workspace = TempDir::new().unwrap();
    cmd(&workspace)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("math_it"))
        .stdout(predicate::str::contains("ip_location"))
        .stdout(predicate::str::contains("tagging"));
}

#[test]
fn test_list_json_is_ordered() {
    let workspace = TempDir::new().unwrap();
    let output = cmd(&workspace).args(["list", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let catalog = stdout_json(&output);
    let types: Vec<&str> = catalog
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["type"].as_str().unwrap())
        .collect();
    assert_eq!(types.len(), 10);
    assert_eq!(types[0], "math_it");
    assert_eq!(types[9], "ip_location");
}

#[test]
fn test_schema_prints_required_keys() {
    let workspace = TempDir::new().unwrap();
    let output = cmd(&workspace).args(["schema", "copy_it"]).output().unwrap();
    assert!(output.status.success());

    let schema = stdout_json(&output);
    assert_eq!(schema["required"], serde_json::json!(["source_field", "target_field"]));
    assert_eq!(schema["properties"]["overwrite"]["default"], true);
}

#[test]
fn test_schema_for_unknown_type_fails() {
    let workspace = TempDir::new().unwrap();
    cmd(&workspace)
        .args(["schema", "teleport_it"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("teleport_it"));
}

#[test]
fn test_validate_accepts_good_config() {
    let workspace = TempDir::new().unwrap();
    cmd(&workspace)
        .args(["validate", "tag_it", "--config", r#"{"action":"apply","tag_ids":["t1"]}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("config for tag_it is valid"));
}

#[test]
fn test_validate_names_the_bad_field() {
    let workspace = TempDir::new().unwrap();
    cmd(&workspace)
        .args([
            "validate",
            "math_it",
            "--config",
            r#"{"operation":"round","source_field":"a","decimals":42}"#,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config for math_it"))
        .stderr(predicate::str::contains("(field: decimals)"));
}

#[test]
fn test_validate_reads_config_file() {
    let workspace = TempDir::new().unwrap();
    let step = workspace.path().join("step.json");
    fs::write(&step, r#"{"call_name": "webinar_signup"}"#).unwrap();
    cmd(&workspace)
        .args(["validate", "goal_it", "--config"])
        .arg(format!("@{}", step.display()))
        .assert()
        .success();
}

#[test]
fn test_run_prints_output_and_updates_contact() {
    let workspace = TempDir::new().unwrap();
    let output = cmd(&workspace)
        .args([
            "run",
            "math_it",
            "--config",
            r#"{"operation":"sqrt","source_field":"amount","target_field":"sqrt_amount"}"#,
            "--contact",
            "c1",
            "--execution-id",
            "exec-cli",
        ])
        .arg("--fixture")
        .arg(fixture())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let result = stdout_json(&output);
    assert_eq!(result["success"], true);
    assert_eq!(result["actions"][0]["type"], "field_updated");
    assert_eq!(result["actions"][0]["target"], "sqrt_amount");
    assert_eq!(result["modified_data"]["sqrt_amount"].as_f64(), Some(4.0));
}

#[test]
fn test_run_failure_exits_non_zero_with_output() {
    let workspace = TempDir::new().unwrap();
    let output = cmd(&workspace)
        .args([
            "run",
            "tag_it",
            "--config",
            r#"{"action":"apply","tag_ids":["tag_a"]}"#,
            "--contact",
            "c1",
        ])
        .arg("--fixture")
        .arg(fixture())
        .output()
        .unwrap();
    assert!(!output.status.success());

    let result = stdout_json(&output);
    assert_eq!(result["success"], false);
    assert!(result["message"].as_str().unwrap().contains("Failed to apply"));
    assert_eq!(result["actions"].as_array().unwrap().len(), 0);
    assert!(String::from_utf8_lossy(&output.stderr).contains("HLP-TAG-001"));
}

#[test]
fn test_run_show_contact_includes_new_tag() {
    let workspace = TempDir::new().unwrap();
    cmd(&workspace)
        .args([
            "run",
            "tag_it",
            "--config",
            r#"{"action":"apply","tag_ids":["tag_vip"]}"#,
            "--contact",
            "c1",
            "--show-contact",
        ])
        .arg("--fixture")
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tag_vip\""))
        .stdout(predicate::str::contains("ada@example.com"));
}

#[test]
fn test_run_rejects_invalid_config_before_execution() {
    let workspace = TempDir::new().unwrap();
    cmd(&workspace)
        .args([
            "run",
            "date_calc",
            "--config",
            r#"{"source_field":"renewal","amount":1,"unit":"fortnights"}"#,
            "--contact",
            "c1",
        ])
        .arg("--fixture")
        .arg(fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("HLP-CFG-001"));
}

#[test]
fn test_run_honours_workspace_config() {
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join("helpers.toml"),
        "[execution]\nstep_timeout = \"never\"\n",
    )
    .unwrap();
    cmd(&workspace)
        .args(["run", "goal_it", "--config", r#"{"call_name":"x"}"#, "--contact", "c1"])
        .arg("--fixture")
        .arg(fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("execution.step_timeout"));
}

#[test]
fn test_embedded_mode_keeps_stderr_quiet() {
    let workspace = TempDir::new().unwrap();
    cmd(&workspace)
        .env("CRM_HELPERS_EMBEDDED", "1")
        .args(["run", "goal_it", "--config", r#"{"call_name":"x"}"#, "--contact", "c1"])
        .arg("--fixture")
        .arg(fixture())
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_log_dir_env_writes_json_log() {
    let workspace = TempDir::new().unwrap();
    let logs = TempDir::new().unwrap();
    cmd(&workspace)
        .env("CRM_HELPERS_LOG_DIR", logs.path())
        .args(["run", "goal_it", "--config", r#"{"call_name":"x"}"#, "--contact", "c1"])
        .arg("--fixture")
        .arg(fixture())
        .assert()
        .success();

    let written = fs::read_to_string(logs.path().join("crm-helpers.log")).unwrap();
    let first: Value = serde_json::from_str(written.lines().next().unwrap()).unwrap();
    assert!(first.get("level").is_some());
}
