//! CLI integration tests for the flowbench command-line interface.
//!
//! Nothing here needs a running engine: the tests cover help output,
//! argument parsing and the commands that only touch local workspaces.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A flowbench command isolated to `dir` (cwd, config dir and base dir).
fn flowbench(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("flowbench").unwrap();
    cmd.current_dir(dir)
        .env("FLOWBENCH_CONFIG_DIR", dir.join("config"))
        .env_remove("N8N_API_URL")
        .env_remove("N8N_API_KEY")
        .arg("--base-dir")
        .arg(dir);
    cmd
}

fn write_definition(dir: &Path, file: &str) -> std::path::PathBuf {
    let path = dir.join(file);
    fs::write(
        &path,
        r#"{
            "name": "Order Sync",
            "nodes": [
                { "name": "Hook", "type": "n8n-nodes-base.webhook", "position": [0, 0],
                  "parameters": { "path": "orders", "httpMethod": "POST" } },
                { "name": "Set", "type": "n8n-nodes-base.set", "position": [200, 0] }
            ],
            "connections": {}
        }"#,
    )
    .unwrap();
    path
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    flowbench(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("activate"))
        .stdout(predicate::str::contains("execute"))
        .stdout(predicate::str::contains("webhook"))
        .stdout(predicate::str::contains("context"))
        .stdout(predicate::str::contains("cleanup"))
        .stdout(predicate::str::contains("debug"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    flowbench(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("flowbench"));
}

#[test]
fn test_execute_help_lists_methods() {
    let dir = TempDir::new().unwrap();
    flowbench(dir.path())
        .args(["execute", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--method"))
        .stdout(predicate::str::contains("--webhook-url"))
        .stdout(predicate::str::contains("--auto-activate"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument Validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_method_rejected() {
    let dir = TempDir::new().unwrap();
    flowbench(dir.path())
        .args(["execute", "--workspace", "x", "--method", "carrier-pigeon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("carrier-pigeon"));
}

#[test]
fn test_activate_requires_target() {
    let dir = TempDir::new().unwrap();
    flowbench(dir.path()).arg("activate").assert().failure();
}

#[test]
fn test_activate_all_requires_confirmation() {
    let dir = TempDir::new().unwrap();
    flowbench(dir.path())
        .args(["activate", "--all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Local Workspace Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_setup_list_validate() {
    let dir = TempDir::new().unwrap();
    let json = write_definition(dir.path(), "Order Sync.json");

    flowbench(dir.path())
        .arg("setup")
        .arg(&json)
        .assert()
        .success()
        .stdout(predicate::str::contains("Workspace created"));
    assert!(dir.path().join("workflows").is_dir());

    let output = flowbench(dir.path())
        .args(["--json", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let list: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let name = list[0]["name"].as_str().unwrap().to_string();

    flowbench(dir.path())
        .args(["validate", "--workspace", &name])
        .assert()
        .success()
        .stdout(predicate::str::contains("Order Sync is valid"));
}

#[test]
fn test_setup_twice_backs_up() {
    let dir = TempDir::new().unwrap();
    let json = write_definition(dir.path(), "orders.json");

    flowbench(dir.path()).arg("setup").arg(&json).assert().success();
    flowbench(dir.path())
        .args(["--json", "setup"])
        .arg(&json)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"created\": false"))
        .stdout(predicate::str::contains("_workflow.json"));

    let versions = dir.path().join("workflows/orders/versions");
    assert_eq!(fs::read_dir(versions).unwrap().count(), 1);
}

#[test]
fn test_execute_without_workflow_id_fails() {
    let dir = TempDir::new().unwrap();
    let json = write_definition(dir.path(), "orders.json");
    flowbench(dir.path()).arg("setup").arg(&json).assert().success();

    flowbench(dir.path())
        .args(["execute", "--workspace", "orders"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No workflow id"));
}

#[test]
fn test_webhook_extract_stores_endpoints() {
    let dir = TempDir::new().unwrap();
    let json = write_definition(dir.path(), "orders.json");
    flowbench(dir.path()).arg("setup").arg(&json).assert().success();

    flowbench(dir.path())
        .args(["--server", "http://engine.test:5678", "webhook", "extract", "-w", "orders"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "http://engine.test:5678/webhook/orders",
        ))
        .stdout(predicate::str::contains(
            "http://engine.test:5678/webhook-test/orders",
        ));

    let meta = fs::read_to_string(dir.path().join("workflows/orders/metadata.json")).unwrap();
    assert!(meta.contains("webhook_config"));
}

#[test]
fn test_cleanup_keeps_newest_logs() {
    let dir = TempDir::new().unwrap();
    let json = write_definition(dir.path(), "orders.json");
    flowbench(dir.path()).arg("setup").arg(&json).assert().success();

    let logs = dir.path().join("workflows/orders/logs");
    for i in 0..4 {
        fs::write(logs.join(format!("execution_2026010{i}_000000.log")), "x").unwrap();
    }

    flowbench(dir.path())
        .args(["cleanup", "--name", "orders", "--keep", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 3"));
    assert_eq!(fs::read_dir(&logs).unwrap().count(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_and_show() {
    let dir = TempDir::new().unwrap();

    flowbench(dir.path())
        .args(["config", "init"])
        .assert()
        .success();
    assert!(dir.path().join("config/config.json").is_file());

    flowbench(dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    flowbench(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://localhost:5678"));
}

#[test]
fn test_server_flag_overrides_config() {
    let dir = TempDir::new().unwrap();
    flowbench(dir.path())
        .args(["--server", "http://engine.test:9999", "--json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://engine.test:9999"));
}

#[test]
fn test_config_path_honours_env() {
    let dir = TempDir::new().unwrap();
    flowbench(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.json"));
}
