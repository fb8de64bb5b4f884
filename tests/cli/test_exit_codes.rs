// Tests for CLI exit code behavior: 0 kept, 1 broken or misconfigured, 2 could not run

use std::fs;
use std::process::Command;

use serde_json::json;
use tempfile::TempDir;

use crate::common::{setup_project, strata_bin};

fn lint_in(dir: &TempDir) -> std::process::Output {
    Command::new(strata_bin())
        .arg("lint")
        .current_dir(dir.path())
        .output()
        .unwrap()
}

fn snapshot() -> serde_json::Value {
    json!({
        "modules": ["app", "app.high", "app.low"],
        "imports": [{"importer": "app.high", "imported": "app.low", "line_number": 1}]
    })
}

#[test]
fn test_kept_contracts_exit_0() {
    let config = json!({
        "root_package": "app",
        "contracts": [{
            "name": "Layers",
            "type": "layers",
            "layers": ["high", "low"],
            "containers": "app",
        }]
    });
    let dir = setup_project(&config, &snapshot());
    let out = lint_in(&dir);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Contracts: 1 kept, 0 broken."));
}

#[test]
fn test_broken_contract_exits_1() {
    let config = json!({
        "root_package": "app",
        "contracts": [{
            "name": "Upside down",
            "type": "layers",
            "layers": ["low", "high"],
            "containers": "app",
        }]
    });
    let dir = setup_project(&config, &snapshot());
    assert_eq!(lint_in(&dir).status.code(), Some(1));
}

#[test]
fn test_invalid_options_exit_1() {
    let config = json!({
        "root_package": "app",
        "contracts": [{"name": "Empty", "type": "independence"}]
    });
    let dir = setup_project(&config, &snapshot());
    let out = lint_in(&dir);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout)
        .contains("Contract \"Empty\" is not configured correctly:"));
}

#[test]
fn test_invalid_options_still_check_the_rest() {
    let config = json!({
        "root_package": "app",
        "contracts": [
            {"name": "Empty", "type": "independence"},
            {"name": "Layers", "type": "layers", "layers": ["high", "low"], "containers": "app"},
        ]
    });
    let dir = setup_project(&config, &snapshot());
    let out = lint_in(&dir);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout.contains("Contract \"Empty\" is not configured correctly:"));
    assert!(stdout.contains("Layers KEPT"));
}

#[test]
fn test_missing_config_exits_2() {
    let dir = TempDir::new().unwrap();
    let out = lint_in(&dir);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("strata lint: Could not read"));
}

#[test]
fn test_missing_root_packages_exits_2() {
    let config = json!({"contracts": []});
    let dir = setup_project(&config, &snapshot());
    let out = lint_in(&dir);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("No root packages configured"));
}

#[test]
fn test_non_boolean_session_flag_exits_2() {
    let config = json!({"root_package": "app", "show_timings": "often", "contracts": []});
    let dir = setup_project(&config, &snapshot());
    let out = lint_in(&dir);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid value for show_timings"));
}

#[test]
fn test_missing_layer_exits_2() {
    let config = json!({
        "root_package": "app",
        "contracts": [{
            "name": "Layers",
            "type": "layers",
            "layers": ["high", "middle", "low"],
            "containers": "app",
        }]
    });
    let dir = setup_project(&config, &snapshot());
    let out = lint_in(&dir);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("app.middle"));
}

#[test]
fn test_corrupt_snapshot_exits_2() {
    let config = json!({"root_package": "app", "contracts": []});
    let dir = setup_project(&config, &snapshot());
    fs::write(dir.path().join(".strata/graph.json"), "{not json").unwrap();
    assert_eq!(lint_in(&dir).status.code(), Some(2));
}

#[test]
fn test_unknown_contract_id_exits_2() {
    let config = json!({"root_package": "app", "contracts": []});
    let dir = setup_project(&config, &snapshot());
    let out = Command::new(strata_bin())
        .args(["lint", "--contract", "missing"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Could not find contract 'missing'."));
}

#[test]
fn test_unsupported_completion_shell_exits_2() {
    let out = Command::new(strata_bin())
        .args(["completion", "tcsh"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_completion_script_mentions_binary() {
    let out = Command::new(strata_bin())
        .args(["completion", "bash"])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("strata"));
}
