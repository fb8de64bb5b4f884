// Tests for `strata lint` and `strata contracts` output

use std::process::Command;

use serde_json::{json, Value};

use crate::common::{setup_project, strata_bin};

fn snapshot() -> Value {
    json!({
        "modules": ["one", "one.alpha", "green", "green.beta"],
        "imports": [{
            "importer": "one.alpha",
            "imported": "green.beta",
            "line_number": 3,
            "line_contents": "from green import beta",
        }]
    })
}

fn config() -> Value {
    json!({
        "root_packages": ["one", "green"],
        "contracts": [
            {
                "id": "one-not-green",
                "name": "One does not use green",
                "type": "forbidden",
                "source_modules": ["one"],
                "forbidden_modules": ["green"],
            },
            {
                "id": "green-not-one",
                "name": "Green does not use one",
                "type": "forbidden",
                "source_modules": ["green"],
                "forbidden_modules": ["one"],
            },
        ]
    })
}

#[test]
fn test_lint_human_output() {
    let dir = setup_project(&config(), &snapshot());
    let out = Command::new(strata_bin())
        .arg("lint")
        .current_dir(dir.path())
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert_eq!(out.status.code(), Some(1));
    assert!(stdout.contains("Analyzed 4 files, 1 dependencies."));
    assert!(stdout.contains("One does not use green BROKEN"));
    assert!(stdout.contains("Green does not use one KEPT"));
    assert!(stdout.contains("Contracts: 1 kept, 1 broken."));
    assert!(stdout.contains("one is not allowed to import green:"));
    assert!(stdout.contains("- one.alpha -> green.beta (l.3)"));
}

#[test]
fn test_lint_json_output() {
    let dir = setup_project(&config(), &snapshot());
    let out = Command::new(strata_bin())
        .args(["lint", "--json"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    let value: Value = serde_json::from_slice(&out.stdout).expect("stdout should be JSON");

    assert_eq!(value["passed"], false);
    assert_eq!(value["contracts"][0]["id"], "one-not-green");
    let chain = &value["contracts"][0]["metadata"]["forbidden"]["invalid_chains"][0]["chains"][0];
    assert_eq!(chain["chain"][0]["importer"], "one.alpha");
    assert_eq!(chain["chain"][0]["imported"], "green.beta");
    assert_eq!(chain["chain"][0]["line_numbers"], json!([3]));
}

#[test]
fn test_lint_limited_to_kept_contract_passes() {
    let dir = setup_project(&config(), &snapshot());
    let out = Command::new(strata_bin())
        .args(["lint", "--contract", "green-not-one", "--show-timings"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert_eq!(out.status.code(), Some(0));
    assert!(stdout.starts_with("Building graph took "));
    assert!(stdout.contains("Green does not use one KEPT ["));
    assert!(!stdout.contains("One does not use green"));
}

#[test]
fn test_lint_explicit_paths() {
    let dir = setup_project(&config(), &snapshot());
    let strata_dir = dir.path().join(".strata");
    let out = Command::new(strata_bin())
        .arg("lint")
        .arg("--config")
        .arg(strata_dir.join("contracts.json"))
        .arg("--graph")
        .arg(strata_dir.join("graph.json"))
        .arg("--parallel")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_contracts_lists_types() {
    let out = Command::new(strata_bin())
        .args(["contracts", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: Value = serde_json::from_slice(&out.stdout).unwrap();
    let types = value["contract_types"].as_array().unwrap();
    assert!(types.contains(&json!("acyclic_siblings")));
    assert!(types.contains(&json!("forbidden")));
}

#[test]
fn test_verbose_logs_to_stderr() {
    let dir = setup_project(&config(), &snapshot());
    let out = Command::new(strata_bin())
        .args(["lint", "--verbose"])
        .env_remove("STRATA_LOG")
        .current_dir(dir.path())
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Building import graph..."));
    assert!(!String::from_utf8_lossy(&out.stdout).contains("Building import graph"));
}
