/// Report orchestration: snapshots, limits, invalid options, parallel runs.
use serde_json::json;
use strata_core::builder::{GraphSnapshot, SnapshotBuilder};
use strata_core::config::UserOptions;
use strata_enforce::engine::{create_report, lint, EngineError, RunOptions};
use strata_enforce::types::ContractError;
use strata_enforce::ContractRegistry;
use tempfile::TempDir;

use crate::common::{shop_graph, user_options};

fn shop_options() -> UserOptions {
    user_options(json!({
        "root_packages": ["shop"],
        "show_timings": "false",
        "contracts": [
            {
                "id": "layers",
                "name": "Shop layers",
                "type": "layers",
                "layers": ["web", "orders", "billing"],
                "containers": ["shop"],
            },
            {
                "id": "utils-are-leaves",
                "name": "Utils import nothing of ours",
                "type": "forbidden",
                "source_modules": ["shop.utils"],
                "forbidden_modules": ["shop.web", "shop.orders", "shop.billing"],
            },
            {
                "name": "Web and billing are independent",
                "type": "independence",
                "modules": ["shop.web", "shop.billing"],
            },
        ]
    }))
}

fn snapshot_file(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("graph.json");
    std::fs::write(
        &path,
        serde_json::to_string(&GraphSnapshot::from_graph(&shop_graph())).unwrap(),
    )
    .unwrap();
    path
}

#[test]
fn lint_reads_snapshot_and_checks_every_contract() {
    let dir = TempDir::new().unwrap();
    let report = lint(
        &SnapshotBuilder::new(snapshot_file(&dir)),
        &shop_options(),
        &ContractRegistry::with_builtins(),
        &RunOptions::default(),
    )
    .unwrap();

    assert_eq!(report.module_count, 10);
    assert_eq!(report.import_count, 6);
    assert_eq!(report.kept_count(), 2);
    assert_eq!(report.broken_count(), 1);
    assert!(!report.passed());
    assert_eq!(report.contracts[2].id, "Web and billing are independent");
}

#[test]
fn limit_to_contracts_selects_by_id() {
    let run = RunOptions {
        limit_to_contracts: vec!["layers".to_string(), "utils-are-leaves".to_string()],
        ..RunOptions::default()
    };
    let report = create_report(
        &shop_graph(),
        &shop_options(),
        &ContractRegistry::with_builtins(),
        &run,
    )
    .unwrap();
    assert_eq!(report.contracts.len(), 2);
    assert!(report.passed());
}

#[test]
fn sequential_and_parallel_runs_agree() {
    let registry = ContractRegistry::with_builtins();
    let sequential =
        create_report(&shop_graph(), &shop_options(), &registry, &RunOptions::default()).unwrap();
    let parallel = create_report(
        &shop_graph(),
        &shop_options(),
        &registry,
        &RunOptions {
            parallel: true,
            ..RunOptions::default()
        },
    )
    .unwrap();

    assert_eq!(sequential.contracts.len(), parallel.contracts.len());
    for (a, b) in sequential.contracts.iter().zip(&parallel.contracts) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.check, b.check);
        assert_eq!(a.broken_lines, b.broken_lines);
    }
}

#[test]
fn invalid_options_skip_only_the_offending_contracts() {
    let options = user_options(json!({
        "root_package": "shop",
        "contracts": [
            {"name": "No layers", "type": "layers"},
            {"name": "Odd flag", "type": "acyclic", "consider_package_dependencies": "maybe"},
            {"name": "Fine", "type": "acyclic"},
        ]
    }));
    let report = create_report(
        &shop_graph(),
        &options,
        &ContractRegistry::with_builtins(),
        &RunOptions::default(),
    )
    .unwrap();

    assert!(report.could_not_run());
    assert!(!report.passed());
    assert_eq!(report.contracts.len(), 1);
    assert_eq!(report.contracts[0].name, "Fine");
    assert!(report.contracts[0].check.kept);
    let names: Vec<&str> = report.invalid_options.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["No layers", "Odd flag"]);
    assert_eq!(report.invalid_options["No layers"][0].field, "layers");
}

#[test]
fn missing_module_aborts_the_run() {
    let options = user_options(json!({
        "root_package": "shop",
        "contracts": [
            {"name": "Gone", "type": "standalone", "modules": ["shop.gone"]},
        ]
    }));
    let err = create_report(
        &shop_graph(),
        &options,
        &ContractRegistry::with_builtins(),
        &RunOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Contract(ContractError::ModuleNotFound(_))));
}

#[test]
fn unknown_contract_type_aborts_the_run() {
    let options = user_options(json!({
        "root_package": "shop",
        "contracts": [{"name": "Mystery", "type": "circular"}]
    }));
    let err = create_report(
        &shop_graph(),
        &options,
        &ContractRegistry::with_builtins(),
        &RunOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Contract(ContractError::NoSuchContractType(ref name)) if name == "circular"
    ));
}
