/// Shared test helpers for all strata integration tests.
///
/// Import from any integration test entry file with:
///   `mod common;`
use std::fs;
use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;
use strata_core::config::UserOptions;
use strata_core::graph::ImportGraph;
use strata_core::types::DirectImport;
use tempfile::TempDir;

/// A graph with the given modules and `(importer, imported, line)` imports.
#[allow(dead_code)]
pub fn graph_from(modules: &[&str], imports: &[(&str, &str, u32)]) -> ImportGraph {
    let mut graph = ImportGraph::new();
    for module in modules {
        graph.add_module(module);
    }
    for (importer, imported, line) in imports {
        graph.add_detailed_import(
            &DirectImport::new(*importer, *imported).with_line(*line, format!("import {imported}")),
        );
    }
    graph
}

/// Parse a configuration the way `strata lint` reads `.strata/contracts.json`.
#[allow(dead_code)]
pub fn user_options(config: Value) -> UserOptions {
    serde_json::from_value::<UserOptions>(config)
        .unwrap()
        .normalized()
        .unwrap()
}

/// A layered package used across the suites:
///
/// `shop.web -> shop.orders -> shop.billing`, with `shop.utils` imported by everyone and
/// `shop.vendor` standing apart.
#[allow(dead_code)]
pub fn shop_graph() -> ImportGraph {
    graph_from(
        &[
            "shop",
            "shop.web",
            "shop.web.views",
            "shop.orders",
            "shop.orders.service",
            "shop.orders.models",
            "shop.billing",
            "shop.billing.invoices",
            "shop.utils",
            "shop.vendor",
        ],
        &[
            ("shop.web.views", "shop.orders.service", 4),
            ("shop.orders.service", "shop.orders.models", 2),
            ("shop.orders.service", "shop.billing.invoices", 7),
            ("shop.web.views", "shop.utils", 1),
            ("shop.orders.models", "shop.utils", 1),
            ("shop.billing.invoices", "shop.utils", 1),
        ],
    )
}

/// Write a configuration and graph snapshot into `.strata/` of a fresh directory.
///
/// Returns the TempDir; hold it to keep the directory alive.
#[allow(dead_code)]
pub fn setup_project(config: &Value, snapshot: &Value) -> TempDir {
    let dir = TempDir::new().unwrap();
    let strata_dir = dir.path().join(".strata");
    fs::create_dir_all(&strata_dir).unwrap();
    fs::write(
        strata_dir.join("contracts.json"),
        serde_json::to_string_pretty(config).unwrap(),
    )
    .unwrap();
    fs::write(
        strata_dir.join("graph.json"),
        serde_json::to_string_pretty(snapshot).unwrap(),
    )
    .unwrap();
    dir
}

/// Get path to compiled strata binary.
///
/// Builds the binary if it doesn't exist yet.
#[allow(dead_code)]
pub fn strata_bin() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("strata");
    if path.exists() {
        return path;
    }
    let workspace = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let fallback = workspace.join("target/debug/strata");
    if fallback.exists() {
        return fallback;
    }
    let status = Command::new("cargo")
        .args(["build", "-p", "strata-cli"])
        .current_dir(&workspace)
        .status()
        .expect("Failed to build strata");
    assert!(status.success(), "Failed to build strata binary");
    fallback
}
