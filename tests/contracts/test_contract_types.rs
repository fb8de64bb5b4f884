/// Every built-in contract type, configured from JSON and run through the report engine.
use serde_json::json;
use strata_core::graph::ImportGraph;
use strata_core::types::DirectImport;
use strata_enforce::engine::{create_report, Report, RunOptions};
use strata_enforce::ContractRegistry;

use crate::common::{shop_graph, user_options};

fn all_types_config() -> serde_json::Value {
    json!({
        "root_package": "shop",
        "contracts": [
            {
                "id": "layers",
                "name": "Shop layers",
                "type": "layers",
                "layers": ["web", "orders", "billing"],
                "containers": "shop",
            },
            {
                "id": "independence",
                "name": "Web and billing are independent",
                "type": "independence",
                "modules": ["shop.web", "shop.billing"],
            },
            {
                "id": "forbidden",
                "name": "Billing does not know about the web",
                "type": "forbidden",
                "source_modules": ["shop.billing"],
                "forbidden_modules": ["shop.web"],
            },
            {"id": "acyclic", "name": "No cycles", "type": "acyclic"},
            {
                "id": "tree",
                "name": "Tree shaped",
                "type": "tree",
                "consider_package_dependencies": "false",
            },
            {
                "id": "acyclic_siblings",
                "name": "Acyclic siblings",
                "type": "acyclic_siblings",
                "ancestors": ["shop"],
            },
            {
                "id": "protected",
                "name": "Billing only via orders",
                "type": "protected",
                "protected_modules": ["shop.billing"],
                "allowed_importers": ["shop.orders"],
            },
            {
                "id": "standalone",
                "name": "Vendored code stands alone",
                "type": "standalone",
                "modules": ["shop.vendor"],
            },
            {"id": "modular", "name": "Shop is modular", "type": "modular", "modules": ["shop"]},
            {
                "id": "multi_layers",
                "name": "Shop ranks",
                "type": "multi_layers",
                "layers": ["shop.web", "shop.orders", "shop.billing"],
            },
        ]
    })
}

fn run(graph: &ImportGraph) -> Report {
    create_report(
        graph,
        &user_options(all_types_config()),
        &ContractRegistry::with_builtins(),
        &RunOptions::default(),
    )
    .unwrap()
}

fn broken_ids(report: &Report) -> Vec<&str> {
    report
        .contracts
        .iter()
        .filter(|c| !c.check.kept)
        .map(|c| c.id.as_str())
        .collect()
}

#[test]
fn every_registered_type_is_configured() {
    let config = all_types_config();
    let mut declared: Vec<&str> = config["contracts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["type"].as_str().unwrap())
        .collect();
    declared.sort_unstable();
    let registry = ContractRegistry::with_builtins();
    let registered: Vec<&str> = registry.type_names().collect();
    assert_eq!(declared, registered);
}

#[test]
fn downward_imports_only_break_independence() {
    let report = run(&shop_graph());
    assert_eq!(report.contracts.len(), 10);
    assert_eq!(broken_ids(&report), vec!["independence"]);

    let independence = &report.contracts[1];
    assert_eq!(
        independence.broken_lines[..5],
        [
            "shop.web is not allowed to import shop.billing:".to_string(),
            String::new(),
            "- shop.web.views -> shop.orders.service (l.4)".to_string(),
            "  shop.orders.service -> shop.billing.invoices (l.7)".to_string(),
            String::new(),
        ]
    );
}

#[test]
fn upward_import_breaks_structural_contracts() {
    let mut graph = shop_graph();
    graph.add_detailed_import(
        &DirectImport::new("shop.billing.invoices", "shop.web.views")
            .with_line(9, "from shop.web import views"),
    );
    let report = run(&graph);
    assert_eq!(
        broken_ids(&report),
        vec![
            "layers",
            "independence",
            "forbidden",
            "acyclic",
            "tree",
            "acyclic_siblings",
            "modular",
            "multi_layers",
        ]
    );
    for contract in &report.contracts {
        assert_eq!(contract.check.kept, contract.broken_lines.is_empty(), "{}", contract.id);
    }

    let forbidden = &report.contracts[2];
    assert_eq!(
        forbidden.broken_lines[2],
        "- shop.billing.invoices -> shop.web.views (l.9)"
    );
}

#[test]
fn outside_importer_breaks_protection() {
    let mut graph = shop_graph();
    graph.add_detailed_import(
        &DirectImport::new("shop.utils", "shop.billing.invoices").with_line(2, "import x"),
    );
    let report = run(&graph);
    let broken = broken_ids(&report);
    assert!(broken.contains(&"protected"));
    assert!(!broken.contains(&"standalone"));

    let protected = report
        .contracts
        .iter()
        .find(|c| c.id == "protected")
        .unwrap();
    assert_eq!(
        protected.broken_lines[..3],
        [
            "Illegal imports of protected package shop.billing:".to_string(),
            String::new(),
            "- shop.utils -> shop.billing.invoices (l.2)".to_string(),
        ]
    );
}

#[test]
fn any_import_across_a_standalone_boundary_breaks_it() {
    let mut graph = shop_graph();
    graph.add_detailed_import(
        &DirectImport::new("shop.vendor", "shop.utils").with_line(1, "from shop import utils"),
    );
    let report = run(&graph);
    assert_eq!(broken_ids(&report), vec!["independence", "standalone"]);

    let standalone = &report.contracts[7];
    assert_eq!(
        standalone.broken_lines,
        vec![
            "shop.vendor must be standalone:",
            "",
            "- shop.vendor is not allowed to import shop.utils",
            "",
        ]
    );
}
