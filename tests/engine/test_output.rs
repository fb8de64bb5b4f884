/// Reports rendered by the human and JSON formatters.
use serde_json::{json, Value};
use strata_enforce::engine::{create_report, Report, RunOptions};
use strata_enforce::ContractRegistry;
use strata_output::human::HumanFormatter;
use strata_output::json::JsonFormatter;
use strata_output::OutputFormatter;

use crate::common::{shop_graph, user_options};

fn report(contracts: Value) -> Report {
    create_report(
        &shop_graph(),
        &user_options(json!({"root_package": "shop", "contracts": contracts})),
        &ContractRegistry::with_builtins(),
        &RunOptions::default(),
    )
    .unwrap()
}

fn mixed_report() -> Report {
    report(json!([
        {
            "name": "Shop layers",
            "type": "layers",
            "layers": ["web", "orders", "billing"],
            "containers": "shop",
            "ignore_imports": ["shop.vendor -> shop.utils"],
            "unmatched_ignore_imports_alerting": "warn",
        },
        {
            "name": "Billing stays out of the web",
            "type": "forbidden",
            "source_modules": ["shop.web"],
            "forbidden_modules": ["shop.billing"],
        },
    ]))
}

#[test]
fn human_report_summarises_then_explains() {
    let out = HumanFormatter.format_report(&mixed_report());

    assert!(out.starts_with("---------\nContracts\n---------\n\n"));
    assert!(out.contains("Analyzed 10 files, 6 dependencies.\n"));
    assert!(out.contains("Shop layers KEPT (1 warning)\n"));
    assert!(out.contains("Billing stays out of the web BROKEN\n"));
    assert!(out.contains("Contracts: 1 kept, 1 broken.\n"));
    assert!(out.contains(
        "- Ignored import expression shop.vendor -> shop.utils didn't match anything in the graph."
    ));

    let broken = out.find("Broken contracts").unwrap();
    assert!(out.find("Warnings").unwrap() < broken);
    let details = &out[broken..];
    assert!(details.contains("shop.web is not allowed to import shop.billing:"));
    assert!(details.contains("- shop.web.views -> shop.orders.service (l.4)"));
    assert!(details.contains("  shop.orders.service -> shop.billing.invoices (l.7)"));
}

#[test]
fn human_report_lists_misconfigured_contracts() {
    let out = HumanFormatter.format_report(&report(json!([
        {"name": "Half a forbidden", "type": "forbidden", "source_modules": ["shop.web"]},
    ])));
    assert!(out.starts_with("Contract \"Half a forbidden\" is not configured correctly:\n"));
    assert!(out.contains("    forbidden_modules: "));
    assert!(!out.contains("Contracts:"));
}

#[test]
fn human_report_shows_checked_contracts_after_misconfigured_ones() {
    let out = HumanFormatter.format_report(&report(json!([
        {"name": "Half a forbidden", "type": "forbidden", "source_modules": ["shop.web"]},
        {"name": "No cycles", "type": "acyclic"},
    ])));
    assert!(out.starts_with("Contract \"Half a forbidden\" is not configured correctly:\n"));
    assert!(out.contains("No cycles KEPT\n"));
    assert!(out.contains("Contracts: 1 kept, 0 broken.\n"));
    assert!(!out.contains("Half a forbidden KEPT"));
}

#[test]
fn json_report_carries_metadata() {
    let value: Value =
        serde_json::from_str(&JsonFormatter.format_report(&mixed_report())).unwrap();

    assert_eq!(value["passed"], false);
    assert_eq!(value["module_count"], 10);
    assert_eq!(value["kept_count"], 1);
    assert_eq!(value["broken_count"], 1);
    assert_eq!(value["warnings_count"], 1);

    let contracts = value["contracts"].as_array().unwrap();
    assert_eq!(contracts[0]["type"], "layers");
    assert_eq!(contracts[0]["kept"], true);
    assert_eq!(contracts[1]["kept"], false);
    let chains = &contracts[1]["metadata"]["forbidden"]["invalid_chains"];
    assert_eq!(chains[0]["downstream"], "shop.web");
    assert_eq!(chains[0]["upstream"], "shop.billing");
    assert_eq!(chains[0]["chains"][0]["chain"].as_array().unwrap().len(), 2);
}

#[test]
fn contract_types_listing() {
    let registry = ContractRegistry::with_builtins();
    let names: Vec<&str> = registry.type_names().collect();

    let human = HumanFormatter.format_contract_types(&names);
    assert!(human.contains("- multi_layers\n"));
    assert_eq!(human.lines().filter(|l| l.starts_with("- ")).count(), 10);

    let value: Value = serde_json::from_str(&JsonFormatter.format_contract_types(&names)).unwrap();
    assert_eq!(value["contract_types"].as_array().unwrap().len(), 10);
}
