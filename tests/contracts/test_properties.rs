/// Properties every contract implementation must hold, checked through the public API.
use std::collections::BTreeSet;

use strata_core::config::{ContractOptions, SessionOptions};
use strata_core::expression::{ImportExpression, ModuleExpression};
use strata_core::graph::ImportGraph;
use strata_enforce::alerting::{add_imports, pop_imports};
use strata_enforce::chains::find_illegal_chains;
use strata_enforce::types::{CheckMetadata, ContractCheck, Link};
use strata_enforce::ContractRegistry;

use crate::common::graph_from;

fn session(root: &str) -> SessionOptions {
    SessionOptions {
        root_packages: vec![root.to_string()],
        ..Default::default()
    }
}

fn check(options: ContractOptions, root: &str, graph: &ImportGraph) -> ContractCheck {
    let contract = ContractRegistry::with_builtins()
        .build(&options, &session(root))
        .unwrap_or_else(|e| panic!("{e}"));
    contract.check(&mut graph.clone(), false).unwrap()
}

/// Ten modules, each importing the next one along when `step` divides its index.
fn ladder(step: usize) -> ImportGraph {
    let names: Vec<String> = (0..10).map(|i| format!("pkg.m{i}")).collect();
    let mut modules: Vec<&str> = vec!["pkg"];
    modules.extend(names.iter().map(String::as_str));
    let imports: Vec<(&str, &str, u32)> = (0..9)
        .filter(|i| i % step == 0)
        .map(|i| (names[i].as_str(), names[i + 1].as_str(), i as u32 + 1))
        .collect();
    graph_from(&modules, &imports)
}

#[test]
fn independence_holds_without_a_path() {
    for step in [2, 3, 4] {
        let graph = ladder(step);
        for a in 0..10 {
            for b in 0..10 {
                let (low, high) = (a.min(b), a.max(b));
                if low == high || (low..high).all(|i| i % step == 0) {
                    continue;
                }
                let options = ContractOptions::new("independent", "independence")
                    .with("modules", vec![format!("pkg.m{a}"), format!("pkg.m{b}")]);
                assert!(
                    check(options, "pkg", &graph).kept,
                    "pkg.m{a} and pkg.m{b} share no path (step {step})"
                );
            }
        }
    }
}

#[test]
fn popping_and_adding_ignored_import_round_trips() {
    let mut graph = graph_from(
        &["app", "app.ui", "app.ui.forms", "app.db", "app.db.models"],
        &[
            ("app.ui.forms", "app.db.models", 12),
            ("app.db.models", "app.ui.forms", 30),
        ],
    );
    let forbidden = ContractOptions::new("db is low level", "forbidden")
        .with("source_modules", "app.db")
        .with("forbidden_modules", "app.ui");

    let before = check(forbidden.clone(), "app", &graph);
    assert!(!before.kept);

    let expression = ImportExpression::parse("app.db.models -> app.ui.forms").unwrap();
    let popped = pop_imports(&mut graph, [&expression]).unwrap();
    assert_eq!(popped.len(), 1);
    assert!(check(forbidden.clone(), "app", &graph).kept);

    add_imports(&mut graph, &popped);
    assert_eq!(check(forbidden, "app", &graph), before);
}

#[test]
fn layers_without_violations_are_kept() {
    let layers = ["five", "four", "three", "two", "one"];
    let mut modules = vec!["pkg".to_string()];
    modules.extend(layers.iter().map(|l| format!("pkg.{l}")));
    let mut imports = Vec::new();
    for (i, higher) in layers.iter().enumerate() {
        for lower in &layers[i + 1..] {
            imports.push((format!("pkg.{higher}"), format!("pkg.{lower}")));
        }
    }
    let module_refs: Vec<&str> = modules.iter().map(String::as_str).collect();
    let import_refs: Vec<(&str, &str, u32)> = imports
        .iter()
        .map(|(a, b)| (a.as_str(), b.as_str(), 1))
        .collect();
    let graph = graph_from(&module_refs, &import_refs);

    let options = ContractOptions::new("five layers", "layers")
        .with("layers", layers.to_vec())
        .with("containers", "pkg");
    let result = check(options, "pkg", &graph);
    assert!(result.kept);
    let CheckMetadata::Layers {
        invalid_dependencies,
        undeclared_modules,
    } = result.metadata
    else {
        panic!("wrong metadata");
    };
    assert!(invalid_dependencies.is_empty());
    assert!(undeclared_modules.is_empty());
}

#[test]
fn removing_cycle_breakers_leaves_children_acyclic() {
    let graph = graph_from(
        &[
            "pkg", "pkg.a", "pkg.a.one", "pkg.a.two", "pkg.b", "pkg.b.one", "pkg.c", "pkg.d",
        ],
        &[
            ("pkg.a.one", "pkg.b.one", 1),
            ("pkg.a.two", "pkg.b", 2),
            ("pkg.b.one", "pkg.c", 3),
            ("pkg.c", "pkg.a.two", 4),
            ("pkg.c", "pkg.d", 5),
            ("pkg.d", "pkg.b", 6),
            ("pkg.b", "pkg.d", 7),
        ],
    );
    let breakers = graph.nominate_cycle_breakers("pkg");
    assert!(!breakers.is_empty());

    let mut broken = graph.clone();
    for (importer, imported) in &breakers {
        broken.remove_import(importer, imported);
    }
    let children: BTreeSet<String> = broken.find_children("pkg");
    for child in &children {
        broken.squash_module(child).unwrap();
    }
    for child in &children {
        assert_eq!(broken.find_shortest_cycle(child, false), None, "cycle through {child}");
    }
}

#[test]
fn shared_downstream_path_collapses_into_extra_firsts() {
    let graph = graph_from(
        &["pkg", "pkg.low", "pkg.low.a1", "pkg.low.a2", "pkg.low.a3", "pkg.mid", "pkg.high"],
        &[
            ("pkg.low.a2", "pkg.mid", 20),
            ("pkg.low.a3", "pkg.mid", 30),
            ("pkg.low.a1", "pkg.mid", 10),
            ("pkg.mid", "pkg.high", 5),
        ],
    );
    let chains = find_illegal_chains(&graph, "pkg.low", "pkg.high", true, true).unwrap();
    assert_eq!(chains.len(), 1);
    assert_eq!(
        chains[0].chain,
        vec![
            Link::new("pkg.low.a1", "pkg.mid", vec![Some(10)]),
            Link::new("pkg.mid", "pkg.high", vec![Some(5)]),
        ]
    );
    assert_eq!(
        chains[0].extra_firsts,
        vec![
            Link::new("pkg.low.a2", "pkg.mid", vec![Some(20)]),
            Link::new("pkg.low.a3", "pkg.mid", vec![Some(30)]),
        ]
    );
    assert!(chains[0].extra_lasts.is_empty());
}

#[test]
fn single_and_double_wildcards() {
    let single = ModuleExpression::parse("pkg.*.models").unwrap();
    assert!(single.matches("pkg.foo.models"));
    assert!(single.matches("pkg.bar.models"));
    assert!(!single.matches("pkg.foo.sub.models"));

    let double = ModuleExpression::parse("pkg.**.models").unwrap();
    assert!(double.matches("pkg.foo.models"));
    assert!(double.matches("pkg.foo.sub.models"));
}

#[test]
fn forbidden_import_end_to_end() {
    let graph = graph_from(
        &["one", "one.alpha", "green", "green.beta"],
        &[("one.alpha", "green.beta", 3)],
    );
    let options = ContractOptions::new("one may not use green", "forbidden")
        .with("source_modules", "one")
        .with("forbidden_modules", "green");
    let contract = ContractRegistry::with_builtins()
        .build(
            &options,
            &SessionOptions {
                root_packages: vec!["one".to_string(), "green".to_string()],
                ..Default::default()
            },
        )
        .unwrap_or_else(|e| panic!("{e}"));
    let result = contract.check(&mut graph.clone(), false).unwrap();

    assert!(!result.kept);
    let CheckMetadata::Forbidden { invalid_chains } = &result.metadata else {
        panic!("wrong metadata");
    };
    assert_eq!(invalid_chains.len(), 1);
    assert_eq!(invalid_chains[0].chains.len(), 1);
    assert_eq!(
        invalid_chains[0].chains[0].chain,
        vec![Link::new("one.alpha", "green.beta", vec![Some(3)])]
    );
    assert_eq!(
        contract.render_broken_contract(&result)[..3],
        [
            "one is not allowed to import green:".to_string(),
            String::new(),
            "- one.alpha -> green.beta (l.3)".to_string(),
        ]
    );
}
