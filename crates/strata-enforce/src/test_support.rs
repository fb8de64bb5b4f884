//! Graph and option builders shared by the unit tests.

use strata_core::config::SessionOptions;
use strata_core::graph::ImportGraph;
use strata_core::types::DirectImport;

/// A graph with the given modules and `(importer, imported, line)` imports.
pub(crate) fn graph_from(modules: &[&str], imports: &[(&str, &str, u32)]) -> ImportGraph {
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

pub(crate) fn session(root_packages: &[&str]) -> SessionOptions {
    SessionOptions {
        root_packages: root_packages.iter().map(|r| r.to_string()).collect(),
        ..Default::default()
    }
}
