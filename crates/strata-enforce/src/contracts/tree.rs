//! Tree contracts: the import graph must contain no simple cycle at all.

use strata_core::config::{ContractOptions, SessionOptions};
use strata_core::graph::ImportGraph;

use crate::contract::{progress, Contract, OptionReader};
use crate::fields::BooleanField;
use crate::types::{CheckMetadata, ContractCheck, ContractError};

pub const TYPE_NAME: &str = "tree";

#[derive(Debug)]
pub struct TreeContract {
    name: String,
    consider_package_dependencies: bool,
}

pub fn build(
    options: &ContractOptions,
    _session: &SessionOptions,
) -> Result<Box<dyn Contract>, ContractError> {
    let mut reader = OptionReader::new(options);
    let consider_package_dependencies =
        reader.with_default("consider_package_dependencies", BooleanField, true);
    reader.finish()?;

    Ok(Box::new(TreeContract {
        name: options.name.clone(),
        consider_package_dependencies,
    }))
}

/// `module` followed by its ancestors, innermost first.
fn with_ancestors(module: &str) -> Vec<&str> {
    let mut family = vec![module];
    let mut current = module;
    while let Some((parent, _)) = current.rsplit_once('.') {
        family.push(parent);
        current = parent;
    }
    family
}

impl TreeContract {
    fn family<'a>(&self, module: &'a str) -> Vec<&'a str> {
        if self.consider_package_dependencies {
            with_ancestors(module)
        } else {
            vec![module]
        }
    }

    /// A graph in which every import also links the ancestors of both ends.
    fn dependency_graph(&self, graph: &ImportGraph) -> ImportGraph {
        let mut dependencies = ImportGraph::new();
        for importer in graph.modules() {
            let imported_modules = graph.find_modules_directly_imported_by(importer);
            for importer_member in self.family(importer) {
                dependencies.add_module(importer_member);
                for imported in &imported_modules {
                    for imported_member in self.family(imported) {
                        if importer_member != imported_member {
                            dependencies.add_import(importer_member, imported_member);
                        }
                    }
                }
            }
        }
        dependencies
    }
}

impl Contract for TreeContract {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn check(
        &self,
        graph: &mut ImportGraph,
        verbose: bool,
    ) -> Result<ContractCheck, ContractError> {
        let dependencies = self.dependency_graph(graph);
        progress(
            verbose,
            &format!(
                "Searching for cycles among {} modules...",
                dependencies.module_count()
            ),
        );
        let cycles = dependencies.find_simple_cycles();
        Ok(ContractCheck {
            kept: cycles.is_empty(),
            warnings: Vec::new(),
            metadata: CheckMetadata::Tree { cycles },
        })
    }

    fn render_broken_contract(&self, check: &ContractCheck) -> Vec<String> {
        let CheckMetadata::Tree { cycles } = &check.metadata else {
            return Vec::new();
        };
        let mut lines = Vec::new();
        for cycle in cycles {
            let mut members: Vec<&str> = cycle.iter().map(String::as_str).collect();
            if let Some(first) = cycle.first() {
                members.push(first);
            }
            lines.push(format!("Cycle found: {}", members.join(" -> ")));
            lines.push(String::new());
        }
        lines
    }
}
