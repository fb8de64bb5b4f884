//! Modular contracts: the children of a module may depend on each other, directly or
//! indirectly, but never in a circle.

use std::collections::{BTreeMap, BTreeSet};

use strata_core::config::{ContractOptions, SessionOptions};
use strata_core::graph::ImportGraph;
use strata_core::graph_chains::LayerSpec;
use strata_core::types::Module;

use super::check_modules_exist;
use crate::contract::{progress, Contract, OptionReader};
use crate::fields::{ListField, ModuleField};
use crate::types::{CheckMetadata, ContractCheck, ContractError};

pub const TYPE_NAME: &str = "modular";

#[derive(Debug)]
pub struct ModularContract {
    name: String,
    modules: Vec<Module>,
}

pub fn build(
    options: &ContractOptions,
    _session: &SessionOptions,
) -> Result<Box<dyn Contract>, ContractError> {
    let mut reader = OptionReader::new(options);
    let modules = reader.required("modules", ListField(ModuleField));
    reader.finish()?;

    Ok(Box::new(ModularContract {
        name: options.name.clone(),
        modules: modules.unwrap_or_default(),
    }))
}

/// Child dependencies of `module` that are answered by a path back, as `imported <- importer`.
fn circular_dependencies(
    graph: &ImportGraph,
    module: &str,
) -> Result<Vec<String>, ContractError> {
    let children = graph.find_children(module);
    let mut squashed = graph.clone();
    for child in &children {
        squashed.squash_module(child)?;
    }

    let layers = [LayerSpec::new(children.iter().cloned(), true)];
    let mut violations = BTreeSet::new();
    for dependency in squashed.find_illegal_dependencies_for_layers(&layers, &BTreeSet::new())? {
        let way_back =
            squashed.find_shortest_chains(&dependency.imported, &dependency.importer, true)?;
        if !way_back.is_empty() {
            violations.insert(format!("{} <- {}", dependency.imported, dependency.importer));
        }
    }
    Ok(violations.into_iter().collect())
}

impl Contract for ModularContract {
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
        check_modules_exist(graph, self.modules.iter().map(Module::name))?;

        let mut violations = BTreeMap::new();
        for module in &self.modules {
            progress(
                verbose,
                &format!("Searching for circular dependencies between children of {module}..."),
            );
            let circular = circular_dependencies(graph, module.name())?;
            if !circular.is_empty() {
                violations.insert(module.name().to_string(), circular);
            }
        }

        Ok(ContractCheck {
            kept: violations.is_empty(),
            warnings: Vec::new(),
            metadata: CheckMetadata::Modular { violations },
        })
    }

    fn render_broken_contract(&self, check: &ContractCheck) -> Vec<String> {
        let CheckMetadata::Modular { violations } = &check.metadata else {
            return Vec::new();
        };
        let mut lines = Vec::new();
        for (module, circular) in violations {
            lines.push(format!(
                "child modules of {module} must be modular and thus circular dependencies are \
                 not allowed:"
            ));
            lines.push(String::new());
            lines.extend(circular.iter().map(|violation| format!("- {violation}")));
            lines.push(String::new());
        }
        lines
    }
}
