//! Layers contracts: higher layers may import lower ones, never the reverse.
//!
//! Layers may be repeated under several containers. Siblings in an independent layer
//! (`a | b`) may not import each other; grouped siblings (`a : b`) may.

use std::collections::BTreeSet;
use std::time::Instant;

use strata_core::config::{ContractOptions, SessionOptions};
use strata_core::expression::{resolve_module_expressions, ImportExpression, ModuleExpression};
use strata_core::graph::ImportGraph;
use strata_core::types::is_in_package;

use super::{render_chain_violations, without_packages};
use crate::alerting::{remove_ignored_imports, AlertLevel};
use crate::chains::find_illegal_chains;
use crate::contract::{format_duration, pluralize, progress, Contract, OptionReader};
use crate::fields::{
    BooleanField, EnumField, ImportExpressionField, Layer, LayerField, ListField,
    ModuleExpressionField, SetField, StringField,
};
use crate::types::{ChainViolation, CheckMetadata, ContractCheck, ContractError};

pub const TYPE_NAME: &str = "layers";

/// One (higher, lower) module pair the lower may not reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerPair {
    pub higher: String,
    pub lower: String,
    pub container: Option<String>,
}

#[derive(Debug)]
pub struct LayersContract {
    name: String,
    root_packages: Vec<String>,
    layers: Vec<Layer>,
    containers: Vec<ModuleExpression>,
    ignore_imports: BTreeSet<ImportExpression>,
    unmatched_alerting: AlertLevel,
    exhaustive: bool,
    exhaustive_ignores: BTreeSet<String>,
}

pub fn build(
    options: &ContractOptions,
    session: &SessionOptions,
) -> Result<Box<dyn Contract>, ContractError> {
    LayersContract::from_options(options, session).map(|c| Box::new(c) as Box<dyn Contract>)
}

impl LayersContract {
    pub fn from_options(
        options: &ContractOptions,
        session: &SessionOptions,
    ) -> Result<Self, ContractError> {
        let mut reader = OptionReader::new(options);
        let layers = reader.required("layers", ListField(LayerField));
        let containers = reader.optional("containers", ListField(ModuleExpressionField));
        let ignore_imports = reader.optional("ignore_imports", SetField(ImportExpressionField));
        let unmatched_alerting = reader.with_default(
            "unmatched_ignore_imports_alerting",
            EnumField {
                choices: AlertLevel::CHOICES,
            },
            AlertLevel::Error,
        );
        let exhaustive = reader.with_default("exhaustive", BooleanField, false);
        let exhaustive_ignores = reader.optional("exhaustive_ignores", SetField(StringField));
        reader.finish()?;

        let containers = containers.unwrap_or_default();
        if exhaustive && containers.is_empty() {
            return Err(ContractError::Precondition(
                "The exhaustive option is not supported for contracts without containers."
                    .to_string(),
            ));
        }

        Ok(Self {
            name: options.name.clone(),
            root_packages: session.root_packages.clone(),
            layers: layers.unwrap_or_default(),
            containers,
            ignore_imports: ignore_imports.unwrap_or_default(),
            unmatched_alerting,
            exhaustive,
            exhaustive_ignores: exhaustive_ignores.unwrap_or_default(),
        })
    }

    /// Concrete containers. Literal expressions are taken as written.
    fn resolve_containers(&self, graph: &ImportGraph) -> Result<BTreeSet<String>, ContractError> {
        let mut containers = BTreeSet::new();
        for expression in &self.containers {
            if expression.has_wildcard() {
                containers.extend(
                    resolve_module_expressions(graph, [expression], false, false)?
                        .into_iter()
                        .map(|resolved| resolved.name),
                );
            } else {
                containers.insert(expression.to_string());
            }
        }
        Ok(containers)
    }

    fn validate_containers(
        &self,
        graph: &ImportGraph,
        containers: &BTreeSet<String>,
    ) -> Result<(), ContractError> {
        for container in containers {
            if !self
                .root_packages
                .iter()
                .any(|root| is_in_package(container, root))
            {
                let message = match self.root_packages.as_slice() {
                    [root] => format!(
                        "Invalid container '{container}': a container must either be a \
                         subpackage of {root}, or {root} itself."
                    ),
                    roots => format!(
                        "Invalid container '{container}': a container must either be a root \
                         package, or a subpackage of one of them. (The root packages are: {}.)",
                        roots.join(", ")
                    ),
                };
                return Err(ContractError::Precondition(message));
            }
            for tail in self.required_tails() {
                let module = format!("{container}.{tail}");
                if !graph.contains(&module) {
                    return Err(ContractError::Precondition(format!(
                        "Missing layer in container '{container}': module {module} does not exist."
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_containerless_layers_exist(&self, graph: &ImportGraph) -> Result<(), ContractError> {
        for tail in self.required_tails() {
            if !graph.contains(tail) {
                return Err(ContractError::Precondition(format!(
                    "Missing layer '{tail}': module {tail} does not exist."
                )));
            }
        }
        Ok(())
    }

    fn required_tails(&self) -> impl Iterator<Item = &str> {
        self.layers
            .iter()
            .flat_map(|layer| layer.module_tails.iter())
            .filter(|tail| !tail.is_optional)
            .map(|tail| tail.name.as_str())
    }

    fn all_tails(&self) -> BTreeSet<&str> {
        self.layers
            .iter()
            .flat_map(|layer| layer.module_tails.iter())
            .map(|tail| tail.name.as_str())
            .collect()
    }

    /// Children of a container that no layer (or exhaustive ignore) accounts for.
    fn undeclared_modules(
        &self,
        graph: &ImportGraph,
        containers: &BTreeSet<String>,
    ) -> BTreeSet<String> {
        if !self.exhaustive {
            return BTreeSet::new();
        }
        let declared = self.all_tails();
        let mut undeclared = BTreeSet::new();
        for container in containers {
            for child in graph.find_children(container) {
                let tail = &child[container.len() + 1..];
                if !declared.contains(tail) && !self.exhaustive_ignores.contains(tail) {
                    undeclared.insert(child.clone());
                }
            }
        }
        undeclared
    }

    /// Every pair the contract forbids, in declaration order.
    ///
    /// Across layers: each tail of a higher layer against each tail of every lower layer.
    /// Within an independent layer: each ordered pair of distinct tails. Pairs are
    /// instantiated once per container, or once at the top level without containers.
    pub fn layer_pairs(&self, containers: &BTreeSet<String>) -> Vec<LayerPair> {
        let prefixes: Vec<Option<&String>> = if containers.is_empty() {
            vec![None]
        } else {
            containers.iter().map(Some).collect()
        };
        let qualify = |container: Option<&String>, tail: &str| match container {
            Some(container) => format!("{container}.{tail}"),
            None => tail.to_string(),
        };

        let mut pairs = Vec::new();
        for (index, higher_layer) in self.layers.iter().enumerate() {
            for lower_layer in &self.layers[index + 1..] {
                for higher in &higher_layer.module_tails {
                    for lower in &lower_layer.module_tails {
                        for container in &prefixes {
                            pairs.push(LayerPair {
                                higher: qualify(*container, &higher.name),
                                lower: qualify(*container, &lower.name),
                                container: container.cloned(),
                            });
                        }
                    }
                }
            }
            if higher_layer.is_independent {
                for a in &higher_layer.module_tails {
                    for b in &higher_layer.module_tails {
                        if a == b {
                            continue;
                        }
                        for container in &prefixes {
                            pairs.push(LayerPair {
                                higher: qualify(*container, &a.name),
                                lower: qualify(*container, &b.name),
                                container: container.cloned(),
                            });
                        }
                    }
                }
            }
        }
        pairs
    }

    /// Layer modules in the same container as `pair`, which must not be transited.
    fn sibling_layer_modules(&self, pair: &LayerPair) -> Vec<String> {
        self.all_tails()
            .into_iter()
            .map(|tail| match &pair.container {
                Some(container) => format!("{container}.{tail}"),
                None => tail.to_string(),
            })
            .filter(|module| *module != pair.higher && *module != pair.lower)
            .collect()
    }
}

impl Contract for LayersContract {
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
        let warnings =
            remove_ignored_imports(graph, &self.ignore_imports, self.unmatched_alerting)?;

        let containers = self.resolve_containers(graph)?;
        if containers.is_empty() {
            self.check_containerless_layers_exist(graph)?;
        } else {
            self.validate_containers(graph, &containers)?;
        }
        let undeclared_modules = self.undeclared_modules(graph, &containers);

        let mut invalid_dependencies = Vec::new();
        for pair in self.layer_pairs(&containers) {
            if !graph.contains(&pair.higher) || !graph.contains(&pair.lower) {
                continue;
            }
            progress(
                verbose,
                &format!(
                    "Searching for import chains from {} to {}...",
                    pair.lower, pair.higher
                ),
            );
            let started = Instant::now();
            let pruned = without_packages(
                graph,
                &self.sibling_layer_modules(&pair),
                &[pair.higher.as_str(), pair.lower.as_str()],
            );
            let chains = find_illegal_chains(&pruned, &pair.lower, &pair.higher, true, true)?;
            progress(
                verbose,
                &format!(
                    "Found {} in {}.",
                    pluralize(chains.len(), "illegal chain", "illegal chains"),
                    format_duration(started.elapsed())
                ),
            );
            if !chains.is_empty() {
                invalid_dependencies.push(ChainViolation {
                    downstream: pair.lower,
                    upstream: pair.higher,
                    chains,
                });
            }
        }

        Ok(ContractCheck {
            kept: invalid_dependencies.is_empty() && undeclared_modules.is_empty(),
            warnings,
            metadata: CheckMetadata::Layers {
                invalid_dependencies,
                undeclared_modules,
            },
        })
    }

    fn render_broken_contract(&self, check: &ContractCheck) -> Vec<String> {
        let CheckMetadata::Layers {
            invalid_dependencies,
            undeclared_modules,
        } = &check.metadata
        else {
            return Vec::new();
        };
        let mut lines = render_chain_violations(invalid_dependencies);
        if !undeclared_modules.is_empty() {
            lines.push("The following modules are not listed as layers:".to_string());
            lines.push(String::new());
            lines.extend(undeclared_modules.iter().map(|module| format!("- {module}")));
            lines.push(String::new());
            lines.push(
                "(Since this contract is marked as 'exhaustive', every child of every \
                 container must be declared as a layer.)"
                    .to_string(),
            );
            lines.push(String::new());
        }
        lines
    }
}

#[cfg(test)]
#[path = "layers_tests.rs"]
mod tests;
