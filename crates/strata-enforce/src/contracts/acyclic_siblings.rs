//! Acyclic-siblings contracts: the children of each ancestor package, and of their
//! descendants down to a depth, must not depend on each other cyclically.
//!
//! Broken contracts are summarised by the imports the graph nominates as cycle breakers.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use strata_core::config::{ContractOptions, SessionOptions};
use strata_core::expression::{resolve_module_expressions, ImportExpression, ModuleExpression};
use strata_core::graph::ImportGraph;
use strata_core::graph_cycles::CycleBreaker;

use crate::alerting::{remove_ignored_imports, AlertLevel};
use crate::contract::{format_duration, pluralize, progress, Contract, OptionReader};
use crate::fields::{
    EnumField, ImportExpressionField, IntegerField, ModuleExpressionField, SetField,
};
use crate::types::{
    CheckMetadata, ContractCheck, ContractError, PackageSummary, SiblingDependency,
};

pub const TYPE_NAME: &str = "acyclic_siblings";

const DEFAULT_DEPTH: i64 = 10;
const MAX_DEPENDENCIES_TO_RENDER: usize = 5;

#[derive(Debug)]
pub struct AcyclicSiblingsContract {
    name: String,
    ancestors: BTreeSet<ModuleExpression>,
    depth: usize,
    skip_descendants: BTreeSet<ModuleExpression>,
    ignore_imports: BTreeSet<ImportExpression>,
    unmatched_alerting: AlertLevel,
}

pub fn build(
    options: &ContractOptions,
    _session: &SessionOptions,
) -> Result<Box<dyn Contract>, ContractError> {
    let mut reader = OptionReader::new(options);
    let ancestors = reader.required("ancestors", SetField(ModuleExpressionField));
    let depth = reader.with_default("depth", IntegerField { minimum: Some(0) }, DEFAULT_DEPTH);
    let skip_descendants = reader.optional("skip_descendants", SetField(ModuleExpressionField));
    let ignore_imports = reader.optional("ignore_imports", SetField(ImportExpressionField));
    let unmatched_alerting = reader.with_default(
        "unmatched_ignore_imports_alerting",
        EnumField {
            choices: AlertLevel::CHOICES,
        },
        AlertLevel::Error,
    );
    reader.finish()?;

    Ok(Box::new(AcyclicSiblingsContract {
        name: options.name.clone(),
        ancestors: ancestors.unwrap_or_default(),
        depth: usize::try_from(depth).unwrap_or(0),
        skip_descendants: skip_descendants.unwrap_or_default(),
        ignore_imports: ignore_imports.unwrap_or_default(),
        unmatched_alerting,
    }))
}

impl AcyclicSiblingsContract {
    fn check_no_overlap(&self) -> Result<(), ContractError> {
        let Some(overlap) = self.ancestors.intersection(&self.skip_descendants).next() else {
            return Ok(());
        };
        let message = if overlap.has_wildcard() {
            format!("Cannot skip descendant '{overlap}' as the same expression is in ancestors.")
        } else {
            format!("Cannot skip '{overlap}' as it is also an ancestor.")
        };
        Err(ContractError::Precondition(message))
    }

    fn nominate_recursively(
        &self,
        graph: &ImportGraph,
        ancestor: &str,
        remaining_depth: usize,
        skipped: &BTreeSet<String>,
        verbose: bool,
        found: &mut BTreeMap<String, BTreeSet<CycleBreaker>>,
    ) {
        let children = graph.find_children(ancestor);
        if children.is_empty() {
            return;
        }

        // A single child cannot form a cycle.
        if children.len() >= 2 {
            progress(
                verbose,
                &format!("Searching for cycles between children of {ancestor}..."),
            );
            let started = Instant::now();
            let breakers = graph.nominate_cycle_breakers(ancestor);
            let duration = format_duration(started.elapsed());
            if breakers.is_empty() {
                progress(verbose, &format!("No cycles found ({duration})."));
            } else {
                progress(
                    verbose,
                    &format!(
                        "Found {} in {duration}.",
                        pluralize(breakers.len(), "cycle", "cycles")
                    ),
                );
                found.insert(ancestor.to_string(), breakers);
            }
        }

        if remaining_depth > 0 {
            for child in children.difference(skipped) {
                self.nominate_recursively(
                    graph,
                    child,
                    remaining_depth - 1,
                    skipped,
                    verbose,
                    found,
                );
            }
        }
    }
}

/// Collapse cycle breakers to dependencies between the package's children.
fn summarise(package: &str, breakers: &BTreeSet<CycleBreaker>) -> PackageSummary {
    let components = package.split('.').count() + 1;
    let child = |module: &str| module.split('.').take(components).collect::<Vec<_>>().join(".");
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for (importer, imported) in breakers {
        *counts.entry((child(importer), child(imported))).or_default() += 1;
    }
    PackageSummary {
        package: package.to_string(),
        dependencies: counts
            .into_iter()
            .map(|((downstream, upstream), num_imports)| SiblingDependency {
                downstream,
                upstream,
                num_imports,
            })
            .collect(),
    }
}

fn last_component(module: &str) -> &str {
    module.rsplit('.').next().unwrap_or(module)
}

impl Contract for AcyclicSiblingsContract {
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
        self.check_no_overlap()?;
        let ancestors: BTreeSet<String> =
            resolve_module_expressions(graph, &self.ancestors, false, true)?
                .into_iter()
                .map(|resolved| resolved.name)
                .collect();
        let skipped: BTreeSet<String> =
            resolve_module_expressions(graph, &self.skip_descendants, false, true)?
                .into_iter()
                .map(|resolved| resolved.name)
                .collect();
        let warnings =
            remove_ignored_imports(graph, &self.ignore_imports, self.unmatched_alerting)?;

        let mut cycle_breakers_by_package = BTreeMap::new();
        for ancestor in &ancestors {
            self.nominate_recursively(
                graph,
                ancestor,
                self.depth,
                &skipped,
                verbose,
                &mut cycle_breakers_by_package,
            );
        }
        let summaries = cycle_breakers_by_package
            .iter()
            .map(|(package, breakers)| summarise(package, breakers))
            .collect();

        Ok(ContractCheck {
            kept: cycle_breakers_by_package.is_empty(),
            warnings,
            metadata: CheckMetadata::AcyclicSiblings {
                cycle_breakers_by_package,
                summaries,
            },
        })
    }

    fn render_broken_contract(&self, check: &ContractCheck) -> Vec<String> {
        let CheckMetadata::AcyclicSiblings { summaries, .. } = &check.metadata else {
            return Vec::new();
        };
        let mut lines = Vec::new();
        for summary in summaries {
            let count = summary.dependencies.len();
            lines.push(format!("No cycles are allowed in {}.", summary.package));
            lines.push(format!(
                "It could be made acyclic by removing {}:",
                pluralize(count, "dependency", "dependencies")
            ));
            lines.push(String::new());
            for dependency in summary.dependencies.iter().take(MAX_DEPENDENCIES_TO_RENDER) {
                lines.push(format!(
                    "- .{} -> .{} ({})",
                    last_component(&dependency.downstream),
                    last_component(&dependency.upstream),
                    pluralize(dependency.num_imports, "import", "imports")
                ));
            }
            if count > MAX_DEPENDENCIES_TO_RENDER {
                lines.push(format!("(and {} more).", count - MAX_DEPENDENCIES_TO_RENDER));
            }
            lines.push(String::new());
        }
        lines
    }
}
