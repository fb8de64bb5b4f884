//! Acyclic contracts: no module (or package) may take part in an import cycle.
//!
//! Cycles are reported in families: all cycles sharing the same parent package and running
//! through the same set of its children.

use std::collections::BTreeSet;

use strata_core::config::{ContractOptions, SessionOptions};
use strata_core::graph::ImportGraph;
use strata_core::types::is_descendant;

use crate::contract::{progress, Contract, OptionReader};
use crate::fields::{BooleanField, IntegerField};
use crate::types::{CheckMetadata, ContractCheck, ContractError, CycleFamily};

pub const TYPE_NAME: &str = "acyclic";

#[derive(Debug)]
pub struct AcyclicContract {
    name: String,
    consider_package_dependencies: bool,
    /// Stop after this many families; `None` searches every module.
    max_cycle_families: Option<usize>,
}

pub fn build(
    options: &ContractOptions,
    _session: &SessionOptions,
) -> Result<Box<dyn Contract>, ContractError> {
    let mut reader = OptionReader::new(options);
    let consider_package_dependencies =
        reader.with_default("consider_package_dependencies", BooleanField, true);
    let max_cycle_families =
        reader.with_default("max_cycle_families", IntegerField { minimum: Some(0) }, 0);
    reader.finish()?;

    Ok(Box::new(AcyclicContract {
        name: options.name.clone(),
        consider_package_dependencies,
        max_cycle_families: usize::try_from(max_cycle_families)
            .ok()
            .filter(|limit| *limit > 0),
    }))
}

/// Dotted components of `module` minus the last one; a top-level module is its own parent.
fn parent_components(module: &str) -> Vec<&str> {
    let mut components: Vec<&str> = module.split('.').collect();
    if components.len() > 1 {
        components.pop();
    }
    components
}

/// The deepest package containing the parents of every module, if they share a root.
pub(crate) fn longest_common_package<'a>(
    modules: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    let mut common: Option<Vec<&str>> = None;
    for module in modules {
        let parents = parent_components(module);
        common = Some(match common {
            None => parents,
            Some(current) => current
                .iter()
                .zip(parents.iter())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect(),
        });
    }
    common.filter(|c| !c.is_empty()).map(|c| c.join("."))
}

/// The sibling-package dependency implied by an import, e.g. `pkg.a.x -> pkg.b.y` implies
/// `pkg.a -> pkg.b`. `None` when the import already is that dependency, when one side
/// contains the other, or when there is no common package.
pub(crate) fn package_dependency(importer: &str, imported: &str) -> Option<(String, String)> {
    let common = longest_common_package([importer, imported])?;
    if common == importer || common == imported {
        return None;
    }
    let child_of_common = |module: &str| -> String {
        let rest = &module[common.len() + 1..];
        let head = rest.split('.').next().unwrap_or(rest);
        format!("{common}.{head}")
    };
    let importer_package = child_of_common(importer);
    let imported_package = child_of_common(imported);
    if importer_package == imported_package
        || (importer_package.as_str(), imported_package.as_str()) == (importer, imported)
    {
        return None;
    }
    Some((importer_package, imported_package))
}

/// `(parent, siblings)` identifying the family a cycle belongs to.
fn family_key(members: &[String]) -> (String, Vec<String>) {
    let parent = longest_common_package(members.iter().map(String::as_str)).unwrap_or_default();
    let depth = if parent.is_empty() {
        1
    } else {
        parent.split('.').count() + 1
    };
    let siblings: BTreeSet<String> = members
        .iter()
        .filter(|member| parent.is_empty() || is_descendant(member, &parent))
        .map(|member| member.split('.').take(depth).collect::<Vec<_>>().join("."))
        .collect();
    (parent, siblings.into_iter().collect())
}

impl AcyclicContract {
    /// Add an import between sibling packages for every import between their contents.
    fn add_package_dependencies(&self, graph: &mut ImportGraph, verbose: bool) {
        let mut added: BTreeSet<(String, String)> = BTreeSet::new();
        for (importer, imported) in graph.imports() {
            let Some(dependency) = package_dependency(&importer, &imported) else {
                continue;
            };
            if added.contains(&dependency) {
                continue;
            }
            progress(
                verbose,
                &format!(
                    "Adding package dependency ({} -> {}) based on import ({importer} -> {imported})",
                    dependency.0, dependency.1
                ),
            );
            graph.add_import(&dependency.0, &dependency.1);
            added.insert(dependency);
        }
    }
}

impl Contract for AcyclicContract {
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
        if self.consider_package_dependencies {
            self.add_package_dependencies(graph, verbose);
        }

        let mut families: Vec<CycleFamily> = Vec::new();
        let modules: Vec<String> = graph.modules().map(str::to_string).collect();
        for module in &modules {
            let Some(members) = graph.find_shortest_cycle(module, true) else {
                continue;
            };
            progress(
                verbose,
                &format!("Cycle found in module '{module}': {}", members.join(" -> ")),
            );
            let (parent, siblings) = family_key(&members);
            match families
                .iter_mut()
                .find(|f| f.parent == parent && f.siblings == siblings)
            {
                Some(family) => family.cycles.push(members),
                None => families.push(CycleFamily {
                    parent,
                    siblings,
                    cycles: vec![members],
                }),
            }
            if Some(families.len()) == self.max_cycle_families {
                break;
            }
        }

        Ok(ContractCheck {
            kept: families.is_empty(),
            warnings: Vec::new(),
            metadata: CheckMetadata::Acyclic {
                cycle_families: families,
            },
        })
    }

    fn render_broken_contract(&self, check: &ContractCheck) -> Vec<String> {
        let CheckMetadata::Acyclic { cycle_families } = &check.metadata else {
            return Vec::new();
        };
        if cycle_families.is_empty() {
            return Vec::new();
        }
        let mut lines = Vec::new();
        for family in cycle_families {
            lines.push(format!(">>>> Cycles family for parent module '{}'", family.parent));
            lines.push(String::new());
            lines.push("Siblings:".to_string());
            lines.push("(".to_string());
            lines.extend(family.siblings.iter().map(|s| format!("  {s}")));
            lines.push(")".to_string());
            lines.push(String::new());
            lines.push(format!("Number of cycles: {}", family.cycles.len()));
            lines.push(String::new());
            for (index, cycle) in family.cycles.iter().enumerate() {
                lines.push(format!("Cycle {}:", index + 1));
                lines.push(String::new());
                lines.push("(".to_string());
                lines.extend(cycle.iter().map(|member| format!(" -> {member}")));
                lines.push(")".to_string());
                lines.push(String::new());
            }
            lines.push(format!("<<<< Cycles family for parent module '{}'", family.parent));
            lines.push(String::new());
        }
        let mut summary = format!(
            "Acyclic contract broken. Number of cycle families found: {}",
            cycle_families.len()
        );
        if let Some(limit) = self.max_cycle_families {
            summary.push_str(&format!(" (limit = {limit})"));
        }
        lines.push(summary);
        lines.push(String::new());
        lines
    }
}
