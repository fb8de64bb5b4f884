//! The built-in contract types.
//!
//! Each module exposes a `TYPE_NAME`, a `build` factory for the registry, and the contract
//! struct itself.

pub mod acyclic;
pub mod acyclic_siblings;
pub mod forbidden;
pub mod independence;
pub mod layers;
pub mod modular;
pub mod multi_layers;
pub mod protected;
pub mod standalone;
pub mod tree;

use strata_core::expression::{resolve_module_expressions, ModuleExpression};
use strata_core::graph::ImportGraph;
use strata_core::types::is_in_package;

use crate::chains::render_chain;
use crate::types::{ChainViolation, ContractError};

/// Resolve expressions to module names in declaration order, without duplicates.
///
/// Literal expressions must name a module in the graph; wildcard expressions must match
/// at least one.
pub(crate) fn existing_modules(
    graph: &ImportGraph,
    expressions: &[ModuleExpression],
) -> Result<Vec<String>, ContractError> {
    let mut modules: Vec<String> = Vec::new();
    for expression in expressions {
        if !expression.has_wildcard() {
            if !graph.contains(expression.as_str()) {
                return Err(ContractError::ModuleNotFound(expression.to_string()));
            }
            if !modules.iter().any(|m| m == expression.as_str()) {
                modules.push(expression.to_string());
            }
            continue;
        }
        for resolved in resolve_module_expressions(graph, [expression], false, true)? {
            if !modules.contains(&resolved.name) {
                modules.push(resolved.name);
            }
        }
    }
    Ok(modules)
}

/// Fail if any of the modules is absent from the graph.
pub(crate) fn check_modules_exist<'a>(
    graph: &ImportGraph,
    modules: impl IntoIterator<Item = &'a str>,
) -> Result<(), ContractError> {
    for module in modules {
        if !graph.contains(module) {
            return Err(ContractError::ModuleNotFound(module.to_string()));
        }
    }
    Ok(())
}

/// A copy of `graph` without the given packages.
///
/// A package is left alone if any module in `keep` lies inside it.
pub(crate) fn without_packages(
    graph: &ImportGraph,
    remove: &[String],
    keep: &[&str],
) -> ImportGraph {
    let mut pruned = graph.clone();
    for module in remove {
        if !keep.iter().any(|kept| is_in_package(kept, module)) {
            pruned.remove_package(module);
        }
    }
    pruned
}

/// `"{downstream} is not allowed to import {upstream}:"` followed by each chain.
pub(crate) fn render_chain_violations(violations: &[ChainViolation]) -> Vec<String> {
    let mut lines = Vec::new();
    for violation in violations {
        lines.push(format!(
            "{} is not allowed to import {}:",
            violation.downstream, violation.upstream
        ));
        lines.push(String::new());
        for chain in &violation.chains {
            lines.extend(render_chain(chain));
            lines.push(String::new());
        }
        lines.push(String::new());
    }
    lines
}
