//! Ignored imports: resolving `ignore_imports` expressions and removing what they match.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strata_core::expression::ImportExpression;
use strata_core::graph::ImportGraph;
use strata_core::types::DirectImport;

use crate::types::ContractError;

/// What to do when an ignored-import expression matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    None,
    Warn,
    #[default]
    Error,
}

impl AlertLevel {
    /// Accepted option values, for [`crate::fields::EnumField`].
    pub const CHOICES: &'static [(&'static str, AlertLevel)] = &[
        ("none", AlertLevel::None),
        ("warn", AlertLevel::Warn),
        ("error", AlertLevel::Error),
    ];
}

/// Every concrete import in the graph matched by `expression`.
fn matching_imports(
    graph: &ImportGraph,
    expression: &ImportExpression,
) -> Result<Vec<DirectImport>, ContractError> {
    let mut matched = Vec::new();
    for (importer, imported) in expression.to_module_pairs(graph)? {
        if !graph.direct_import_exists(&importer, &imported, false) {
            continue;
        }
        let details = graph.get_import_details(&importer, &imported);
        if details.is_empty() {
            matched.push(DirectImport::new(importer, imported));
        } else {
            matched.extend(details);
        }
    }
    Ok(matched)
}

/// Remove every import matched by the expressions, returning what was removed.
///
/// Fails with [`ContractError::MissingImport`] if an expression removes nothing.
pub fn pop_imports<'a>(
    graph: &mut ImportGraph,
    expressions: impl IntoIterator<Item = &'a ImportExpression>,
) -> Result<Vec<DirectImport>, ContractError> {
    let mut removed = Vec::new();
    for expression in expressions {
        let matched = matching_imports(graph, expression)?;
        if matched.is_empty() {
            return Err(ContractError::MissingImport(format!(
                "Ignored import {expression} not present in the graph."
            )));
        }
        for import in &matched {
            graph.remove_import(&import.importer, &import.imported);
        }
        removed.extend(matched);
    }
    Ok(removed)
}

/// Put back imports removed by [`pop_imports`].
pub fn add_imports(graph: &mut ImportGraph, imports: &[DirectImport]) {
    for import in imports {
        graph.add_detailed_import(import);
    }
}

/// Remove the imports a contract has been told to ignore.
///
/// Expressions that match nothing are handled per `alert_level`: silently skipped, reported
/// as warnings (returned), or failed on, naming the lexicographically first one. An import
/// matched by several expressions is removed once.
pub fn remove_ignored_imports(
    graph: &mut ImportGraph,
    expressions: &BTreeSet<ImportExpression>,
    alert_level: AlertLevel,
) -> Result<Vec<String>, ContractError> {
    // Every expression resolves against the same graph, so overlapping expressions
    // each count as matched.
    let mut matched: BTreeSet<(String, String)> = BTreeSet::new();
    let mut unresolved: Vec<String> = Vec::new();
    for expression in expressions {
        let imports = matching_imports(graph, expression)?;
        if imports.is_empty() {
            unresolved.push(expression.to_string());
        }
        matched.extend(imports.into_iter().map(|i| (i.importer, i.imported)));
    }

    let mut warnings = Vec::new();
    match alert_level {
        AlertLevel::None => {}
        AlertLevel::Warn => {
            for expression in &unresolved {
                let warning = format!(
                    "Ignored import expression {expression} didn't match anything in the graph."
                );
                tracing::warn!("{}", warning);
                warnings.push(warning);
            }
        }
        AlertLevel::Error => {
            unresolved.sort();
            if let Some(first) = unresolved.first() {
                return Err(ContractError::MissingImport(format!(
                    "Ignored import expression {first} didn't match anything in the graph."
                )));
            }
        }
    }

    for (importer, imported) in &matched {
        graph.remove_import(importer, imported);
    }
    tracing::debug!(count = matched.len(), "removed ignored imports");
    Ok(warnings)
}
