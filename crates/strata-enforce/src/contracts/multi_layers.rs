//! Multi-layers contracts: ranked layers where every module in a rank is independent of its
//! siblings and may import any module of a lower rank, but never one of a higher rank.

use std::time::Instant;

use strata_core::config::{ContractOptions, RawValue, SessionOptions};
use strata_core::graph::ImportGraph;

use super::{render_chain_violations, without_packages};
use crate::chains::find_illegal_chains;
use crate::contract::{format_duration, pluralize, progress, Contract, OptionReader};
use crate::fields::{Field, ListField, StringField};
use crate::types::{ChainViolation, CheckMetadata, ContractCheck, ContractError};

pub const TYPE_NAME: &str = "multi_layers";

/// One rank: comma-separated module names, e.g. `pkg.alpha, pkg.beta`.
pub struct RankField;

impl Field for RankField {
    type Value = Vec<String>;

    fn parse(&self, raw: &RawValue) -> Result<Vec<String>, String> {
        let value = StringField.parse(raw)?;
        let names: Vec<String> = value.split(',').map(|name| name.trim().to_string()).collect();
        if names.iter().any(String::is_empty) {
            return Err(format!("Empty module name in layer '{value}'."));
        }
        Ok(names)
    }
}

#[derive(Debug)]
pub struct MultiLayersContract {
    name: String,
    ranks: Vec<Vec<String>>,
}

pub fn build(
    options: &ContractOptions,
    _session: &SessionOptions,
) -> Result<Box<dyn Contract>, ContractError> {
    let mut reader = OptionReader::new(options);
    let ranks = reader.required("layers", ListField(RankField));
    reader.finish()?;

    Ok(Box::new(MultiLayersContract {
        name: options.name.clone(),
        ranks: ranks.unwrap_or_default(),
    }))
}

impl MultiLayersContract {
    /// `(higher, lower)` pairs: siblings in both directions, then each lower rank.
    fn module_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        for (index, rank) in self.ranks.iter().enumerate() {
            for module in rank {
                for sibling in rank {
                    if sibling != module {
                        pairs.push((module.as_str(), sibling.as_str()));
                    }
                }
                for lower in self.ranks[index + 1..].iter().flatten() {
                    pairs.push((module.as_str(), lower.as_str()));
                }
            }
        }
        pairs
    }

    fn all_modules(&self) -> Vec<String> {
        self.ranks.iter().flatten().cloned().collect()
    }
}

impl Contract for MultiLayersContract {
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
        for module in self.ranks.iter().flatten() {
            if !graph.contains(module) {
                return Err(ContractError::Precondition(format!(
                    "Missing layer '{module}': module '{module}' does not exist."
                )));
            }
        }

        let all_modules = self.all_modules();
        let mut violations = Vec::new();
        for (higher, lower) in self.module_pairs() {
            progress(
                verbose,
                &format!("Searching for import chains from {lower} to {higher}..."),
            );
            let started = Instant::now();
            let others: Vec<String> = all_modules
                .iter()
                .filter(|module| *module != higher && *module != lower)
                .cloned()
                .collect();
            let pruned = without_packages(graph, &others, &[higher, lower]);
            let chains = find_illegal_chains(&pruned, lower, higher, true, true)?;
            progress(
                verbose,
                &format!(
                    "Found {} in {}.",
                    pluralize(chains.len(), "illegal chain", "illegal chains"),
                    format_duration(started.elapsed())
                ),
            );
            if !chains.is_empty() {
                violations.push(ChainViolation {
                    downstream: lower.to_string(),
                    upstream: higher.to_string(),
                    chains,
                });
            }
        }

        Ok(ContractCheck {
            kept: violations.is_empty(),
            warnings: Vec::new(),
            metadata: CheckMetadata::MultiLayers { violations },
        })
    }

    fn render_broken_contract(&self, check: &ContractCheck) -> Vec<String> {
        match &check.metadata {
            CheckMetadata::MultiLayers { violations } => render_chain_violations(violations),
            _ => Vec::new(),
        }
    }
}
