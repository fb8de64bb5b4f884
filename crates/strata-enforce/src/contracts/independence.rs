//! Independence contracts: none of the listed modules may import another.

use std::collections::BTreeSet;
use std::time::Instant;

use strata_core::config::{ContractOptions, SessionOptions};
use strata_core::expression::{ImportExpression, ModuleExpression};
use strata_core::graph::ImportGraph;

use super::{existing_modules, render_chain_violations, without_packages};
use crate::alerting::{remove_ignored_imports, AlertLevel};
use crate::chains::find_illegal_chains;
use crate::contract::{format_duration, pluralize, progress, Contract, OptionReader};
use crate::fields::{EnumField, ImportExpressionField, ListField, ModuleExpressionField, SetField};
use crate::types::{ChainViolation, CheckMetadata, ContractCheck, ContractError};

pub const TYPE_NAME: &str = "independence";

#[derive(Debug)]
pub struct IndependenceContract {
    name: String,
    modules: Vec<ModuleExpression>,
    ignore_imports: BTreeSet<ImportExpression>,
    unmatched_alerting: AlertLevel,
}

pub fn build(
    options: &ContractOptions,
    _session: &SessionOptions,
) -> Result<Box<dyn Contract>, ContractError> {
    let mut reader = OptionReader::new(options);
    let modules = reader.required("modules", ListField(ModuleExpressionField));
    let ignore_imports = reader.optional("ignore_imports", SetField(ImportExpressionField));
    let unmatched_alerting = reader.with_default(
        "unmatched_ignore_imports_alerting",
        EnumField {
            choices: AlertLevel::CHOICES,
        },
        AlertLevel::Error,
    );
    reader.finish()?;

    Ok(Box::new(IndependenceContract {
        name: options.name.clone(),
        modules: modules.unwrap_or_default(),
        ignore_imports: ignore_imports.unwrap_or_default(),
        unmatched_alerting,
    }))
}

impl Contract for IndependenceContract {
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
        let modules = existing_modules(graph, &self.modules)?;

        let mut invalid_chains = Vec::new();
        for downstream in &modules {
            for upstream in &modules {
                if downstream == upstream {
                    continue;
                }
                progress(
                    verbose,
                    &format!("Searching for import chains from {downstream} to {upstream}..."),
                );
                let started = Instant::now();
                let pruned = without_packages(
                    graph,
                    &modules,
                    &[downstream.as_str(), upstream.as_str()],
                );
                let chains = find_illegal_chains(&pruned, downstream, upstream, true, true)?;
                progress(
                    verbose,
                    &format!(
                        "Found {} in {}.",
                        pluralize(chains.len(), "illegal chain", "illegal chains"),
                        format_duration(started.elapsed())
                    ),
                );
                if !chains.is_empty() {
                    invalid_chains.push(ChainViolation {
                        downstream: downstream.clone(),
                        upstream: upstream.clone(),
                        chains,
                    });
                }
            }
        }

        Ok(ContractCheck {
            kept: invalid_chains.is_empty(),
            warnings,
            metadata: CheckMetadata::Independence { invalid_chains },
        })
    }

    fn render_broken_contract(&self, check: &ContractCheck) -> Vec<String> {
        match &check.metadata {
            CheckMetadata::Independence { invalid_chains } => {
                render_chain_violations(invalid_chains)
            }
            _ => Vec::new(),
        }
    }
}
