//! Report orchestration: build every declared contract, check each against its own copy of
//! the graph, and collect the results in declaration order.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use strata_core::builder::GraphBuilder;
use strata_core::config::{ConfigError, ContractOptions, UserOptions};
use strata_core::graph::ImportGraph;
use strata_core::types::GraphError;

use crate::contract::{format_duration, Contract, ContractRegistry};
use crate::types::{ContractCheck, ContractError, FieldError};

/// Errors that stop a run before a report can be produced.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("{0}")]
    UnknownContracts(String),
}

/// How a run should behave; the defaults check every contract sequentially.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only check contracts with these ids.
    pub limit_to_contracts: Vec<String>,
    pub verbose: bool,
    /// Check contracts on the rayon pool.
    pub parallel: bool,
    pub show_timings: bool,
}

/// The outcome of one contract.
#[derive(Debug, Clone)]
pub struct ContractReport {
    pub id: String,
    pub name: String,
    pub type_name: String,
    pub check: ContractCheck,
    pub duration: Duration,
    /// The contract's own rendering of its violations; empty when kept.
    pub broken_lines: Vec<String>,
}

/// Results of a run, in contract declaration order.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub contracts: Vec<ContractReport>,
    /// Field errors keyed by contract name. Those contracts were not checked; the rest were.
    pub invalid_options: BTreeMap<String, Vec<FieldError>>,
    pub module_count: usize,
    pub import_count: usize,
    pub graph_building_duration: Duration,
    pub show_timings: bool,
}

impl Report {
    pub fn kept_count(&self) -> usize {
        self.contracts.iter().filter(|c| c.check.kept).count()
    }

    pub fn broken_count(&self) -> usize {
        self.contracts.len() - self.kept_count()
    }

    pub fn warnings_count(&self) -> usize {
        self.contracts.iter().map(|c| c.check.warnings.len()).sum()
    }

    pub fn could_not_run(&self) -> bool {
        !self.invalid_options.is_empty()
    }

    pub fn contains_failures(&self) -> bool {
        self.could_not_run() || self.broken_count() > 0
    }

    /// True when every contract was checked and kept.
    pub fn passed(&self) -> bool {
        !self.contains_failures()
    }
}

/// The declared contracts selected by `limit_to_contracts` (all of them when empty).
fn select_contracts<'a>(
    declared: &'a [ContractOptions],
    limit_to_contracts: &[String],
) -> Result<Vec<&'a ContractOptions>, EngineError> {
    if limit_to_contracts.is_empty() {
        return Ok(declared.iter().collect());
    }
    let known: BTreeSet<&str> = declared.iter().map(ContractOptions::id).collect();
    let missing: BTreeSet<&str> = limit_to_contracts
        .iter()
        .map(String::as_str)
        .filter(|id| !known.contains(id))
        .collect();
    match missing.len() {
        0 => Ok(declared
            .iter()
            .filter(|options| limit_to_contracts.iter().any(|id| id == options.id()))
            .collect()),
        1 => Err(EngineError::UnknownContracts(format!(
            "Could not find contract '{}'.\n\nYou asked to limit the check to that contract, \
             but nothing exists with that id.",
            missing.iter().next().copied().unwrap_or_default()
        ))),
        _ => Err(EngineError::UnknownContracts(format!(
            "Could not find the following contract ids: {}.\n\nYou asked to limit the check to \
             those contracts, but there are no contracts with those ids.",
            missing.into_iter().collect::<Vec<_>>().join(", ")
        ))),
    }
}

fn check_contract(
    graph: &ImportGraph,
    options: &ContractOptions,
    contract: &dyn Contract,
    verbose: bool,
) -> Result<ContractReport, ContractError> {
    if verbose {
        tracing::info!("Checking {}...", contract.name());
    }
    let started = Instant::now();
    let mut copy = graph.clone();
    let check = contract.check(&mut copy, verbose)?;
    let duration = started.elapsed();
    tracing::debug!(
        contract = contract.name(),
        kept = check.kept,
        duration = %format_duration(duration),
        "contract checked"
    );

    let broken_lines = if check.kept {
        Vec::new()
    } else {
        contract.render_broken_contract(&check)
    };
    Ok(ContractReport {
        id: options.id().to_string(),
        name: contract.name().to_string(),
        type_name: contract.type_name().to_string(),
        check,
        duration,
        broken_lines,
    })
}

/// Check the configured contracts against `graph`.
///
/// Every selected contract is built first. A contract with invalid options is recorded in
/// [`Report::invalid_options`] and skipped; the others are still checked. Any other fault
/// aborts the run.
pub fn create_report(
    graph: &ImportGraph,
    user_options: &UserOptions,
    registry: &ContractRegistry,
    run: &RunOptions,
) -> Result<Report, EngineError> {
    let mut report = Report {
        module_count: graph.module_count(),
        import_count: graph.count_imports(),
        show_timings: run.show_timings || user_options.session.show_timings(),
        ..Report::default()
    };

    let selected = select_contracts(&user_options.contracts, &run.limit_to_contracts)?;
    let mut contracts: Vec<(&ContractOptions, Box<dyn Contract>)> = Vec::new();
    for options in selected {
        match registry.build(options, &user_options.session) {
            Ok(contract) => contracts.push((options, contract)),
            Err(ContractError::InvalidOptions(errors)) => {
                tracing::debug!(contract = %options.name, count = errors.len(), "invalid options");
                report.invalid_options.insert(options.name.clone(), errors);
            }
            Err(other) => return Err(other.into()),
        }
    }
    let results: Vec<Result<ContractReport, ContractError>> = if run.parallel {
        contracts
            .par_iter()
            .map(|(options, contract)| {
                check_contract(graph, options, contract.as_ref(), run.verbose)
            })
            .collect()
    } else {
        contracts
            .iter()
            .map(|(options, contract)| {
                check_contract(graph, options, contract.as_ref(), run.verbose)
            })
            .collect()
    };
    for result in results {
        report.contracts.push(result?);
    }

    tracing::info!(
        kept = report.kept_count(),
        broken = report.broken_count(),
        warnings = report.warnings_count(),
        "contracts checked"
    );
    Ok(report)
}

/// Build the graph with `builder` and check the configured contracts against it.
///
/// The run succeeded when [`Report::passed`] holds.
pub fn lint(
    builder: &dyn GraphBuilder,
    user_options: &UserOptions,
    registry: &ContractRegistry,
    run: &RunOptions,
) -> Result<Report, EngineError> {
    if run.verbose {
        tracing::info!("Building import graph...");
    }
    let started = Instant::now();
    let graph = builder.build(
        &user_options.session.root_packages,
        user_options.session.include_external_packages(),
    )?;
    let graph_building_duration = started.elapsed();
    if run.verbose {
        tracing::info!("Built graph in {}.", format_duration(graph_building_duration));
    }

    let mut report = create_report(&graph, user_options, registry, run)?;
    report.graph_building_duration = graph_building_duration;
    Ok(report)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
