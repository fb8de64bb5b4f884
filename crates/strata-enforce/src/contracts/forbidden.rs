//! Forbidden contracts: source modules may not import forbidden modules.

use std::collections::BTreeSet;
use std::time::Instant;

use strata_core::config::{ContractOptions, SessionOptions};
use strata_core::expression::{resolve_module_expressions, ImportExpression, ModuleExpression};
use strata_core::graph::ImportGraph;
use strata_core::types::is_in_package;

use super::{existing_modules, render_chain_violations};
use crate::alerting::{remove_ignored_imports, AlertLevel};
use crate::chains::find_illegal_chains;
use crate::contract::{format_duration, pluralize, progress, Contract, OptionReader};
use crate::fields::{
    BooleanField, EnumField, ImportExpressionField, ListField, ModuleExpressionField, SetField,
};
use crate::types::{ChainViolation, CheckMetadata, ContractCheck, ContractError};

pub const TYPE_NAME: &str = "forbidden";

#[derive(Debug)]
pub struct ForbiddenContract {
    name: String,
    root_packages: Vec<String>,
    include_external_packages: bool,
    source_modules: Vec<ModuleExpression>,
    forbidden_modules: Vec<ModuleExpression>,
    ignore_imports: BTreeSet<ImportExpression>,
    unmatched_alerting: AlertLevel,
    /// When set, only direct imports break the contract.
    allow_indirect_imports: bool,
    as_packages: bool,
}

pub fn build(
    options: &ContractOptions,
    session: &SessionOptions,
) -> Result<Box<dyn Contract>, ContractError> {
    let mut reader = OptionReader::new(options);
    let source_modules = reader.required("source_modules", ListField(ModuleExpressionField));
    let forbidden_modules = reader.required("forbidden_modules", ListField(ModuleExpressionField));
    let ignore_imports = reader.optional("ignore_imports", SetField(ImportExpressionField));
    let allow_indirect_imports = reader.with_default("allow_indirect_imports", BooleanField, false);
    let unmatched_alerting = reader.with_default(
        "unmatched_ignore_imports_alerting",
        EnumField {
            choices: AlertLevel::CHOICES,
        },
        AlertLevel::Error,
    );
    let as_packages = reader.with_default("as_packages", BooleanField, true);
    reader.finish()?;

    Ok(Box::new(ForbiddenContract {
        name: options.name.clone(),
        root_packages: session.root_packages.clone(),
        include_external_packages: session.include_external_packages(),
        source_modules: source_modules.unwrap_or_default(),
        forbidden_modules: forbidden_modules.unwrap_or_default(),
        ignore_imports: ignore_imports.unwrap_or_default(),
        unmatched_alerting,
        allow_indirect_imports,
        as_packages,
    }))
}

impl ForbiddenContract {
    /// Forbidden modules outside the root packages must be whole external packages, and the
    /// graph must have been built with external packages in it.
    fn check_external_forbidden_modules(&self) -> Result<(), ContractError> {
        let external: Vec<&ModuleExpression> = self
            .forbidden_modules
            .iter()
            .filter(|expression| {
                !self
                    .root_packages
                    .iter()
                    .any(|root| is_in_package(expression.as_str(), root))
            })
            .collect();
        if external.is_empty() {
            return Ok(());
        }
        if !self.include_external_packages {
            return Err(ContractError::Precondition(
                "The top level configuration must have include_external_packages=True when \
                 there are external forbidden modules."
                    .to_string(),
            ));
        }
        if let Some(subpackage) = external.iter().find(|e| e.as_str().contains('.')) {
            return Err(ContractError::Precondition(format!(
                "Invalid forbidden module {subpackage}: subpackages of external packages are not valid."
            )));
        }
        Ok(())
    }
}

impl Contract for ForbiddenContract {
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

        let mut sources = existing_modules(graph, &self.source_modules)?;
        sources.sort();
        self.check_external_forbidden_modules()?;

        let forbidden: BTreeSet<String> =
            resolve_module_expressions(graph, &self.forbidden_modules, false, false)?
                .into_iter()
                .map(|resolved| resolved.name)
                .collect();

        let mut invalid_chains = Vec::new();
        for source in &sources {
            for forbidden_module in &forbidden {
                progress(
                    verbose,
                    &format!("Searching for import chains from {source} to {forbidden_module}..."),
                );
                let started = Instant::now();
                let chains = find_illegal_chains(
                    graph,
                    source,
                    forbidden_module,
                    self.as_packages,
                    !self.allow_indirect_imports,
                )?;
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
                        downstream: source.clone(),
                        upstream: forbidden_module.clone(),
                        chains,
                    });
                }
            }
        }
        invalid_chains
            .sort_by(|a, b| (&a.upstream, &a.downstream).cmp(&(&b.upstream, &b.downstream)));

        Ok(ContractCheck {
            kept: invalid_chains.is_empty(),
            warnings,
            metadata: CheckMetadata::Forbidden { invalid_chains },
        })
    }

    fn render_broken_contract(&self, check: &ContractCheck) -> Vec<String> {
        match &check.metadata {
            CheckMetadata::Forbidden { invalid_chains } => render_chain_violations(invalid_chains),
            _ => Vec::new(),
        }
    }
}
