//! Protected contracts: protected modules may only be imported directly by allowed importers
//! and by each other.

use std::collections::BTreeSet;

use strata_core::config::{ContractOptions, SessionOptions};
use strata_core::expression::{resolve_module_expressions, ImportExpression, ModuleExpression};
use strata_core::graph::ImportGraph;

use crate::alerting::{remove_ignored_imports, AlertLevel};
use crate::chains::link_between;
use crate::contract::{Contract, OptionReader};
use crate::fields::{
    BooleanField, EnumField, ImportExpressionField, ListField, ModuleExpressionField, SetField,
};
use crate::types::{CheckMetadata, ContractCheck, ContractError, Link, ProtectedViolation};

pub const TYPE_NAME: &str = "protected";

#[derive(Debug)]
pub struct ProtectedContract {
    name: String,
    protected_modules: Vec<ModuleExpression>,
    allowed_importers: Vec<ModuleExpression>,
    ignore_imports: BTreeSet<ImportExpression>,
    unmatched_alerting: AlertLevel,
    as_packages: bool,
}

pub fn build(
    options: &ContractOptions,
    _session: &SessionOptions,
) -> Result<Box<dyn Contract>, ContractError> {
    let mut reader = OptionReader::new(options);
    let protected_modules = reader.required("protected_modules", ListField(ModuleExpressionField));
    let allowed_importers = reader.required("allowed_importers", ListField(ModuleExpressionField));
    let ignore_imports = reader.optional("ignore_imports", SetField(ImportExpressionField));
    let unmatched_alerting = reader.with_default(
        "unmatched_ignore_imports_alerting",
        EnumField {
            choices: AlertLevel::CHOICES,
        },
        AlertLevel::Error,
    );
    let as_packages = reader.with_default("as_packages", BooleanField, true);
    reader.finish()?;

    Ok(Box::new(ProtectedContract {
        name: options.name.clone(),
        protected_modules: protected_modules.unwrap_or_default(),
        allowed_importers: allowed_importers.unwrap_or_default(),
        ignore_imports: ignore_imports.unwrap_or_default(),
        unmatched_alerting,
        as_packages,
    }))
}

impl ProtectedContract {
    fn violation_for(
        &self,
        graph: &ImportGraph,
        top_level_module: &str,
        expression: &ModuleExpression,
        allowed: &BTreeSet<String>,
    ) -> ProtectedViolation {
        let mut protected: BTreeSet<String> = [top_level_module.to_string()].into_iter().collect();
        if self.as_packages && !graph.is_module_squashed(top_level_module) {
            protected.extend(graph.find_descendants(top_level_module));
        }

        let mut illegal_links = Vec::new();
        for protected_module in &protected {
            for importer in graph.find_modules_that_directly_import(protected_module) {
                if allowed.contains(&importer) || protected.contains(&importer) {
                    continue;
                }
                illegal_links.push(link_between(graph, &importer, protected_module));
            }
        }

        ProtectedViolation {
            top_level_module: top_level_module.to_string(),
            illegal_links,
            original_expression: expression.has_wildcard().then(|| expression.to_string()),
        }
    }
}

impl Contract for ProtectedContract {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn check(
        &self,
        graph: &mut ImportGraph,
        _verbose: bool,
    ) -> Result<ContractCheck, ContractError> {
        let warnings =
            remove_ignored_imports(graph, &self.ignore_imports, self.unmatched_alerting)?;
        let allowed: BTreeSet<String> =
            resolve_module_expressions(graph, &self.allowed_importers, self.as_packages, false)?
                .into_iter()
                .map(|resolved| resolved.name)
                .collect();

        let mut illegal_imports = Vec::new();
        for expression in &self.protected_modules {
            for resolved in resolve_module_expressions(graph, [expression], false, false)? {
                let violation = self.violation_for(graph, &resolved.name, expression, &allowed);
                if !violation.illegal_links.is_empty() {
                    illegal_imports.push(violation);
                }
            }
        }

        Ok(ContractCheck {
            kept: illegal_imports.is_empty(),
            warnings,
            metadata: CheckMetadata::Protected { illegal_imports },
        })
    }

    fn render_broken_contract(&self, check: &ContractCheck) -> Vec<String> {
        let CheckMetadata::Protected { illegal_imports } = &check.metadata else {
            return Vec::new();
        };
        let mut lines = Vec::new();
        for violation in illegal_imports {
            let heading = format!(
                "Illegal imports of protected package {}",
                violation.top_level_module
            );
            match &violation.original_expression {
                Some(expression) => {
                    lines.push(heading);
                    lines.push(format!("(via {expression} expression):"));
                }
                None => lines.push(format!("{heading}:")),
            }
            lines.push(String::new());
            for link in &violation.illegal_links {
                lines.push(format!(
                    "- {} -> {} (l.{})",
                    link.importer,
                    link.imported,
                    joined_line_numbers(link)
                ));
                lines.push(String::new());
            }
        }
        lines.push(String::new());
        lines
    }
}

/// `3, 5`: only the first number carries the `l.` prefix in this contract's output.
fn joined_line_numbers(link: &Link) -> String {
    link.line_numbers
        .iter()
        .map(|n| n.map_or_else(|| "?".to_string(), |n| n.to_string()))
        .collect::<Vec<_>>()
        .join(", ")
}
