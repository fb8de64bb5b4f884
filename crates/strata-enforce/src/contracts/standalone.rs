//! Standalone contracts: a module's subtree neither imports nor is imported by anything
//! outside it.

use std::collections::{BTreeMap, BTreeSet};

use strata_core::config::{ContractOptions, SessionOptions};
use strata_core::expression::ImportExpression;
use strata_core::graph::ImportGraph;
use strata_core::types::{Module, PackageDependency};

use super::check_modules_exist;
use crate::alerting::{remove_ignored_imports, AlertLevel};
use crate::contract::{Contract, OptionReader};
use crate::fields::{ImportExpressionField, ListField, ModuleField, SetField};
use crate::types::{CheckMetadata, ContractCheck, ContractError};

pub const TYPE_NAME: &str = "standalone";

#[derive(Debug)]
pub struct StandaloneContract {
    name: String,
    modules: Vec<Module>,
    ignore_imports: BTreeSet<ImportExpression>,
}

pub fn build(
    options: &ContractOptions,
    _session: &SessionOptions,
) -> Result<Box<dyn Contract>, ContractError> {
    let mut reader = OptionReader::new(options);
    let modules = reader.required("modules", ListField(ModuleField));
    let ignore_imports = reader.optional("ignore_imports", SetField(ImportExpressionField));
    reader.finish()?;

    Ok(Box::new(StandaloneContract {
        name: options.name.clone(),
        modules: modules.unwrap_or_default(),
        ignore_imports: ignore_imports.unwrap_or_default(),
    }))
}

/// Imports crossing the boundary of `module`'s subtree, in either direction.
fn boundary_imports(graph: &ImportGraph, module: &str) -> Vec<PackageDependency> {
    let mut subtree = graph.find_descendants(module);
    subtree.insert(module.to_string());

    let mut crossing = BTreeSet::new();
    for member in &subtree {
        for imported in graph.find_modules_directly_imported_by(member) {
            if !subtree.contains(&imported) {
                crossing.insert(PackageDependency {
                    importer: member.clone(),
                    imported,
                });
            }
        }
        for importer in graph.find_modules_that_directly_import(member) {
            if !subtree.contains(&importer) {
                crossing.insert(PackageDependency {
                    importer,
                    imported: member.clone(),
                });
            }
        }
    }
    crossing.into_iter().collect()
}

impl Contract for StandaloneContract {
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
        let warnings = remove_ignored_imports(graph, &self.ignore_imports, AlertLevel::None)?;
        check_modules_exist(graph, self.modules.iter().map(Module::name))?;

        let mut violations = BTreeMap::new();
        for module in &self.modules {
            let crossing = boundary_imports(graph, module.name());
            if !crossing.is_empty() {
                violations.insert(module.name().to_string(), crossing);
            }
        }

        Ok(ContractCheck {
            kept: violations.is_empty(),
            warnings,
            metadata: CheckMetadata::Standalone { violations },
        })
    }

    fn render_broken_contract(&self, check: &ContractCheck) -> Vec<String> {
        let CheckMetadata::Standalone { violations } = &check.metadata else {
            return Vec::new();
        };
        let mut lines = Vec::new();
        for (module, dependencies) in violations {
            lines.push(format!("{module} must be standalone:"));
            lines.push(String::new());
            for dependency in dependencies {
                lines.push(format!(
                    "- {} is not allowed to import {}",
                    dependency.importer, dependency.imported
                ));
            }
            lines.push(String::new());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{graph_from, session};

    fn contract(modules: Vec<&str>, ignore_imports: Option<&str>) -> Box<dyn Contract> {
        let mut options = ContractOptions::new("Standalone", TYPE_NAME).with("modules", modules);
        if let Some(ignore_imports) = ignore_imports {
            options = options.with("ignore_imports", ignore_imports);
        }
        build(&options, &session(&["pkg"])).unwrap_or_else(|e| panic!("{e}"))
    }

    fn graph() -> ImportGraph {
        graph_from(
            &["pkg", "pkg.plugin", "pkg.plugin.a", "pkg.plugin.b", "pkg.core", "pkg.main"],
            &[
                ("pkg.plugin.a", "pkg.plugin.b", 1),
                ("pkg.plugin.b", "pkg.core", 2),
                ("pkg.main", "pkg.plugin.a", 3),
            ],
        )
    }

    #[test]
    fn test_internal_imports_are_allowed() {
        let mut graph = graph();
        graph.remove_import("pkg.plugin.b", "pkg.core");
        graph.remove_import("pkg.main", "pkg.plugin.a");
        assert!(contract(vec!["pkg.plugin"], None)
            .check(&mut graph, false)
            .unwrap()
            .kept);
    }

    #[test]
    fn test_imports_in_both_directions_are_reported() {
        let mut graph = graph();
        let standalone = contract(vec!["pkg.plugin"], None);
        let check = standalone.check(&mut graph, false).unwrap();
        assert!(!check.kept);
        assert_eq!(
            standalone.render_broken_contract(&check),
            vec![
                "pkg.plugin must be standalone:",
                "",
                "- pkg.main is not allowed to import pkg.plugin.a",
                "- pkg.plugin.b is not allowed to import pkg.core",
                "",
            ]
        );
    }

    #[test]
    fn test_unmatched_ignores_are_silent() {
        let mut graph = graph();
        let check = contract(
            vec!["pkg.plugin"],
            Some("pkg.main -> pkg.plugin.a\npkg.nothing -> pkg.core"),
        )
        .check(&mut graph, false)
        .unwrap();
        assert!(check.warnings.is_empty());
        let CheckMetadata::Standalone { violations } = &check.metadata else {
            panic!("wrong metadata");
        };
        assert_eq!(violations["pkg.plugin"].len(), 1);
    }

    #[test]
    fn test_missing_module_is_an_error() {
        let mut graph = graph();
        let err = contract(vec!["pkg.absent"], None)
            .check(&mut graph, false)
            .unwrap_err();
        assert_eq!(err.to_string(), "Module 'pkg.absent' does not exist.");
    }
}
