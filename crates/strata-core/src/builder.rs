use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::graph::ImportGraph;
use crate::types::{is_in_package, DirectImport, GraphError, Module};

/// Source of import graphs.
///
/// Parsing source code is out of scope for strata; a builder turns some external
/// representation into an [`ImportGraph`] restricted to the configured root packages.
pub trait GraphBuilder {
    /// Build a graph containing every module inside `root_packages`.
    ///
    /// With `include_external_packages`, imports of modules outside the root packages are
    /// kept, each external module collapsed into a squashed node named after its top-level
    /// package. Otherwise such imports are dropped.
    fn build(
        &self,
        root_packages: &[String],
        include_external_packages: bool,
    ) -> Result<ImportGraph, GraphError>;
}

/// Serialized form of a graph, as read from `.strata/graph.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub squashed_modules: Vec<String>,
    #[serde(default)]
    pub imports: Vec<DirectImport>,
}

impl GraphSnapshot {
    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GraphError::Io(format!("{}: {}", path.display(), e)))?;
        let snapshot = serde_json::from_str(&content)?;
        Ok(snapshot)
    }

    /// Capture every module and import of a graph, including line details.
    pub fn from_graph(graph: &ImportGraph) -> Self {
        let mut snapshot = GraphSnapshot::default();
        for module in graph.modules() {
            if graph.is_module_squashed(module) {
                snapshot.squashed_modules.push(module.to_string());
            } else {
                snapshot.modules.push(module.to_string());
            }
        }
        for (importer, imported) in graph.imports() {
            let details = graph.get_import_details(&importer, &imported);
            if details.is_empty() {
                snapshot.imports.push(DirectImport::new(importer, imported));
            } else {
                snapshot.imports.extend(details);
            }
        }
        snapshot
    }

    /// Materialize the snapshot, keeping only what belongs to the root packages.
    pub fn to_graph(&self, root_packages: &[String], include_external_packages: bool) -> ImportGraph {
        let internal = |module: &str| {
            root_packages.is_empty() || root_packages.iter().any(|root| is_in_package(module, root))
        };
        let external_node = |module: &str| Module::new(module).root_package_name().to_string();

        let mut graph = ImportGraph::new();
        for module in self.modules.iter().filter(|m| internal(m)) {
            graph.add_module(module);
        }
        for module in &self.squashed_modules {
            if internal(module) {
                graph.add_squashed_module(module);
            } else if include_external_packages {
                graph.add_squashed_module(&external_node(module));
            }
        }
        for import in &self.imports {
            if !internal(&import.importer) {
                continue;
            }
            if internal(&import.imported) {
                graph.add_detailed_import(import);
            } else if include_external_packages {
                let target = external_node(&import.imported);
                graph.add_squashed_module(&target);
                graph.add_detailed_import(&DirectImport {
                    imported: target,
                    ..import.clone()
                });
            }
        }
        graph
    }
}

/// Builds graphs from a JSON snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    path: PathBuf,
}

impl SnapshotBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GraphBuilder for SnapshotBuilder {
    fn build(
        &self,
        root_packages: &[String],
        include_external_packages: bool,
    ) -> Result<ImportGraph, GraphError> {
        let snapshot = GraphSnapshot::load(&self.path)?;
        tracing::debug!(
            path = %self.path.display(),
            modules = snapshot.modules.len(),
            imports = snapshot.imports.len(),
            "loaded graph snapshot"
        );
        Ok(snapshot.to_graph(root_packages, include_external_packages))
    }
}
