//! The in-memory import graph.
//!
//! [`ImportGraph`] is a directed graph of dotted module names. Every edge carries the
//! line-level details of the imports it represents. The graph is cheap to clone, so each
//! contract gets its own copy and may squash or prune it freely.
//!
//! Path and cycle algorithms live in `graph_chains` and `graph_cycles`.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;

use crate::types::{is_descendant, is_in_package, DirectImport, GraphError};

/// Source location of one import statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ImportSite {
    pub line_number: u32,
    pub line_contents: Option<String>,
}

/// Mutable directed graph of modules and the imports between them.
#[derive(Debug, Clone, Default)]
pub struct ImportGraph {
    pub(crate) graph: StableDiGraph<String, Vec<ImportSite>>,
    pub(crate) nodes: BTreeMap<String, NodeIndex>,
    pub(crate) squashed: HashSet<String>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// All module names, in lexicographic order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn module_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, module: &str) -> bool {
        self.nodes.contains_key(module)
    }

    pub fn is_module_squashed(&self, module: &str) -> bool {
        self.squashed.contains(module)
    }

    /// Add a module if it is not already present.
    pub fn add_module(&mut self, module: &str) {
        self.ensure_node(module);
    }

    /// Add a module that stands in for its whole (unseen) subtree.
    pub fn add_squashed_module(&mut self, module: &str) {
        self.ensure_node(module);
        self.squashed.insert(module.to_string());
    }

    /// Remove a module and every import into or out of it. Absent modules are ignored.
    pub fn remove_module(&mut self, module: &str) {
        if let Some(idx) = self.nodes.remove(module) {
            self.graph.remove_node(idx);
            self.squashed.remove(module);
        }
    }

    /// Remove a module together with all of its descendants.
    pub fn remove_package(&mut self, module: &str) {
        for descendant in self.find_descendants(module) {
            self.remove_module(&descendant);
        }
        self.remove_module(module);
    }

    /// Add an import without line details, creating either module as needed.
    pub fn add_import(&mut self, importer: &str, imported: &str) {
        self.ensure_edge(importer, imported);
    }

    /// Add an import, recording its line details when present.
    pub fn add_detailed_import(&mut self, import: &DirectImport) {
        let Some(edge) = self.ensure_edge(&import.importer, &import.imported) else {
            return;
        };
        if let Some(line_number) = import.line_number {
            let site = ImportSite {
                line_number,
                line_contents: import.line_contents.clone(),
            };
            if let Some(sites) = self.graph.edge_weight_mut(edge) {
                if !sites.contains(&site) {
                    sites.push(site);
                    sites.sort();
                }
            }
        }
    }

    /// Remove the import between two modules, with all its details. Missing imports are ignored.
    pub fn remove_import(&mut self, importer: &str, imported: &str) {
        if let (Some(&from), Some(&to)) = (self.nodes.get(importer), self.nodes.get(imported)) {
            if let Some(edge) = self.graph.find_edge(from, to) {
                self.graph.remove_edge(edge);
            }
        }
    }

    /// Number of (importer, imported) module pairs with at least one import.
    pub fn count_imports(&self) -> usize {
        self.graph.edge_count()
    }

    /// Every recorded import statement between two modules, ordered by line.
    ///
    /// Imports added without line details contribute no entries.
    pub fn get_import_details(&self, importer: &str, imported: &str) -> Vec<DirectImport> {
        let Some(edge) = self.edge_between(importer, imported) else {
            return Vec::new();
        };
        self.graph[edge]
            .iter()
            .map(|site| DirectImport {
                importer: importer.to_string(),
                imported: imported.to_string(),
                line_number: Some(site.line_number),
                line_contents: site.line_contents.clone(),
            })
            .collect()
    }

    /// All imports in the graph as `(importer, imported)` pairs, sorted.
    pub fn imports(&self) -> Vec<(String, String)> {
        let mut imports: Vec<(String, String)> = self
            .graph
            .edge_references()
            .map(|e| (self.graph[e.source()].clone(), self.graph[e.target()].clone()))
            .collect();
        imports.sort();
        imports
    }

    /// Whether `importer` directly imports `imported`.
    ///
    /// With `as_packages`, any import from within one package to within the other counts.
    pub fn direct_import_exists(&self, importer: &str, imported: &str, as_packages: bool) -> bool {
        if !as_packages {
            return self.edge_between(importer, imported).is_some();
        }
        self.graph.edge_references().any(|e| {
            is_in_package(&self.graph[e.source()], importer)
                && is_in_package(&self.graph[e.target()], imported)
        })
    }

    /// Immediate children of a module that are present in the graph.
    pub fn find_children(&self, module: &str) -> BTreeSet<String> {
        self.descendant_range(module)
            .filter(|name| !name[module.len() + 1..].contains('.'))
            .map(str::to_string)
            .collect()
    }

    /// Every module in the graph beneath `module`.
    pub fn find_descendants(&self, module: &str) -> BTreeSet<String> {
        self.descendant_range(module).map(str::to_string).collect()
    }

    pub fn find_modules_directly_imported_by(&self, module: &str) -> BTreeSet<String> {
        self.neighbours(module, Direction::Outgoing)
    }

    pub fn find_modules_that_directly_import(&self, module: &str) -> BTreeSet<String> {
        self.neighbours(module, Direction::Incoming)
    }

    /// Collapse a module's subtree into the module itself.
    ///
    /// Imports to and from descendants are redirected to the module; their line details
    /// are dropped. Squashing an already squashed module does nothing.
    pub fn squash_module(&mut self, module: &str) -> Result<(), GraphError> {
        let Some(&target) = self.nodes.get(module) else {
            return Err(GraphError::ModuleNotFound(module.to_string()));
        };
        if self.squashed.contains(module) {
            return Ok(());
        }
        let descendants = self.find_descendants(module);
        let mut redirected: BTreeSet<(NodeIndex, NodeIndex)> = BTreeSet::new();
        for descendant in &descendants {
            let idx = self.nodes[descendant];
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                if !is_in_package(&self.graph[edge.target()], module) {
                    redirected.insert((target, edge.target()));
                }
            }
            for edge in self.graph.edges_directed(idx, Direction::Incoming) {
                if !is_in_package(&self.graph[edge.source()], module) {
                    redirected.insert((edge.source(), target));
                }
            }
        }
        for descendant in &descendants {
            self.remove_module(descendant);
        }
        for (from, to) in redirected {
            if self.graph.find_edge(from, to).is_none() {
                self.graph.add_edge(from, to, Vec::new());
            }
        }
        self.squashed.insert(module.to_string());
        Ok(())
    }

    pub(crate) fn node(&self, module: &str) -> Option<NodeIndex> {
        self.nodes.get(module).copied()
    }

    pub(crate) fn name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    /// Outgoing neighbours of a node, ordered by module name.
    pub(crate) fn sorted_successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut successors: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        successors.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        successors.dedup();
        successors
    }

    fn neighbours(&self, module: &str, direction: Direction) -> BTreeSet<String> {
        let Some(idx) = self.node(module) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect()
    }

    fn descendant_range<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let lower = format!("{module}.");
        let upper = format!("{module}/");
        self.nodes
            .range(lower..upper)
            .map(|(name, _)| name.as_str())
            .filter(move |name| is_descendant(name, module))
    }

    fn edge_between(
        &self,
        importer: &str,
        imported: &str,
    ) -> Option<petgraph::stable_graph::EdgeIndex> {
        let from = self.node(importer)?;
        let to = self.node(imported)?;
        self.graph.find_edge(from, to)
    }

    fn ensure_node(&mut self, module: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(module) {
            return idx;
        }
        let idx = self.graph.add_node(module.to_string());
        self.nodes.insert(module.to_string(), idx);
        idx
    }

    fn ensure_edge(
        &mut self,
        importer: &str,
        imported: &str,
    ) -> Option<petgraph::stable_graph::EdgeIndex> {
        let from = self.ensure_node(importer);
        let to = self.ensure_node(imported);
        if from == to {
            return None;
        }
        Some(match self.graph.find_edge(from, to) {
            Some(edge) => edge,
            None => self.graph.add_edge(from, to, Vec::new()),
        })
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
