//! Shortest import chains and layer dependency search.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::graph::ImportGraph;
use crate::types::{GraphError, PackageDependency};

/// One layer as seen by [`ImportGraph::find_illegal_dependencies_for_layers`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub module_tails: BTreeSet<String>,
    /// Siblings in an independent layer may not import each other.
    pub independent: bool,
}

impl LayerSpec {
    pub fn new<I, S>(tails: I, independent: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            module_tails: tails.into_iter().map(Into::into).collect(),
            independent,
        }
    }
}

impl ImportGraph {
    /// Shortest chain of imports from `importer` to `imported`, if any.
    ///
    /// Neighbours are visited in name order, so equal-length alternatives resolve the same
    /// way on every run.
    pub fn find_shortest_chain(&self, importer: &str, imported: &str) -> Option<Vec<String>> {
        let from = self.node(importer)?;
        let to = self.node(imported)?;
        if from == to {
            return None;
        }
        let targets: HashSet<NodeIndex> = [to].into_iter().collect();
        let path = self.bfs_path(&[from], &targets, |_, _| true)?;
        Some(self.names(&path))
    }

    /// Shortest chains between two modules, or between any modules inside them.
    ///
    /// At most one chain is kept per (downstream, upstream) pair. Imports internal to
    /// either package are not followed, and chains that contain another result chain are
    /// dropped.
    pub fn find_shortest_chains(
        &self,
        importer: &str,
        imported: &str,
        as_packages: bool,
    ) -> Result<BTreeSet<Vec<String>>, GraphError> {
        let importers = self.package_members(importer, as_packages)?;
        let importeds = self.package_members(imported, as_packages)?;
        if importers.iter().any(|m| importeds.contains(m)) {
            return Err(GraphError::SharedDescendants {
                importer: importer.to_string(),
                imported: imported.to_string(),
            });
        }

        let leaves_package = |from: NodeIndex, to: NodeIndex| {
            !((importers.contains(&from) && importers.contains(&to))
                || (importeds.contains(&from) && importeds.contains(&to)))
        };

        let mut downstreams: Vec<NodeIndex> = importers.iter().copied().collect();
        downstreams.sort_by(|a, b| self.name(*a).cmp(self.name(*b)));
        let mut upstreams: Vec<NodeIndex> = importeds.iter().copied().collect();
        upstreams.sort_by(|a, b| self.name(*a).cmp(self.name(*b)));

        let mut chains: Vec<Vec<NodeIndex>> = Vec::new();
        for &upstream in &upstreams {
            let targets: HashSet<NodeIndex> = [upstream].into_iter().collect();
            for &downstream in &downstreams {
                if let Some(path) = self.bfs_path(&[downstream], &targets, leaves_package) {
                    chains.push(path);
                }
            }
        }

        let kept: BTreeSet<Vec<String>> = chains
            .iter()
            .filter(|chain| {
                !chains
                    .iter()
                    .any(|other| other.len() < chain.len() && contains_run(chain, other))
            })
            .map(|chain| self.names(chain))
            .collect();
        Ok(kept)
    }

    /// Package-level dependencies that break the given layering.
    ///
    /// Lower layers may not import higher ones, and siblings within an independent layer
    /// may not import each other. Each pair is searched with every other layer module
    /// removed, so a path through a third layer does not count against the pair. Without
    /// containers the layer tails are taken as absolute module names.
    pub fn find_illegal_dependencies_for_layers(
        &self,
        layers: &[LayerSpec],
        containers: &BTreeSet<String>,
    ) -> Result<BTreeSet<PackageDependency>, GraphError> {
        let prefixes: Vec<Option<&str>> = if containers.is_empty() {
            vec![None]
        } else {
            containers.iter().map(|c| Some(c.as_str())).collect()
        };

        let mut dependencies = BTreeSet::new();
        for prefix in prefixes {
            let qualify = |tail: &str| match prefix {
                Some(container) => format!("{container}.{tail}"),
                None => tail.to_string(),
            };
            let all_modules: Vec<String> = layers
                .iter()
                .flat_map(|layer| layer.module_tails.iter().map(|t| qualify(t)))
                .collect();

            let mut pairs: Vec<(String, String)> = Vec::new();
            for (index, higher_layer) in layers.iter().enumerate() {
                for lower_layer in &layers[index + 1..] {
                    for higher in &higher_layer.module_tails {
                        for lower in &lower_layer.module_tails {
                            pairs.push((qualify(lower), qualify(higher)));
                        }
                    }
                }
                if higher_layer.independent {
                    for a in &higher_layer.module_tails {
                        for b in &higher_layer.module_tails {
                            if a != b {
                                pairs.push((qualify(a), qualify(b)));
                            }
                        }
                    }
                }
            }

            for (lower, higher) in pairs {
                if !self.contains(&lower) || !self.contains(&higher) {
                    continue;
                }
                let mut pruned = self.clone();
                for module in &all_modules {
                    if module != &lower && module != &higher {
                        pruned.remove_package(module);
                    }
                }
                if !pruned.find_shortest_chains(&lower, &higher, true)?.is_empty() {
                    dependencies.insert(PackageDependency {
                        importer: lower,
                        imported: higher,
                    });
                }
            }
        }
        Ok(dependencies)
    }

    /// Breadth-first search from any source to any target.
    ///
    /// `follow` decides whether an edge may be traversed. Reaching a target ends the search
    /// even when that target is also a source, which is how cycles are found.
    pub(crate) fn bfs_path<F>(
        &self,
        sources: &[NodeIndex],
        targets: &HashSet<NodeIndex>,
        follow: F,
    ) -> Option<Vec<NodeIndex>>
    where
        F: Fn(NodeIndex, NodeIndex) -> bool,
    {
        let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut seen: HashSet<NodeIndex> = sources.iter().copied().collect();
        let mut queue: VecDeque<NodeIndex> = sources.iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            for next in self.sorted_successors(current) {
                if !follow(current, next) {
                    continue;
                }
                if targets.contains(&next) {
                    let mut path = vec![next, current];
                    let mut cursor = current;
                    while let Some(&prev) = previous.get(&cursor) {
                        path.push(prev);
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                if seen.insert(next) {
                    previous.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    pub(crate) fn names(&self, path: &[NodeIndex]) -> Vec<String> {
        path.iter().map(|idx| self.name(*idx).to_string()).collect()
    }

    fn package_members(
        &self,
        module: &str,
        as_package: bool,
    ) -> Result<HashSet<NodeIndex>, GraphError> {
        let mut members: HashSet<NodeIndex> = self.node(module).into_iter().collect();
        if as_package {
            members.extend(
                self.find_descendants(module)
                    .iter()
                    .filter_map(|name| self.node(name)),
            );
        }
        if members.is_empty() {
            return Err(GraphError::ModuleNotFound(module.to_string()));
        }
        Ok(members)
    }
}

/// Whether `needle` appears as a contiguous run inside `haystack`.
fn contains_run(haystack: &[NodeIndex], needle: &[NodeIndex]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}
