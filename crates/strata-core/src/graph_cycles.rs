//! Cycle search: shortest cycles, elementary cycles, and cycle breakers.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use petgraph::stable_graph::NodeIndex;

use crate::graph::ImportGraph;
use crate::types::is_descendant;

/// An import that, if removed, helps break a cycle: `(importer, imported)`.
pub type CycleBreaker = (String, String);

impl ImportGraph {
    /// Shortest cycle that leaves `module` and comes back to it.
    ///
    /// With `as_package`, the cycle may start and end at any module in the package but must
    /// pass through at least one module outside it. The returned chain begins and ends with
    /// package members.
    pub fn find_shortest_cycle(&self, module: &str, as_package: bool) -> Option<Vec<String>> {
        let idx = self.node(module)?;
        let mut members: HashSet<NodeIndex> = [idx].into_iter().collect();
        if as_package {
            members.extend(
                self.find_descendants(module)
                    .iter()
                    .filter_map(|name| self.node(name)),
            );
        }
        let mut sources: Vec<NodeIndex> = members.iter().copied().collect();
        sources.sort_by(|a, b| self.name(*a).cmp(self.name(*b)));

        let path = self.bfs_path(&sources, &members, |from, to| {
            !(members.contains(&from) && members.contains(&to))
        })?;
        Some(self.names(&path))
    }

    /// Every elementary cycle in the graph, each listed once without repeating its first
    /// module. Cycles are sorted.
    pub fn find_simple_cycles(&self) -> Vec<Vec<String>> {
        let names: Vec<&str> = self.modules().collect();
        let position: HashMap<&str, usize> =
            names.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); names.len()];
        for (importer, imported) in self.imports() {
            adjacency[position[importer.as_str()]].push(position[imported.as_str()]);
        }
        for successors in &mut adjacency {
            successors.sort_unstable();
        }

        let mut cycles: Vec<Vec<String>> = elementary_cycles(&adjacency)
            .into_iter()
            .map(|cycle| cycle.into_iter().map(|i| names[i].to_string()).collect())
            .collect();
        cycles.sort();
        cycles
    }

    /// Choose imports whose removal makes the children of `package` acyclic.
    ///
    /// Children are compared as squashed units, weighted by how many module-level imports
    /// run between them. The lighter direction of a mutual dependency is preferred. The
    /// result lists the underlying module imports, not the child-level edges.
    pub fn nominate_cycle_breakers(&self, package: &str) -> BTreeSet<CycleBreaker> {
        let children: Vec<String> = self.find_children(package).into_iter().collect();
        if children.len() < 2 {
            return BTreeSet::new();
        }
        let child_of = |module: &str| -> Option<usize> {
            if !is_descendant(module, package) {
                return None;
            }
            let tail = &module[package.len() + 1..];
            let head = tail.split('.').next().unwrap_or(tail);
            children
                .binary_search(&format!("{package}.{head}"))
                .ok()
        };

        let mut underlying: BTreeMap<(usize, usize), Vec<CycleBreaker>> = BTreeMap::new();
        for (importer, imported) in self.imports() {
            if let (Some(a), Some(b)) = (child_of(&importer), child_of(&imported)) {
                if a != b {
                    underlying.entry((a, b)).or_default().push((importer, imported));
                }
            }
        }
        let weights: BTreeMap<(usize, usize), usize> =
            underlying.iter().map(|(k, v)| (*k, v.len())).collect();

        let order = weighted_ordering(children.len(), &weights);
        let mut rank = vec![0usize; children.len()];
        for (position, child) in order.iter().enumerate() {
            rank[*child] = position;
        }

        let mut kept: BTreeSet<(usize, usize)> = BTreeSet::new();
        let mut backward: Vec<((usize, usize), usize)> = Vec::new();
        for (&(a, b), &weight) in &weights {
            if rank[a] < rank[b] {
                kept.insert((a, b));
            } else {
                backward.push(((a, b), weight));
            }
        }

        // Restore any backward edge that does not close a cycle, heaviest first.
        backward.sort_by(|x, y| y.1.cmp(&x.1).then(x.0.cmp(&y.0)));
        let mut breakers = BTreeSet::new();
        for ((a, b), _) in backward {
            if reachable(&kept, b, a) {
                for import in &underlying[&(a, b)] {
                    breakers.insert(import.clone());
                }
            } else {
                kept.insert((a, b));
            }
        }
        breakers
    }
}

/// Greedy feedback-arc-set ordering (Eades, Lin and Smyth) over weighted edges.
///
/// Sinks go to the back, sources to the front, otherwise the node with the largest
/// outgoing-minus-incoming weight is placed next. Ties go to the lowest index.
fn weighted_ordering(n: usize, weights: &BTreeMap<(usize, usize), usize>) -> Vec<usize> {
    let mut remaining: BTreeSet<usize> = (0..n).collect();
    let mut front = Vec::with_capacity(n);
    let mut back = Vec::with_capacity(n);

    let degree = |remaining: &BTreeSet<usize>, v: usize| -> (usize, usize) {
        let mut out_w = 0;
        let mut in_w = 0;
        for (&(a, b), &w) in weights {
            if a == v && remaining.contains(&b) {
                out_w += w;
            }
            if b == v && remaining.contains(&a) {
                in_w += w;
            }
        }
        (out_w, in_w)
    };

    while !remaining.is_empty() {
        loop {
            let sink = remaining.iter().copied().find(|&v| degree(&remaining, v).0 == 0);
            match sink {
                Some(v) => {
                    remaining.remove(&v);
                    back.push(v);
                }
                None => break,
            }
        }
        loop {
            let source = remaining.iter().copied().find(|&v| degree(&remaining, v).1 == 0);
            match source {
                Some(v) => {
                    remaining.remove(&v);
                    front.push(v);
                }
                None => break,
            }
        }
        let best = remaining.iter().copied().max_by(|&x, &y| {
            let (xo, xi) = degree(&remaining, x);
            let (yo, yi) = degree(&remaining, y);
            let dx = xo as i64 - xi as i64;
            let dy = yo as i64 - yi as i64;
            dx.cmp(&dy).then(y.cmp(&x))
        });
        if let Some(v) = best {
            remaining.remove(&v);
            front.push(v);
        }
    }
    back.reverse();
    front.extend(back);
    front
}

fn reachable(edges: &BTreeSet<(usize, usize)>, from: usize, to: usize) -> bool {
    let mut stack = vec![from];
    let mut seen: HashSet<usize> = HashSet::new();
    while let Some(v) = stack.pop() {
        if v == to {
            return true;
        }
        if !seen.insert(v) {
            continue;
        }
        stack.extend(edges.range((v, 0)..=(v, usize::MAX)).map(|&(_, w)| w));
    }
    false
}

/// Johnson's elementary-cycle enumeration over an adjacency list without self-loops.
fn elementary_cycles(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let everything: Vec<usize> = (0..adjacency.len()).collect();
    let mut components: Vec<Vec<usize>> = strongly_connected(adjacency, &everything)
        .into_iter()
        .filter(|c| c.len() > 1)
        .collect();
    let mut cycles = Vec::new();

    while let Some(mut component) = components.pop() {
        component.sort_unstable();
        let start = component.remove(0);
        let mut members: HashSet<usize> = component.iter().copied().collect();
        members.insert(start);
        let successors = |v: usize| -> Vec<usize> {
            adjacency[v]
                .iter()
                .copied()
                .filter(|w| members.contains(w))
                .collect()
        };

        let mut path = vec![start];
        let mut blocked: HashSet<usize> = [start].into_iter().collect();
        let mut closed: HashSet<usize> = HashSet::new();
        let mut blocked_by: HashMap<usize, HashSet<usize>> = HashMap::new();
        let mut stack: Vec<(usize, Vec<usize>)> = vec![(start, successors(start))];

        while let Some(top) = stack.len().checked_sub(1) {
            let current = stack[top].0;
            if let Some(next) = stack[top].1.pop() {
                if next == start {
                    cycles.push(path.clone());
                    closed.extend(path.iter().copied());
                } else if !blocked.contains(&next) {
                    path.push(next);
                    stack.push((next, successors(next)));
                    closed.remove(&next);
                    blocked.insert(next);
                    continue;
                }
            }
            if stack[top].1.is_empty() {
                if closed.contains(&current) {
                    unblock(current, &mut blocked, &mut blocked_by);
                } else {
                    for successor in successors(current) {
                        blocked_by.entry(successor).or_default().insert(current);
                    }
                }
                stack.pop();
                path.pop();
            }
        }

        components.extend(
            strongly_connected(adjacency, &component)
                .into_iter()
                .filter(|c| c.len() > 1),
        );
    }
    cycles
}

fn unblock(
    node: usize,
    blocked: &mut HashSet<usize>,
    blocked_by: &mut HashMap<usize, HashSet<usize>>,
) {
    let mut pending = vec![node];
    while let Some(v) = pending.pop() {
        if blocked.remove(&v) {
            if let Some(waiting) = blocked_by.remove(&v) {
                pending.extend(waiting);
            }
        }
    }
}

/// Strongly connected components of the subgraph induced by `subset`.
fn strongly_connected(adjacency: &[Vec<usize>], subset: &[usize]) -> Vec<Vec<usize>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut position = HashMap::new();
    for &v in subset {
        position.insert(v, graph.add_node(v));
    }
    for &v in subset {
        for w in &adjacency[v] {
            if let Some(&target) = position.get(w) {
                graph.add_edge(position[&v], target, ());
            }
        }
    }
    tarjan_scc(&graph)
        .into_iter()
        .map(|component| component.into_iter().map(|idx| graph[idx]).collect())
        .collect()
}
