//! Illegal import chains between two packages, collapsed for readability.
//!
//! Direct imports between the packages are reported first and removed. Both packages are
//! then squashed and the remaining shortest routes ("segments") between them are found one
//! by one. Each segment's first and last hops are re-expanded against the unsquashed graph;
//! alternative first and last hops that share a segment are collapsed into one chain.

use strata_core::graph::ImportGraph;
use strata_core::types::{is_in_package, GraphError};

use crate::types::{ContractError, DetailedChain, Link};

/// Which modules count as part of a package for one search.
#[derive(Debug, Clone, Copy)]
struct Package<'a> {
    name: &'a str,
    as_package: bool,
}

impl Package<'_> {
    fn contains(&self, module: &str) -> bool {
        if self.as_package {
            is_in_package(module, self.name)
        } else {
            module == self.name
        }
    }

    fn members(&self, graph: &ImportGraph) -> Vec<String> {
        let mut members = Vec::new();
        if graph.contains(self.name) {
            members.push(self.name.to_string());
        }
        if self.as_package {
            members.extend(graph.find_descendants(self.name));
        }
        members
    }
}

/// The link between two modules, with its line numbers taken from `graph`.
pub fn link_between(graph: &ImportGraph, importer: &str, imported: &str) -> Link {
    let mut line_numbers: Vec<Option<u32>> = graph
        .get_import_details(importer, imported)
        .into_iter()
        .map(|detail| detail.line_number)
        .collect();
    line_numbers.sort();
    line_numbers.dedup();
    if line_numbers.is_empty() {
        line_numbers.push(None);
    }
    Link::new(importer, imported, line_numbers)
}

/// Every chain by which `downstream` reaches `upstream`, sorted.
///
/// With `include_indirect` false only direct imports are reported. The graph is not
/// modified.
pub fn find_illegal_chains(
    graph: &ImportGraph,
    downstream: &str,
    upstream: &str,
    as_packages: bool,
    include_indirect: bool,
) -> Result<Vec<DetailedChain>, ContractError> {
    let downstream = Package {
        name: downstream,
        as_package: as_packages,
    };
    let upstream = Package {
        name: upstream,
        as_package: as_packages,
    };
    if as_packages && (upstream.contains(downstream.name) || downstream.contains(upstream.name)) {
        return Err(GraphError::SharedDescendants {
            importer: downstream.name.to_string(),
            imported: upstream.name.to_string(),
        }
        .into());
    }

    let mut working = graph.clone();
    let mut chains = pop_direct_chains(&mut working, downstream, upstream);
    if include_indirect {
        let segments = find_segments(&working, downstream, upstream)?;
        chains.extend(segments_to_collapsed_chains(&working, &segments, downstream, upstream));
    }
    chains.sort();
    Ok(chains)
}

/// Report and remove every direct import from `downstream` into `upstream`.
fn pop_direct_chains(
    graph: &mut ImportGraph,
    downstream: Package<'_>,
    upstream: Package<'_>,
) -> Vec<DetailedChain> {
    let mut chains = Vec::new();
    for importer in downstream.members(graph) {
        for imported in graph.find_modules_directly_imported_by(&importer) {
            if !upstream.contains(&imported) {
                continue;
            }
            chains.push(DetailedChain::direct(link_between(graph, &importer, &imported)));
            graph.remove_import(&importer, &imported);
        }
    }
    chains
}

/// Squash both packages, then repeatedly take and remove the shortest chain between them.
///
/// Line numbers for each hop come from `reference`, which is left untouched.
fn find_segments(
    reference: &ImportGraph,
    downstream: Package<'_>,
    upstream: Package<'_>,
) -> Result<Vec<Vec<Link>>, ContractError> {
    if downstream.members(reference).is_empty() || upstream.members(reference).is_empty() {
        return Ok(Vec::new());
    }
    let mut squashed = reference.clone();
    if downstream.as_package {
        squash_package(&mut squashed, downstream.name)?;
        squash_package(&mut squashed, upstream.name)?;
    }

    let mut segments = Vec::new();
    while let Some(chain) = squashed.find_shortest_chain(downstream.name, upstream.name) {
        if chain.len() == 2 {
            return Err(GraphError::Internal(
                "Direct chain found - these should have been removed.".to_string(),
            )
            .into());
        }
        let mut segment = Vec::with_capacity(chain.len() - 1);
        for hop in chain.windows(2) {
            squashed.remove_import(&hop[0], &hop[1]);
            segment.push(link_between(reference, &hop[0], &hop[1]));
        }
        segments.push(segment);
    }
    Ok(segments)
}

fn squash_package(graph: &mut ImportGraph, module: &str) -> Result<(), GraphError> {
    if !graph.contains(module) {
        graph.add_module(module);
    }
    graph.squash_module(module)
}

/// Replace each segment's squashed endpoints with the real modules at either end.
///
/// The first alternative (by name) becomes part of the chain; the others are kept as
/// `extra_firsts` / `extra_lasts`.
fn segments_to_collapsed_chains(
    reference: &ImportGraph,
    segments: &[Vec<Link>],
    downstream: Package<'_>,
    upstream: Package<'_>,
) -> Vec<DetailedChain> {
    let mut collapsed = Vec::with_capacity(segments.len());
    for segment in segments {
        let (Some(first), Some(last)) = (segment.first(), segment.last()) else {
            continue;
        };
        let mut heads: Vec<Link> = reference
            .find_modules_that_directly_import(&first.imported)
            .into_iter()
            .filter(|module| downstream.contains(module))
            .map(|module| link_between(reference, &module, &first.imported))
            .collect();
        let mut tails: Vec<Link> = reference
            .find_modules_directly_imported_by(&last.importer)
            .into_iter()
            .filter(|module| upstream.contains(module))
            .map(|module| link_between(reference, &last.importer, &module))
            .collect();
        if heads.is_empty() || tails.is_empty() {
            continue;
        }
        let extra_firsts = heads.split_off(1);
        let extra_lasts = tails.split_off(1);

        let mut chain = heads;
        chain.extend(segment[1..segment.len() - 1].iter().cloned());
        chain.extend(tails);
        collapsed.push(DetailedChain {
            chain,
            extra_firsts,
            extra_lasts,
        });
    }
    collapsed
}

/// Render a chain as printed under a broken contract.
///
/// ```text
/// - mypkg.low.a (l.3)
///   & mypkg.low.b -> mypkg.utils (l.5)
///   mypkg.utils -> mypkg.high (l.9)
///                  & mypkg.high.x (l.2)
/// ```
pub fn render_chain(chain: &DetailedChain) -> Vec<String> {
    let mut lines = Vec::new();
    let Some(first) = chain.chain.first() else {
        return lines;
    };
    lines.extend(render_link(first, true, &chain.extra_firsts, &[]));
    if chain.chain.len() > 1 {
        for link in &chain.chain[1..chain.chain.len() - 1] {
            lines.extend(render_link(link, false, &[], &[]));
        }
        if let Some(last) = chain.chain.last() {
            lines.extend(render_link(last, false, &[], &chain.extra_lasts));
        }
    }
    lines
}

fn render_link(
    link: &Link,
    first_line: bool,
    extra_firsts: &[Link],
    extra_lasts: &[Link],
) -> Vec<String> {
    let mut parts = Vec::new();
    match extra_firsts.split_last() {
        Some((final_first, others)) => {
            parts.push(format!("{} ({})", link.importer, link.format_line_numbers()));
            for source in others {
                parts.push(format!("& {} ({})", source.importer, source.format_line_numbers()));
            }
            parts.push(format!(
                "& {} -> {} ({})",
                final_first.importer,
                final_first.imported,
                final_first.format_line_numbers()
            ));
        }
        None => parts.push(format!(
            "{} -> {} ({})",
            link.importer,
            link.imported,
            link.format_line_numbers()
        )),
    }

    let indent = " ".repeat(link.importer.len() + 4);
    for destination in extra_lasts {
        parts.push(format!(
            "{indent}& {} ({})",
            destination.imported,
            destination.format_line_numbers()
        ));
    }

    parts
        .into_iter()
        .enumerate()
        .map(|(position, part)| {
            if first_line && position == 0 {
                format!("- {part}")
            } else {
                format!("  {part}")
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "chains_tests.rs"]
mod tests;
