//! Independently sorted components
//!
//! A graph is split into its weakly connected components. Each component gets a
//! topological order in which every config comes after the configs it depends
//! on. Components share no edges, so they can be deployed independently.
//!
//! Ties between unrelated configs are broken by node id (insertion order), so
//! sorting the same graph twice yields the same order.
//!
//! Cycles are errors unless every config in the cycle is skipped. Edges inside
//! such an all-skipped cycle are ignored for ordering.

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use thiserror::Error;

use super::builder::{ConfigGraph, ConfigNode};
use crate::domain::Coordinate;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SortError {
    #[error("Failed to sort configs of environment '{environment}', found cyclic dependencies: {}", format_cycles(.cycles))]
    CyclicDependency {
        environment: String,
        cycles: Vec<Vec<Coordinate>>,
    },
}

fn format_cycles(cycles: &[Vec<Coordinate>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let names: Vec<String> = cycle.iter().map(|c| c.to_string()).collect();
            format!("[{}]", names.join(", "))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// A weakly connected component with a valid deployment order
#[derive(Debug, Clone)]
pub struct SortedComponent {
    pub graph: ConfigGraph,
    /// Node ids of `graph`, dependencies before dependents
    pub sorted_nodes: Vec<NodeIndex>,
}

impl SortedComponent {
    /// Nodes in deployment order
    pub fn nodes(&self) -> impl Iterator<Item = &ConfigNode> {
        self.sorted_nodes.iter().filter_map(|id| self.graph.node(*id))
    }

    /// Coordinates in deployment order
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.nodes().map(|n| n.config.coordinate.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sorted_nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_nodes.is_empty()
    }
}

/// Splits the graph into weakly connected components and sorts each one
pub fn independently_sorted_components(
    graph: &ConfigGraph,
    environment: &str,
) -> Result<Vec<SortedComponent>, SortError> {
    let mut sorted = Vec::new();
    let mut cycles = Vec::new();

    for members in weakly_connected_components(graph) {
        let component = graph.subgraph(&members);
        match sort_component(&component) {
            Ok(sorted_nodes) => sorted.push(SortedComponent {
                graph: component,
                sorted_nodes,
            }),
            Err(found) => cycles.extend(found),
        }
    }

    if !cycles.is_empty() {
        return Err(SortError::CyclicDependency {
            environment: environment.to_string(),
            cycles,
        });
    }

    Ok(sorted)
}

/// Groups node ids by weakly connected component
///
/// Members are in ascending id order; components are ordered by their smallest id.
pub fn weakly_connected_components(graph: &ConfigGraph) -> Vec<Vec<NodeIndex>> {
    let mut sets = UnionFind::<usize>::new(graph.len());
    for (from, to) in graph.edges() {
        sets.union(from.index(), to.index());
    }

    let mut by_root: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
    for id in graph.node_indices() {
        by_root.entry(sets.find(id.index())).or_default().push(id);
    }

    let mut components: Vec<Vec<NodeIndex>> = by_root.into_values().collect();
    components.sort_by_key(|members| members[0]);
    components
}

/// Sorts one component, dependencies first
///
/// Returns the offending cycles when a cycle contains a config that is not skipped.
fn sort_component(graph: &ConfigGraph) -> Result<Vec<NodeIndex>, Vec<Vec<Coordinate>>> {
    let node_count = graph.len();
    let coordinate_of = |id: NodeIndex| {
        graph
            .node(id)
            .map(|n| n.config.coordinate.clone())
            .unwrap_or_else(|| Coordinate::new("?", "?", id.index().to_string()))
    };

    let sccs = tarjan_scc(graph.inner());
    let mut scc_of = vec![0usize; node_count];
    let mut cycles = Vec::new();

    for (scc_id, scc) in sccs.iter().enumerate() {
        for id in scc {
            scc_of[id.index()] = scc_id;
        }

        if scc.len() > 1 {
            let all_skipped = scc
                .iter()
                .all(|id| graph.node(*id).map(|n| n.config.skip).unwrap_or(false));
            if !all_skipped {
                let mut cycle: Vec<Coordinate> = scc.iter().map(|id| coordinate_of(*id)).collect();
                cycle.sort();
                cycles.push(cycle);
            }
        }
    }

    if !cycles.is_empty() {
        return Err(cycles);
    }

    // Kahn's algorithm over edges that leave their strongly connected component.
    // A node is ready once all of its dependencies have been emitted.
    let mut pending = vec![0usize; node_count];
    for (from, to) in graph.edges() {
        if scc_of[from.index()] != scc_of[to.index()] {
            pending[from.index()] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
        .node_indices()
        .filter(|id| pending[id.index()] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(node_count);
    while let Some(Reverse(id)) = ready.pop() {
        order.push(id);
        for dependent in graph.dependents(id) {
            if scc_of[dependent.index()] == scc_of[id.index()] {
                continue;
            }
            pending[dependent.index()] -= 1;
            if pending[dependent.index()] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() != node_count {
        let mut residual: Vec<Coordinate> = graph
            .node_indices()
            .filter(|id| pending[id.index()] > 0)
            .map(coordinate_of)
            .collect();
        residual.sort();
        return Err(vec![residual]);
    }

    Ok(order)
}
