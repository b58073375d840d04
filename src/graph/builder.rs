//! Dependency graph of configs
//!
//! One graph is built per environment. Nodes are configs; an edge `A -> B`
//! means "A depends on B", so B has to be attempted before A. Uses petgraph
//! for graph operations.

use petgraph::dot::{Config as DotConfig, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::domain::{Config, Coordinate, Project};

/// A config in the dependency graph
#[derive(Debug, Clone)]
pub struct ConfigNode {
    /// Graph-local id of the node
    pub id: NodeIndex,
    pub config: Arc<Config>,
}

impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.config.coordinate)
    }
}

/// Dependency graph of the configs of one environment
#[derive(Debug, Clone, Default)]
pub struct ConfigGraph {
    /// The underlying directed graph
    graph: DiGraph<ConfigNode, ()>,

    /// Map from coordinate to node index
    node_map: HashMap<Coordinate, NodeIndex>,
}

/// Graphs keyed by environment name
pub type ConfigGraphPerEnvironment = BTreeMap<String, ConfigGraph>;

impl ConfigGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Builds a graph from configs, adding an edge for every reference that
    /// points at a config of the same set
    pub fn from_configs(configs: impl IntoIterator<Item = Arc<Config>>) -> Self {
        let mut graph = Self::new();

        // First pass: add all nodes
        let configs: Vec<_> = configs.into_iter().collect();
        for config in &configs {
            graph.add_config(Arc::clone(config));
        }

        // Second pass: add all edges
        for config in &configs {
            for reference in &config.references {
                graph.add_dependency(&config.coordinate, reference);
            }
        }

        graph
    }

    /// Adds a config node; a config whose coordinate is already present keeps the existing node
    pub fn add_config(&mut self, config: Arc<Config>) -> NodeIndex {
        if let Some(idx) = self.node_map.get(&config.coordinate) {
            return *idx;
        }

        let coordinate = config.coordinate.clone();
        let idx = self.graph.add_node(ConfigNode {
            id: NodeIndex::end(),
            config,
        });
        self.graph[idx].id = idx;
        self.node_map.insert(coordinate, idx);
        idx
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`
    ///
    /// Returns false when either side is not part of the graph or both are the same config.
    pub fn add_dependency(&mut self, dependent: &Coordinate, dependency: &Coordinate) -> bool {
        if dependent == dependency {
            return false;
        }

        match (self.node_map.get(dependent), self.node_map.get(dependency)) {
            (Some(from), Some(to)) => {
                self.graph.update_edge(*from, *to, ());
                true
            }
            _ => false,
        }
    }

    /// Returns the node with the given id
    pub fn node(&self, id: NodeIndex) -> Option<&ConfigNode> {
        self.graph.node_weight(id)
    }

    /// Returns the node id of a coordinate
    pub fn node_index(&self, coordinate: &Coordinate) -> Option<NodeIndex> {
        self.node_map.get(coordinate).copied()
    }

    /// Returns the nodes `id` depends on
    pub fn dependencies(&self, id: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .neighbors_directed(id, Direction::Outgoing)
            .collect()
    }

    /// Returns the nodes that depend on `id`
    pub fn dependents(&self, id: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .neighbors_directed(id, Direction::Incoming)
            .collect()
    }

    /// Returns all node ids in insertion order
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Returns all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &ConfigNode> {
        self.graph.node_weights()
    }

    /// Returns all edges as (dependent, dependency) pairs
    pub fn edges(&self) -> Vec<(NodeIndex, NodeIndex)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| (e.source(), e.target()))
            .collect()
    }

    /// Returns true if the graph contains the config
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        self.node_map.contains_key(coordinate)
    }

    /// Returns the number of configs in the graph
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub(crate) fn inner(&self) -> &DiGraph<ConfigNode, ()> {
        &self.graph
    }

    /// Builds the subgraph made of `members`, keeping every edge between them
    ///
    /// Node ids are re-assigned in the order of `members`.
    pub fn subgraph(&self, members: &[NodeIndex]) -> ConfigGraph {
        let mut sub = ConfigGraph::new();
        for id in members {
            if let Some(node) = self.node(*id) {
                sub.add_config(Arc::clone(&node.config));
            }
        }

        for (from, to) in self.edges() {
            if let (Some(a), Some(b)) = (self.node(from), self.node(to)) {
                sub.add_dependency(&a.config.coordinate, &b.config.coordinate);
            }
        }

        sub
    }

    /// Renders the graph in Graphviz DOT format
    pub fn to_dot(&self) -> String {
        let labeled = self
            .graph
            .map(|_, node| node.config.coordinate.to_string(), |_, _| "");
        format!("{}", Dot::with_config(&labeled, &[DotConfig::EdgeNoLabel]))
    }
}

/// Builds one dependency graph per environment from all configs of all projects
///
/// References to configs that are not part of an environment are not edges;
/// parameter resolution reports them when the config is deployed.
pub fn build_graphs(projects: &[Project], environments: &[String]) -> ConfigGraphPerEnvironment {
    environments
        .iter()
        .map(|environment| {
            let configs = projects
                .iter()
                .flat_map(|p| p.configs_for(environment))
                .cloned()
                .map(Arc::new);
            (environment.clone(), ConfigGraph::from_configs(configs))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{classic_config, coord};

    #[test]
    fn empty_graph() {
        let graph = ConfigGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
    }

    #[test]
    fn edges_point_from_dependent_to_dependency() {
        let a = classic_config("a", &[]);
        let b = classic_config("b", &["a"]);
        let graph = ConfigGraph::from_configs([Arc::new(a), Arc::new(b)]);

        let ia = graph.node_index(&coord("a")).unwrap();
        let ib = graph.node_index(&coord("b")).unwrap();
        assert_eq!(graph.dependencies(ib), vec![ia]);
        assert_eq!(graph.dependents(ia), vec![ib]);
        assert!(graph.dependencies(ia).is_empty());
    }

    #[test]
    fn node_ids_match_graph_indices() {
        let graph = ConfigGraph::from_configs([
            Arc::new(classic_config("a", &[])),
            Arc::new(classic_config("b", &[])),
        ]);
        for idx in graph.node_indices() {
            assert_eq!(graph.node(idx).unwrap().id, idx);
        }
    }

    #[test]
    fn references_outside_the_set_are_ignored() {
        let b = classic_config("b", &["missing"]);
        let graph = ConfigGraph::from_configs([Arc::new(b)]);
        assert_eq!(graph.len(), 1);
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn self_dependency_is_not_an_edge() {
        let mut graph = ConfigGraph::new();
        graph.add_config(Arc::new(classic_config("a", &[])));
        assert!(!graph.add_dependency(&coord("a"), &coord("a")));
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn build_graphs_per_environment() {
        let mut project = Project::new("proj");
        project.add_config(classic_config("a", &[]));
        let mut staging = classic_config("b", &["a"]);
        staging.environment = "staging".into();
        project.add_config(staging);

        let graphs = build_graphs(&[project], &["prod".to_string(), "staging".to_string()]);
        assert_eq!(graphs["prod"].len(), 1);
        assert_eq!(graphs["staging"].len(), 1);
        // `a` only exists in prod, so the staging reference is not an edge
        assert!(graphs["staging"].edges().is_empty());
    }

    #[test]
    fn subgraph_keeps_internal_edges() {
        let graph = ConfigGraph::from_configs([
            Arc::new(classic_config("a", &[])),
            Arc::new(classic_config("b", &["a"])),
            Arc::new(classic_config("c", &[])),
        ]);
        let members = vec![
            graph.node_index(&coord("a")).unwrap(),
            graph.node_index(&coord("b")).unwrap(),
        ];
        let sub = graph.subgraph(&members);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.edges().len(), 1);
        assert!(!sub.contains(&coord("c")));
    }

    #[test]
    fn dot_output_names_coordinates() {
        let graph = ConfigGraph::from_configs([
            Arc::new(classic_config("a", &[])),
            Arc::new(classic_config("b", &["a"])),
        ]);
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("proj:dashboard:a"));
        assert!(dot.contains("->"));
    }
}
