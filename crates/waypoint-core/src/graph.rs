//! # Graph Store
//!
//! The deterministic, read-only decision graph for Waypoint CORE.
//!
//! This module defines the `GraphStore` trait and its in-memory
//! implementation. The graph is authored offline and never mutated at runtime:
//! a `Graph` is built once from a validated `Dataset` and then only queried.
//! All data structures use `BTreeMap` for deterministic ordering.

use crate::integrity::validate_graph_integrity;
use crate::{
    CompatibilityRule, Component, ComponentId, Node, NodeId, NodeOption, NodeType, OptionId, Path,
    Recipe, WizardError,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// Read-only access to the decision graph and its companion records.
///
/// All fallible operations return `Result<T, WizardError>` so the in-memory
/// graph and the persistent mirror can be used interchangeably.
pub trait GraphStore {
    /// Get the single root node.
    fn root(&self) -> Result<Node, WizardError>;

    /// Lookup a node by id.
    fn node(&self, id: &NodeId) -> Result<Option<Node>, WizardError>;

    /// Get the options of a node, in authored order.
    fn options(&self, node: &NodeId) -> Result<Vec<NodeOption>, WizardError>;

    /// Lookup an option by its globally unique id.
    fn option(&self, id: &OptionId) -> Result<Option<NodeOption>, WizardError>;

    /// Resolve the destination of `(node, option)`.
    fn resolve(&self, node: &NodeId, option: &OptionId) -> Result<Option<NodeId>, WizardError>;

    /// Get the outgoing edges of a node, sorted by option id.
    fn outbound(&self, node: &NodeId) -> Result<Vec<Path>, WizardError>;

    /// Get the incoming edges of a node, sorted by `(from_node, from_option)`.
    fn inbound(&self, node: &NodeId) -> Result<Vec<Path>, WizardError>;

    /// Get the recipe owned by a node.
    fn recipe(&self, node: &NodeId) -> Result<Option<Recipe>, WizardError>;

    /// Lookup a component by id.
    fn component(&self, id: &ComponentId) -> Result<Option<Component>, WizardError>;

    /// Get every component, sorted by id.
    fn components(&self) -> Result<Vec<Component>, WizardError>;

    /// Get every compatibility rule, in authored order.
    fn rules(&self) -> Result<Vec<CompatibilityRule>, WizardError>;

    /// Get the total number of nodes.
    fn node_count(&self) -> Result<usize, WizardError>;

    /// Lookup a node that must exist.
    fn require_node(&self, id: &NodeId) -> Result<Node, WizardError> {
        self.node(id)?
            .ok_or_else(|| WizardError::NodeNotFound(id.clone()))
    }
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// The in-memory decision graph.
///
/// Only constructible from a `Dataset` that passes integrity validation, so
/// every `Graph` has exactly one root and no dangling references.
#[derive(Debug, Clone)]
pub struct Graph {
    /// Node storage: NodeId -> Node
    nodes: BTreeMap<NodeId, Node>,

    /// The single root
    root: NodeId,

    /// Option storage: OptionId -> NodeOption
    options: BTreeMap<OptionId, NodeOption>,

    /// Authored option order per node
    node_options: BTreeMap<NodeId, Vec<OptionId>>,

    /// Adjacency list: from_node -> (from_option -> to_node)
    edges: BTreeMap<NodeId, BTreeMap<OptionId, NodeId>>,

    /// Reverse adjacency: to_node -> {(from_node, from_option)}
    inbound: BTreeMap<NodeId, BTreeSet<(NodeId, OptionId)>>,

    recipes: BTreeMap<NodeId, Recipe>,
    components: BTreeMap<ComponentId, Component>,
    rules: Vec<CompatibilityRule>,
}

impl Graph {
    /// Validate a dataset and build the graph from it.
    ///
    /// Fails with `GraphIntegrity` listing every violation found.
    pub fn from_dataset(dataset: Dataset) -> Result<Self, WizardError> {
        validate_graph_integrity(&dataset)?;

        let root = dataset
            .nodes
            .iter()
            .find(|n| n.node_type == NodeType::Root)
            .map(|n| n.id.clone())
            .ok_or(WizardError::RootNotFound)?;

        let mut node_options: BTreeMap<NodeId, Vec<OptionId>> = BTreeMap::new();
        for option in &dataset.options {
            node_options
                .entry(option.node_id.clone())
                .or_default()
                .push(option.id.clone());
        }

        let mut edges: BTreeMap<NodeId, BTreeMap<OptionId, NodeId>> = BTreeMap::new();
        let mut inbound: BTreeMap<NodeId, BTreeSet<(NodeId, OptionId)>> = BTreeMap::new();
        for path in dataset.paths {
            inbound
                .entry(path.to_node_id.clone())
                .or_default()
                .insert((path.from_node_id.clone(), path.from_option_id.clone()));
            edges
                .entry(path.from_node_id)
                .or_default()
                .insert(path.from_option_id, path.to_node_id);
        }

        Ok(Self {
            nodes: dataset.nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
            root,
            options: dataset
                .options
                .into_iter()
                .map(|o| (o.id.clone(), o))
                .collect(),
            node_options,
            edges,
            inbound,
            recipes: dataset
                .recipes
                .into_iter()
                .map(|r| (r.node_id.clone(), r))
                .collect(),
            components: dataset
                .components
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            rules: dataset.rules,
        })
    }

    /// Get the root node id.
    #[must_use]
    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    /// Get an iterator over all nodes, sorted by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get an iterator over all edges, sorted by primary key.
    pub fn paths(&self) -> impl Iterator<Item = Path> + '_ {
        self.edges.iter().flat_map(|(from, targets)| {
            targets
                .iter()
                .map(move |(option, to)| Path::new(from.clone(), option.clone(), to.clone()))
        })
    }

    /// Get the number of edges.
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    /// Get an iterator over all recipes, sorted by node id.
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// Export the graph back into its plain-record form.
    #[must_use]
    pub fn to_dataset(&self) -> Dataset {
        Dataset::from(self)
    }
}

impl GraphStore for Graph {
    fn root(&self) -> Result<Node, WizardError> {
        self.nodes
            .get(&self.root)
            .cloned()
            .ok_or(WizardError::RootNotFound)
    }

    fn node(&self, id: &NodeId) -> Result<Option<Node>, WizardError> {
        Ok(self.nodes.get(id).cloned())
    }

    fn options(&self, node: &NodeId) -> Result<Vec<NodeOption>, WizardError> {
        Ok(self
            .node_options
            .get(node)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.options.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn option(&self, id: &OptionId) -> Result<Option<NodeOption>, WizardError> {
        Ok(self.options.get(id).cloned())
    }

    fn resolve(&self, node: &NodeId, option: &OptionId) -> Result<Option<NodeId>, WizardError> {
        Ok(self
            .edges
            .get(node)
            .and_then(|targets| targets.get(option))
            .cloned())
    }

    fn outbound(&self, node: &NodeId) -> Result<Vec<Path>, WizardError> {
        Ok(self
            .edges
            .get(node)
            .map(|targets| {
                targets
                    .iter()
                    .map(|(option, to)| Path::new(node.clone(), option.clone(), to.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn inbound(&self, node: &NodeId) -> Result<Vec<Path>, WizardError> {
        Ok(self
            .inbound
            .get(node)
            .map(|sources| {
                sources
                    .iter()
                    .map(|(from, option)| Path::new(from.clone(), option.clone(), node.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn recipe(&self, node: &NodeId) -> Result<Option<Recipe>, WizardError> {
        Ok(self.recipes.get(node).cloned())
    }

    fn component(&self, id: &ComponentId) -> Result<Option<Component>, WizardError> {
        Ok(self.components.get(id).cloned())
    }

    fn components(&self) -> Result<Vec<Component>, WizardError> {
        Ok(self.components.values().cloned().collect())
    }

    fn rules(&self) -> Result<Vec<CompatibilityRule>, WizardError> {
        Ok(self.rules.clone())
    }

    fn node_count(&self) -> Result<usize, WizardError> {
        Ok(self.nodes.len())
    }
}

impl TryFrom<Dataset> for Graph {
    type Error = WizardError;

    fn try_from(dataset: Dataset) -> Result<Self, Self::Error> {
        Self::from_dataset(dataset)
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// The plain-record form of the whole authored dataset.
///
/// This is what the authoritative store hands out and what the mirror stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub options: Vec<NodeOption>,
    #[serde(default)]
    pub paths: Vec<Path>,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub rules: Vec<CompatibilityRule>,
}

impl From<&Graph> for Dataset {
    fn from(graph: &Graph) -> Self {
        Self {
            nodes: graph.nodes.values().cloned().collect(),
            options: graph
                .node_options
                .values()
                .flatten()
                .filter_map(|id| graph.options.get(id).cloned())
                .collect(),
            paths: graph.paths().collect(),
            recipes: graph.recipes.values().cloned().collect(),
            components: graph.components.values().cloned().collect(),
            rules: graph.rules.clone(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
