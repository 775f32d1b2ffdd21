//! # Path Reconstruction
//!
//! Rebuilds a plausible forward history for a node reached without one
//! (deep links, bookmarks, "jump to" shortcuts).
//!
//! A breadth-first pass from the root assigns every reachable node its
//! distance. The backward walk then only steps to a predecessor one closer to
//! the root, so it always ends at the root along a shortest route and never
//! strays into a cycle that the root cannot reach. When a node has several
//! inbound edges the first qualifying one in sorted `(from_node, from_option)`
//! order is taken and the node is recorded as ambiguous.

use crate::graph::GraphStore;
use crate::{NodeId, Path, WizardError};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// The outcome of a backward walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructedPath {
    pub target: NodeId,
    /// Edges from the root to the target. Empty when the target is the root
    /// or cannot be reached.
    pub hops: Vec<Path>,
    /// False when no route from the root leads to the target.
    pub reached_root: bool,
    /// Nodes where more than one inbound edge existed.
    pub ambiguous_nodes: Vec<NodeId>,
}

impl ReconstructedPath {
    /// True when every hop was forced.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.ambiguous_nodes.is_empty()
    }
}

/// Backward walker over a graph store.
pub struct PathReconstructor;

impl PathReconstructor {
    /// Reconstruct a root-to-target path.
    ///
    /// The root reconstructs to an empty path. An unknown target fails with
    /// `NodeNotFound`; a known target no route reaches gives an empty path
    /// with `reached_root == false`.
    pub fn reconstruct<G: GraphStore + ?Sized>(
        graph: &G,
        target: &NodeId,
    ) -> Result<ReconstructedPath, WizardError> {
        graph.require_node(target)?;
        let root = graph.root()?;
        let distances = distances_from(graph, &root.id)?;

        let Some(&distance) = distances.get(target) else {
            return Ok(ReconstructedPath {
                target: target.clone(),
                hops: Vec::new(),
                reached_root: false,
                ambiguous_nodes: Vec::new(),
            });
        };

        let mut hops = Vec::with_capacity(distance);
        let mut ambiguous_nodes = Vec::new();
        let mut current = target.clone();
        let mut remaining = distance;

        while let Some(closer) = remaining.checked_sub(1) {
            let inbound = graph.inbound(&current)?;
            if inbound.len() > 1 {
                ambiguous_nodes.push(current.clone());
            }
            let Some(edge) = inbound
                .into_iter()
                .find(|p| distances.get(&p.from_node_id) == Some(&closer))
            else {
                break;
            };
            current = edge.from_node_id.clone();
            remaining = closer;
            hops.push(edge);
        }

        hops.reverse();
        Ok(ReconstructedPath {
            target: target.clone(),
            hops,
            reached_root: current == root.id,
            ambiguous_nodes,
        })
    }
}

/// Breadth-first distance of every node reachable from `start`.
fn distances_from<G: GraphStore + ?Sized>(
    graph: &G,
    start: &NodeId,
) -> Result<BTreeMap<NodeId, usize>, WizardError> {
    let mut distances = BTreeMap::new();
    let mut queue = VecDeque::new();
    distances.insert(start.clone(), 0usize);
    queue.push_back((start.clone(), 0usize));

    while let Some((node, distance)) = queue.pop_front() {
        for edge in graph.outbound(&node)? {
            if !distances.contains_key(&edge.to_node_id) {
                let next = distance.saturating_add(1);
                distances.insert(edge.to_node_id.clone(), next);
                queue.push_back((edge.to_node_id, next));
            }
        }
    }
    Ok(distances)
}

// =============================================================================
// TESTS
// =============================================================================
